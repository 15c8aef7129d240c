// Device classification cascade
//
// Priority is fixed: USB transport, then NVMe naming, then the SMART identity
// query for plain disks. Each step appends to the evidence trail and the first
// step that decides wins; later signals are never consulted. A USB enclosure
// holding an NVMe drive therefore classifies as USB.

use super::commands::wipe_commands;
use super::detection::DeviceEnumerator;
use crate::system::CommandRunner;
use crate::{ClassifiedDevice, DeviceClass, RawDeviceRecord};
use std::time::Duration;

/// smartctl marker for flash media
pub const SSD_MARKER: &str = "Solid State Device";
/// smartctl marker for devices that do not expose SMART data
pub const UNAVAILABLE_MARKER: &str = "Unavailable";

/// Outcome of the per-device identity query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityReading {
    Report(String),
    Failed(String),
}

pub struct Classifier {
    nvme_prefix: String,
    diagnostic_timeout: Duration,
}

impl Classifier {
    pub fn new(nvme_prefix: impl Into<String>, diagnostic_timeout: Duration) -> Self {
        Self {
            nvme_prefix: nvme_prefix.into(),
            diagnostic_timeout,
        }
    }

    /// Classify one inventory record. The identity query is only issued for disks
    /// that neither the transport nor the name could settle.
    pub async fn classify(&self, raw: &RawDeviceRecord, runner: &dyn CommandRunner) -> ClassifiedDevice {
        let path = raw.device_path();
        let mut evidence = Self::baseline_evidence(raw);

        let classification = match self.classify_by_inventory(raw, &mut evidence) {
            Some(class) => class,
            None if Self::is_disk(raw) => {
                let reading = self.query_identity(runner, &path).await;
                Self::classify_disk(raw, &reading, &mut evidence)
            }
            None => {
                evidence.push(format!(
                    "Classification: Unrecognized device type '{}'",
                    raw.device_type.as_deref().unwrap_or("N/A")
                ));
                DeviceClass::Unknown
            }
        };

        tracing::debug!(device = %path, class = %classification, "Device classified");

        let transport = raw
            .transport
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_else(|| "Unknown".to_string());

        ClassifiedDevice {
            name: raw.name.clone(),
            wipe_commands: wipe_commands(classification, &path),
            path,
            model: raw.model.clone().unwrap_or_else(|| "Unknown".to_string()),
            size: raw.size.clone().unwrap_or_else(|| "Unknown".to_string()),
            transport,
            is_rotational: raw.rotational,
            classification,
            evidence,
        }
    }

    pub(crate) fn baseline_evidence(raw: &RawDeviceRecord) -> Vec<String> {
        vec![
            format!(
                "Transport: {}",
                raw.transport
                    .as_deref()
                    .map(str::to_lowercase)
                    .unwrap_or_else(|| "N/A".to_string())
            ),
            format!("Rotational: {}", if raw.rotational { "Yes" } else { "No" }),
            format!("Type: {}", raw.device_type.as_deref().unwrap_or("N/A")),
        ]
    }

    /// Steps 1 and 2: decisions that need nothing beyond the inventory row
    pub(crate) fn classify_by_inventory(
        &self,
        raw: &RawDeviceRecord,
        evidence: &mut Vec<String>,
    ) -> Option<DeviceClass> {
        let is_usb = raw
            .transport
            .as_deref()
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("usb"));
        if is_usb {
            evidence.push("Detected: USB transport".to_string());
            return Some(DeviceClass::USB);
        }

        if raw.name.starts_with(self.nvme_prefix.as_str()) {
            evidence.push("Detected: NVMe device name".to_string());
            return Some(DeviceClass::NVMe);
        }

        None
    }

    fn is_disk(raw: &RawDeviceRecord) -> bool {
        raw.device_type.as_deref() == Some("disk")
    }

    async fn query_identity(&self, runner: &dyn CommandRunner, path: &str) -> IdentityReading {
        match runner.run("smartctl", &["-i", path], self.diagnostic_timeout).await {
            Ok(output) if output.success => IdentityReading::Report(output.stdout),
            Ok(output) => IdentityReading::Failed(output.error_text()),
            Err(e) => IdentityReading::Failed(e.to_string()),
        }
    }

    /// Step 3: settle a plain disk from its identity report
    pub(crate) fn classify_disk(
        raw: &RawDeviceRecord,
        reading: &IdentityReading,
        evidence: &mut Vec<String>,
    ) -> DeviceClass {
        let report = match reading {
            IdentityReading::Failed(reason) => {
                tracing::debug!(device = %raw.name, %reason, "SMART identity query failed");
                evidence.push("SMART: Data unavailable (unreliable data)".to_string());
                return DeviceClass::Unknown;
            }
            IdentityReading::Report(report) if report.contains(UNAVAILABLE_MARKER) => {
                evidence.push("SMART: Data unavailable (unreliable data)".to_string());
                return DeviceClass::Unknown;
            }
            IdentityReading::Report(report) => report,
        };

        if report.contains(SSD_MARKER) {
            let detail = DeviceEnumerator::extract_field(report, "Rotation Rate:")
                .unwrap_or_else(|| SSD_MARKER.to_string());
            evidence.push(format!("SMART: Confirmed SSD ({})", detail));
            return DeviceClass::SataSSD;
        }

        if raw.rotational {
            evidence.push("SMART: Confirmed rotational disk".to_string());
            DeviceClass::HDD
        } else {
            evidence.push(
                "SMART: Conflicting signals - non-rotational but not confirmed SSD".to_string(),
            );
            DeviceClass::Unknown
        }
    }
}
