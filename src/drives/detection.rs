use crate::system::CommandRunner;
use crate::{RawDeviceRecord, WipeError, WipeResult};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Columns requested from lsblk, one row per whole device (`-d`)
const LSBLK_ARGS: [&str; 4] = ["-d", "-o", "NAME,ROTA,TYPE,MODEL,TRAN,SIZE", "--json"];

#[derive(Debug, Deserialize)]
struct LsblkReport {
    blockdevices: Vec<LsblkDevice>,
}

#[derive(Debug, Deserialize)]
struct LsblkDevice {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    rota: bool,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    tran: Option<String>,
    #[serde(default)]
    size: Option<serde_json::Value>,
}

/// lsblk prints ROTA as a JSON bool on recent util-linux and as "0"/"1" on older releases
#[derive(Deserialize)]
#[serde(untagged)]
enum FlagRepr {
    Bool(bool),
    Number(u64),
    Text(String),
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<FlagRepr>::deserialize(deserializer)? {
        None => false,
        Some(FlagRepr::Bool(b)) => b,
        Some(FlagRepr::Number(n)) => n != 0,
        Some(FlagRepr::Text(s)) => matches!(s.trim(), "1" | "true"),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub struct DeviceEnumerator {
    ignore_prefixes: Vec<String>,
    timeout: Duration,
}

impl DeviceEnumerator {
    pub fn new(ignore_prefixes: Vec<String>, timeout: Duration) -> Self {
        Self {
            ignore_prefixes,
            timeout,
        }
    }

    /// Query the block-device inventory and return physical devices in inventory order
    pub async fn enumerate(&self, runner: &dyn CommandRunner) -> WipeResult<Vec<RawDeviceRecord>> {
        let output = runner
            .run("lsblk", &LSBLK_ARGS, self.timeout)
            .await
            .map_err(|e| WipeError::Enumeration(format!("Failed to get device list: {}", e)))?;

        if !output.success {
            return Err(WipeError::Enumeration(format!(
                "Failed to get device list: {}",
                output.error_text()
            )));
        }

        let records = Self::parse_inventory(&output.stdout)?;
        Ok(records
            .into_iter()
            .filter(|record| !self.should_skip_device(&record.name))
            .collect())
    }

    /// Parse lsblk JSON output into raw records
    pub fn parse_inventory(json: &str) -> WipeResult<Vec<RawDeviceRecord>> {
        let report: LsblkReport = serde_json::from_str(json)
            .map_err(|e| WipeError::Enumeration(format!("Failed to parse device data: {}", e)))?;

        Ok(report
            .blockdevices
            .into_iter()
            .filter_map(|dev| {
                let name = non_empty(dev.name)?;
                let size = match dev.size {
                    Some(serde_json::Value::String(s)) => non_empty(Some(s)),
                    Some(serde_json::Value::Number(n)) => Some(n.to_string()),
                    _ => None,
                };
                Some(RawDeviceRecord {
                    name,
                    transport: non_empty(dev.tran),
                    rotational: dev.rota,
                    device_type: non_empty(dev.kind),
                    model: non_empty(dev.model),
                    size,
                })
            })
            .collect())
    }

    /// Check if device should be skipped (loop devices, compressed RAM, device mapper)
    pub fn should_skip_device(&self, device_name: &str) -> bool {
        self.ignore_prefixes
            .iter()
            .any(|prefix| device_name.starts_with(prefix.as_str()))
    }

    /// Get drive size in bytes
    pub async fn device_size(
        runner: &dyn CommandRunner,
        device_path: &str,
        timeout: Duration,
    ) -> WipeResult<u64> {
        let output = runner
            .run("blockdev", &["--getsize64", device_path], timeout)
            .await?;

        if !output.success {
            return Err(WipeError::CommandFailed(format!(
                "blockdev --getsize64 {}: {}",
                device_path,
                output.error_text()
            )));
        }

        let size_str = output.stdout.trim();
        size_str.parse().map_err(|_| {
            WipeError::CommandFailed(format!(
                "blockdev returned an unreadable size for {}: '{}'",
                device_path, size_str
            ))
        })
    }

    /// Extract field from smartctl output
    pub(crate) fn extract_field(output: &str, field_name: &str) -> Option<String> {
        output
            .lines()
            .find(|line| line.contains(field_name))?
            .split_once(':')
            .map(|(_, value)| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}
