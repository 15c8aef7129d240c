// Wipe command selection
//
// Two pure mappings from a classification: the operator-facing command list
// (shown, never run) and the executable plan the supervisor runs once the
// operator has confirmed. Unknown devices get neither a runnable string nor a plan.

use crate::DeviceClass;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix marking a displayed line as a note rather than a command
pub const NOTE_PREFIX: &str = "#";

/// Recommended secure wipe commands for a device, with the path substituted
pub fn wipe_commands(class: DeviceClass, device_path: &str) -> Vec<String> {
    match class {
        DeviceClass::HDD => vec![format!("sudo nwipe --method dodshort {}", device_path)],
        DeviceClass::SataSSD => vec![
            format!(
                "sudo hdparm --user-master u --security-set-pass p {}",
                device_path
            ),
            format!(
                "sudo hdparm --user-master u --security-erase p {}",
                device_path
            ),
        ],
        DeviceClass::NVMe => vec![format!("sudo nvme format {} --ses=1", device_path)],
        DeviceClass::USB => vec![
            format!(
                "sudo dd if=/dev/zero of={} bs=1M status=progress",
                device_path
            ),
            format!("# Alternative: sudo shred -vfz -n 1 {}", device_path),
        ],
        DeviceClass::Unknown => vec![
            "# STOP: Cannot recommend commands for unknown device type".to_string(),
            "# Manual verification required before any wipe operation".to_string(),
        ],
    }
}

/// Whether a displayed line is something an operator could execute
pub fn is_executable(command: &str) -> bool {
    let trimmed = command.trim_start();
    !trimmed.is_empty() && !trimmed.starts_with(NOTE_PREFIX)
}

/// One process of a wipe plan, run directly without a shell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WipeStep {
    pub program: String,
    pub args: Vec<String>,
}

impl WipeStep {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for WipeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Ordered processes that together erase one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WipePlan {
    pub steps: Vec<WipeStep>,
}

impl WipePlan {
    pub fn new(steps: Vec<WipeStep>) -> Self {
        Self { steps }
    }

    pub fn single(step: WipeStep) -> Self {
        Self { steps: vec![step] }
    }
}

/// Executable plan for a classification; `None` for devices that must not be touched.
///
/// HDD runs nwipe unattended (no curses UI), SATA SSD issues the ATA security
/// erase pair, NVMe formats with user-data erase, USB streams zeros with dd so
/// progress lines are available.
pub fn wipe_plan(class: DeviceClass, device_path: &str) -> Option<WipePlan> {
    match class {
        DeviceClass::HDD => Some(WipePlan::single(WipeStep::new(
            "nwipe",
            ["--autonuke", "--nogui", "--method=dodshort", device_path],
        ))),
        DeviceClass::SataSSD => Some(WipePlan::new(vec![
            WipeStep::new(
                "hdparm",
                ["--user-master", "u", "--security-set-pass", "p", device_path],
            ),
            WipeStep::new(
                "hdparm",
                ["--user-master", "u", "--security-erase", "p", device_path],
            ),
        ])),
        DeviceClass::NVMe => Some(WipePlan::single(WipeStep::new(
            "nvme",
            ["format", device_path, "--ses=1"],
        ))),
        DeviceClass::USB => Some(WipePlan::single(WipeStep::new(
            "dd",
            [
                "if=/dev/zero".to_string(),
                format!("of={}", device_path),
                "bs=1M".to_string(),
                "status=progress".to_string(),
            ],
        ))),
        DeviceClass::Unknown => None,
    }
}
