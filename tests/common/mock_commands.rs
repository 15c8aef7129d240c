/// Mock command execution infrastructure for testing
///
/// `MockRunner` stands in for the host: responses are registered per full
/// command line (`"smartctl -i /dev/sda"`) and every call is recorded.
/// Unregistered commands behave like tools that are not installed.

use async_trait::async_trait;
use secure_wipe::system::{CommandOutput, CommandRunner};
use secure_wipe::{WipeError, WipeResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const LSBLK_CMD: &str = "lsblk -d -o NAME,ROTA,TYPE,MODEL,TRAN,SIZE --json";

/// Mock command output
#[derive(Clone, Debug)]
pub enum MockCommandOutput {
    Output(CommandOutput),
    Error(WipeError),
}

impl MockCommandOutput {
    pub fn success(stdout: &str) -> Self {
        MockCommandOutput::Output(CommandOutput::success(stdout))
    }

    #[allow(dead_code)]
    pub fn failure(code: i32, stderr: &str) -> Self {
        MockCommandOutput::Output(CommandOutput::failure(code, stderr))
    }

    #[allow(dead_code)]
    pub fn timeout(program: &str) -> Self {
        MockCommandOutput::Error(WipeError::Timeout(format!("{} did not finish", program)))
    }
}

/// Scripted host
#[derive(Clone, Default)]
pub struct MockRunner {
    commands: Arc<Mutex<HashMap<String, MockCommandOutput>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mock command response
    pub fn register(&self, command_line: &str, output: MockCommandOutput) -> &Self {
        self.commands
            .lock()
            .unwrap()
            .insert(command_line.to_string(), output);
        self
    }

    /// Every command line run so far, in order
    #[allow(dead_code)]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    #[allow(dead_code)]
    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        _timeout: Duration,
    ) -> WipeResult<CommandOutput> {
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().unwrap().push(line.clone());

        match self.commands.lock().unwrap().get(&line).cloned() {
            Some(MockCommandOutput::Output(output)) => Ok(output),
            Some(MockCommandOutput::Error(error)) => Err(error),
            None => Err(WipeError::CommandNotFound(program.to_string())),
        }
    }
}

/// One lsblk row
pub struct MockLsblkRow<'a> {
    pub name: &'a str,
    pub rota: bool,
    pub kind: &'a str,
    pub model: Option<&'a str>,
    pub tran: Option<&'a str>,
    pub size: &'a str,
}

/// Mock lsblk JSON output
pub struct MockLsblkData;

impl MockLsblkData {
    pub fn inventory(rows: &[MockLsblkRow<'_>]) -> String {
        let devices: Vec<serde_json::Value> = rows
            .iter()
            .map(|row| {
                serde_json::json!({
                    "name": row.name,
                    "rota": row.rota,
                    "type": row.kind,
                    "model": row.model,
                    "tran": row.tran,
                    "size": row.size,
                })
            })
            .collect();
        serde_json::json!({ "blockdevices": devices }).to_string()
    }

    /// A workstation with one of everything plus the virtual devices that must be hidden
    pub fn workstation() -> String {
        Self::inventory(&[
            MockLsblkRow { name: "loop0", rota: false, kind: "loop", model: None, tran: None, size: "63.9M" },
            MockLsblkRow { name: "sda", rota: true, kind: "disk", model: Some("WDC WD10EZEX-08W"), tran: Some("sata"), size: "931.5G" },
            MockLsblkRow { name: "sdb", rota: false, kind: "disk", model: Some("Samsung SSD 860"), tran: Some("sata"), size: "465.8G" },
            MockLsblkRow { name: "sdc", rota: true, kind: "disk", model: Some("Cruzer Blade"), tran: Some("USB"), size: "14.3G" },
            MockLsblkRow { name: "sdd", rota: false, kind: "disk", model: Some("QEMU HARDDISK"), tran: Some("sata"), size: "20G" },
            MockLsblkRow { name: "sr0", rota: true, kind: "rom", model: Some("DVD+-RW GH24NSD1"), tran: Some("sata"), size: "1024M" },
            MockLsblkRow { name: "zram0", rota: false, kind: "disk", model: None, tran: None, size: "8G" },
            MockLsblkRow { name: "nvme0n1", rota: false, kind: "disk", model: Some("Samsung SSD 970 EVO Plus 1TB"), tran: Some("nvme"), size: "931.5G" },
            MockLsblkRow { name: "dm-0", rota: false, kind: "lvm", model: None, tran: None, size: "100G" },
        ])
    }
}

/// Mock smartctl output for various drive types
pub struct MockSmartctlData;

impl MockSmartctlData {
    /// HDD smartctl output
    pub fn hdd_output(model: &str, serial: &str, size_gb: u64) -> String {
        format!(
            r#"smartctl 7.2 2020-12-30 r5155 [x86_64-linux-5.10.0] (local build)
Copyright (C) 2002-20, Bruce Allen, Christian Franke, www.smartmontools.org

=== START OF INFORMATION SECTION ===
Device Model:     {}
Serial Number:    {}
User Capacity:    {} bytes [{} GB]
Sector Size:      512 bytes logical/physical
Rotation Rate:    7200 rpm
Form Factor:      3.5 inches
SMART support is: Available - device has SMART capability.
SMART support is: Enabled"#,
            model,
            serial,
            size_gb * 1024 * 1024 * 1024,
            size_gb
        )
    }

    /// SATA SSD smartctl output
    pub fn ssd_output(model: &str, serial: &str, size_gb: u64) -> String {
        format!(
            r#"smartctl 7.2 2020-12-30 r5155 [x86_64-linux-5.10.0] (local build)
Copyright (C) 2002-20, Bruce Allen, Christian Franke, www.smartmontools.org

=== START OF INFORMATION SECTION ===
Device Model:     {}
Serial Number:    {}
User Capacity:    {} bytes [{} GB]
Sector Size:      512 bytes logical/physical
Rotation Rate:    Solid State Device
Form Factor:      2.5 inches
TRIM Command:     Available
SMART support is: Available - device has SMART capability.
SMART support is: Enabled"#,
            model,
            serial,
            size_gb * 1024 * 1024 * 1024,
            size_gb
        )
    }

    /// Virtual disk without SMART
    pub fn unavailable_output() -> String {
        r#"smartctl 7.2 2020-12-30 r5155 [x86_64-linux-5.10.0] (local build)

=== START OF INFORMATION SECTION ===
Vendor:               QEMU
Product:              QEMU HARDDISK
User Capacity:        21,474,836,480 bytes [21.4 GB]
SMART support is:     Unavailable - device lacks SMART capability."#
            .to_string()
    }
}

/// Mock iostat extended report
pub struct MockIostatData;

impl MockIostatData {
    #[allow(dead_code)]
    pub fn extended(device: &str, util: &str) -> String {
        format!(
            "Linux 6.1.0-18-amd64 (host) \t10/19/2026 \t_x86_64_\t(8 CPU)\n\n\
Device            r/s     w/s     wkB/s  aqu-sz  %util\n\
{}              0.00  412.00 105472.00   15.87  {}\n",
            device, util
        )
    }
}

/// Host with the workstation inventory and matching identity reports
pub fn workstation_runner() -> MockRunner {
    let runner = MockRunner::new();
    runner
        .register(LSBLK_CMD, MockCommandOutput::success(&MockLsblkData::workstation()))
        .register(
            "smartctl -i /dev/sda",
            MockCommandOutput::success(&MockSmartctlData::hdd_output("WDC WD10EZEX-08W", "WD-WCC6Y0000000", 1000)),
        )
        .register(
            "smartctl -i /dev/sdb",
            MockCommandOutput::success(&MockSmartctlData::ssd_output("Samsung SSD 860", "S3Z9NB0K123456", 500)),
        )
        .register(
            "smartctl -i /dev/sdd",
            MockCommandOutput::success(&MockSmartctlData::unavailable_output()),
        );
    runner
}
