/// Common test helper functions

use super::mock_commands::MockRunner;
use secure_wipe::drives::{WipePlan, WipeStep};
use secure_wipe::wipe::SessionState;
use secure_wipe::{ClassifiedDevice, DeviceClass, EngineConfig, WipeOrchestrator};
use std::sync::Arc;
use std::time::Duration;

/// Defaults with sampling fast enough for short test sessions
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        sample_interval_ms: 20,
        sample_backoff_ms: 20,
        ..Default::default()
    }
}

pub fn orchestrator_with(runner: &MockRunner) -> WipeOrchestrator {
    WipeOrchestrator::new(fast_config(), Arc::new(runner.clone()))
}

/// Stand-in device; sessions never touch its path
pub fn usb_device(name: &str) -> ClassifiedDevice {
    ClassifiedDevice {
        name: name.to_string(),
        path: format!("/dev/{}", name),
        model: "Test Stick".to_string(),
        size: "1G".to_string(),
        transport: "usb".to_string(),
        is_rotational: false,
        classification: DeviceClass::USB,
        evidence: vec!["Detected: USB transport".to_string()],
        wipe_commands: Vec::new(),
    }
}

/// Plan that runs `script` with sh in place of a wipe tool
pub fn sh_plan(script: &str) -> WipePlan {
    WipePlan::single(WipeStep::new("sh", ["-c", script]))
}

/// dd-style progress lines for `chunks` MiB, one every `delay` seconds
pub fn dd_script(chunks: u64, delay: &str) -> String {
    let mut script = String::new();
    for i in 1..=chunks {
        script.push_str(&format!(
            "printf '{} bytes ({} MB) copied, {} s, 1.0 MB/s\\r' >&2; sleep {}; ",
            i * 1_048_576,
            i,
            i,
            delay
        ));
    }
    script.push_str("true");
    script
}

/// Wait until the current session reaches `target`
pub async fn wait_for_state(orchestrator: &WipeOrchestrator, target: SessionState) {
    let mut states = orchestrator.subscribe().expect("session exists");
    tokio::time::timeout(Duration::from_secs(10), states.wait_for(|s| *s == target))
        .await
        .expect("state reached in time")
        .expect("session alive");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dd_script_lines() {
        let script = dd_script(2, "0");
        assert!(script.contains("1048576 bytes (1 MB) copied, 1 s, 1.0 MB/s"));
        assert!(script.contains("2097152 bytes (2 MB) copied, 2 s, 1.0 MB/s"));
        assert!(script.ends_with("true"));
    }
}
