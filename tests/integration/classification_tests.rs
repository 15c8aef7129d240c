/// Scan and classification through the orchestrator
use crate::common::mock_commands::*;
use crate::common::test_helpers::*;
use secure_wipe::{DeviceClass, ScanOutcome, WipeError};

fn class_of(outcome: &ScanOutcome, name: &str) -> DeviceClass {
    outcome
        .devices()
        .iter()
        .find(|d| d.name == name)
        .unwrap_or_else(|| panic!("{} missing from scan", name))
        .classification
}

#[tokio::test]
async fn test_workstation_scan_classifies_every_physical_device() {
    let runner = workstation_runner();
    let orchestrator = orchestrator_with(&runner);

    let outcome = orchestrator.scan().await.unwrap();
    assert!(outcome.success());
    assert_eq!(outcome.message(), "Found 6 storage device(s)");

    let names: Vec<_> = outcome.devices().iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["sda", "sdb", "sdc", "sdd", "sr0", "nvme0n1"]);

    assert_eq!(class_of(&outcome, "sda"), DeviceClass::HDD);
    assert_eq!(class_of(&outcome, "sdb"), DeviceClass::SataSSD);
    assert_eq!(class_of(&outcome, "sdc"), DeviceClass::USB);
    assert_eq!(class_of(&outcome, "sdd"), DeviceClass::Unknown);
    assert_eq!(class_of(&outcome, "sr0"), DeviceClass::Unknown);
    assert_eq!(class_of(&outcome, "nvme0n1"), DeviceClass::NVMe);
}

#[tokio::test]
async fn test_identity_queried_only_for_undecided_disks() {
    let runner = workstation_runner();
    let orchestrator = orchestrator_with(&runner);
    orchestrator.scan().await.unwrap();

    let mut smart_calls: Vec<_> = runner
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("smartctl"))
        .collect();
    smart_calls.sort();
    assert_eq!(
        smart_calls,
        vec![
            "smartctl -i /dev/sda",
            "smartctl -i /dev/sdb",
            "smartctl -i /dev/sdd",
        ]
    );
}

#[tokio::test]
async fn test_evidence_trails_explain_verdicts() {
    let orchestrator = orchestrator_with(&workstation_runner());
    orchestrator.scan().await.unwrap();

    let usb = orchestrator.get_device("/dev/sdc").unwrap();
    assert_eq!(usb.transport, "usb");
    assert_eq!(usb.evidence.last().unwrap(), "Detected: USB transport");

    let ssd = orchestrator.get_device("/dev/sdb").unwrap();
    assert_eq!(
        ssd.evidence.last().unwrap(),
        "SMART: Confirmed SSD (Solid State Device)"
    );

    let virtual_disk = orchestrator.get_device("/dev/sdd").unwrap();
    assert_eq!(
        virtual_disk.evidence.last().unwrap(),
        "SMART: Data unavailable (unreliable data)"
    );

    let optical = orchestrator.get_device("/dev/sr0").unwrap();
    assert_eq!(
        optical.evidence.last().unwrap(),
        "Classification: Unrecognized device type 'rom'"
    );
}

#[tokio::test]
async fn test_unknown_devices_get_no_executable_commands() {
    let orchestrator = orchestrator_with(&workstation_runner());
    let outcome = orchestrator.scan().await.unwrap();

    for device in outcome.devices() {
        let executable = device
            .wipe_commands
            .iter()
            .filter(|c| secure_wipe::drives::is_executable(c))
            .count();
        if device.classification == DeviceClass::Unknown {
            assert_eq!(executable, 0, "{} must not be wipeable", device.path);
        } else {
            assert!(executable > 0, "{} needs a wipe command", device.path);
        }
    }
}

#[tokio::test]
async fn test_missing_smartctl_degrades_to_unknown() {
    let runner = MockRunner::new();
    runner.register(
        LSBLK_CMD,
        MockCommandOutput::success(&MockLsblkData::inventory(&[MockLsblkRow {
            name: "sda",
            rota: true,
            kind: "disk",
            model: Some("ST2000DM008"),
            tran: Some("sata"),
            size: "1.8T",
        }])),
    );
    let orchestrator = orchestrator_with(&runner);

    let outcome = orchestrator.scan().await.unwrap();
    assert_eq!(class_of(&outcome, "sda"), DeviceClass::Unknown);
}

#[tokio::test]
async fn test_identity_timeout_degrades_to_unknown() {
    let runner = MockRunner::new();
    runner
        .register(
            LSBLK_CMD,
            MockCommandOutput::success(&MockLsblkData::inventory(&[MockLsblkRow {
                name: "sda",
                rota: true,
                kind: "disk",
                model: None,
                tran: Some("sata"),
                size: "1.8T",
            }])),
        )
        .register("smartctl -i /dev/sda", MockCommandOutput::timeout("smartctl"));
    let orchestrator = orchestrator_with(&runner);

    let outcome = orchestrator.scan().await.unwrap();
    let device = &outcome.devices()[0];
    assert_eq!(device.classification, DeviceClass::Unknown);
    assert_eq!(device.model, "Unknown");
}

#[tokio::test]
async fn test_rescan_replaces_cache_wholesale() {
    let runner = workstation_runner();
    let orchestrator = orchestrator_with(&runner);
    orchestrator.scan().await.unwrap();
    assert_eq!(orchestrator.generation(), 1);

    runner.register(
        LSBLK_CMD,
        MockCommandOutput::success(&MockLsblkData::inventory(&[MockLsblkRow {
            name: "sdc",
            rota: true,
            kind: "disk",
            model: None,
            tran: Some("usb"),
            size: "14.3G",
        }])),
    );
    let outcome = orchestrator.scan().await.unwrap();

    assert_eq!(orchestrator.generation(), 2);
    assert_eq!(outcome.devices().len(), 1);
    assert!(orchestrator.get_device("/dev/sda").is_none());
    assert!(orchestrator.get_device("/dev/sdc").is_some());
}

#[tokio::test]
async fn test_inventory_failure_reports_and_keeps_previous_devices() {
    let runner = workstation_runner();
    let orchestrator = orchestrator_with(&runner);
    orchestrator.scan().await.unwrap();

    runner.register(LSBLK_CMD, MockCommandOutput::failure(32, "lsblk: failed to access sysfs"));
    let outcome = orchestrator.scan().await.unwrap();

    assert!(!outcome.success());
    assert!(outcome.devices().is_empty());
    assert_eq!(orchestrator.cached_devices().len(), 6);
    assert_eq!(orchestrator.generation(), 1);
}

#[tokio::test]
async fn test_scan_refused_while_wipe_running() {
    let runner = workstation_runner();
    let orchestrator = orchestrator_with(&runner);
    let device = usb_device("sdz");

    orchestrator
        .start_wipe_with_plan(
            &device,
            sh_plan("sleep 5"),
            &secure_wipe::WipeConfirmation::for_device("/dev/sdz"),
        )
        .unwrap();

    let err = orchestrator.scan().await.unwrap_err();
    assert!(matches!(err, WipeError::Busy(_)));

    orchestrator.cancel_wipe().await;
    assert!(orchestrator.scan().await.unwrap().success());
}

#[tokio::test]
async fn test_status_counts_cache_and_tools() {
    let runner = workstation_runner();
    runner
        .register("which lsblk", MockCommandOutput::success("/usr/bin/lsblk"))
        .register("which smartctl", MockCommandOutput::success("/usr/sbin/smartctl"));
    let orchestrator = orchestrator_with(&runner);
    orchestrator.scan().await.unwrap();

    let status = orchestrator.status().await;
    assert_eq!(status.cached_devices, 6);
    assert!(status.tools.is_available("lsblk"));
    assert!(status.tools.is_available("smartctl"));
    assert!(!status.tools.is_available("nwipe"));
    assert_eq!(status.tools.available_count(), 2);
}
