// Allow uppercase acronyms for industry-standard terms like HDD, SSD, NVMe, USB
#![allow(clippy::upper_case_acronyms)]

pub mod config;
pub mod drives;
pub mod system;
pub mod ui;
pub mod wipe;
pub mod wipe_orchestrator;

// Re-export the main orchestrator for convenience
pub use config::EngineConfig;
pub use wipe_orchestrator::{
    CancelOutcome, ScanOutcome, SystemStatus, WipeConfirmation, WipeOrchestrator,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

// Global flag for handling Ctrl+C interrupts
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Set the interrupt flag (called by signal handler)
pub fn set_interrupted() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Check if an interrupt has been received
pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Reset the interrupt flag (primarily for testing)
pub fn reset_interrupted() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}

#[derive(Error, Debug)]
pub enum WipeError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Device enumeration failed: {0}")]
    Enumeration(String),

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Operation timeout: {0}")]
    Timeout(String),

    #[error("Busy: {0}")]
    Busy(String),

    #[error("Refusing to wipe {path}: device is classified {classification}")]
    InvalidClassification {
        path: String,
        classification: DeviceClass,
    },

    #[error("Confirmation was given for {confirmed}, not {requested}")]
    ConfirmationMismatch { confirmed: String, requested: String },

    #[error("Device not found: {0}")]
    NotFound(String),

    #[error("Failed to launch wipe command: {0}")]
    Launch(String),

    #[error("Invalid session transition from {from} to {to}")]
    InvalidTransition {
        from: wipe::SessionState,
        to: wipe::SessionState,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

// Manual Clone implementation because std::io::Error doesn't implement Clone
impl Clone for WipeError {
    fn clone(&self) -> Self {
        match self {
            WipeError::IoError(e) => {
                WipeError::IoError(std::io::Error::new(e.kind(), e.to_string()))
            }
            WipeError::Enumeration(s) => WipeError::Enumeration(s.clone()),
            WipeError::CommandNotFound(s) => WipeError::CommandNotFound(s.clone()),
            WipeError::CommandFailed(s) => WipeError::CommandFailed(s.clone()),
            WipeError::Timeout(s) => WipeError::Timeout(s.clone()),
            WipeError::Busy(s) => WipeError::Busy(s.clone()),
            WipeError::InvalidClassification {
                path,
                classification,
            } => WipeError::InvalidClassification {
                path: path.clone(),
                classification: *classification,
            },
            WipeError::ConfirmationMismatch {
                confirmed,
                requested,
            } => WipeError::ConfirmationMismatch {
                confirmed: confirmed.clone(),
                requested: requested.clone(),
            },
            WipeError::NotFound(s) => WipeError::NotFound(s.clone()),
            WipeError::Launch(s) => WipeError::Launch(s.clone()),
            WipeError::InvalidTransition { from, to } => WipeError::InvalidTransition {
                from: *from,
                to: *to,
            },
            WipeError::Config(s) => WipeError::Config(s.clone()),
        }
    }
}

pub type WipeResult<T> = Result<T, WipeError>;

/// Storage device classes the classifier can settle on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeviceClass {
    #[serde(rename = "HDD")]
    HDD,
    #[serde(rename = "SATA_SSD")]
    SataSSD,
    #[serde(rename = "NVME")]
    NVMe,
    #[serde(rename = "USB")]
    USB,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl DeviceClass {
    pub const ALL: [DeviceClass; 5] = [
        DeviceClass::HDD,
        DeviceClass::SataSSD,
        DeviceClass::NVMe,
        DeviceClass::USB,
        DeviceClass::Unknown,
    ];

    /// Operator-facing label
    pub fn label(&self) -> &'static str {
        match self {
            DeviceClass::HDD => "HDD",
            DeviceClass::SataSSD => "SATA SSD",
            DeviceClass::NVMe => "NVME",
            DeviceClass::USB => "USB",
            DeviceClass::Unknown => "UNKNOWN",
        }
    }

    /// Whether a destructive command may ever be paired with this class
    pub fn is_actionable(&self) -> bool {
        !matches!(self, DeviceClass::Unknown)
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the block-device inventory, before classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDeviceRecord {
    pub name: String,
    pub transport: Option<String>,
    pub rotational: bool,
    pub device_type: Option<String>,
    pub model: Option<String>,
    pub size: Option<String>,
}

impl RawDeviceRecord {
    pub fn device_path(&self) -> String {
        format!("/dev/{}", self.name)
    }
}

/// A device together with the classification verdict and the evidence behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedDevice {
    pub name: String,
    pub path: String,
    pub model: String,
    pub size: String,
    pub transport: String,
    pub is_rotational: bool,
    pub classification: DeviceClass,
    pub evidence: Vec<String>,
    pub wipe_commands: Vec<String>,
}
