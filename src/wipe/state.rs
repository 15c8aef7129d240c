// Session lifecycle states and the snapshot handed to consumers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a wipe session.
///
/// `Idle -> Starting -> Running -> {Completed, Cancelled, Failed}`; a session
/// may also leave `Starting` directly for `Failed` (launch error) or
/// `Cancelled` (cancel before launch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Starting,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Cancelled | SessionState::Failed
        )
    }

    /// Starting or Running: the device is, or is about to be, written
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Starting | SessionState::Running)
    }

    pub fn can_transition(&self, to: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, to),
            (Idle, Starting)
                | (Starting, Running)
                | (Starting, Failed)
                | (Starting, Cancelled)
                | (Running, Completed)
                | (Running, Cancelled)
                | (Running, Failed)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Starting => "starting",
            SessionState::Running => "running",
            SessionState::Completed => "completed",
            SessionState::Cancelled => "cancelled",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Estimated time remaining
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Eta {
    Calculating,
    Remaining { seconds: u64 },
}

impl fmt::Display for Eta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Eta::Calculating => f.write_str("calculating"),
            Eta::Remaining { seconds } => write!(f, "{}s", seconds),
        }
    }
}

/// Point-in-time copy of a session, safe to hand across threads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: Option<String>,
    pub device_path: Option<String>,
    pub state: SessionState,
    /// Withheld while the device size is unknown
    pub percent: Option<f64>,
    pub bytes_copied: u64,
    pub bytes_total: Option<u64>,
    pub elapsed_secs: f64,
    pub throughput_mbps: Option<f64>,
    pub eta: Eta,
    pub utilization: Vec<f64>,
    pub message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
}

impl SessionSnapshot {
    /// Snapshot reported when no session has ever been started
    pub fn idle() -> Self {
        Self {
            id: None,
            device_path: None,
            state: SessionState::Idle,
            percent: None,
            bytes_copied: 0,
            bytes_total: None,
            elapsed_secs: 0.0,
            throughput_mbps: None,
            eta: Eta::Calculating,
            utilization: Vec::new(),
            message: None,
            started_at: None,
        }
    }
}
