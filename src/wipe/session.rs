// Shared state of one wipe session
//
// The step runner, the stream readers and the utilization sampler all write
// here; consumers read snapshots. Every critical section is short and never
// spans an await. State changes are additionally published on a watch channel.

use super::history::UtilizationHistory;
use super::progress::{estimate_eta, percent_complete, ProgressSample};
use super::state::{Eta, SessionSnapshot, SessionState};
use crate::{WipeError, WipeResult};
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use uuid::Uuid;

#[derive(Debug)]
struct SessionInner {
    state: SessionState,
    bytes_total: Option<u64>,
    bytes_copied: u64,
    last_sample: Option<ProgressSample>,
    history: UtilizationHistory,
    message: Option<String>,
    last_output: Option<String>,
    pgid: Option<i32>,
    cancel_requested: bool,
    finished_after: Option<Duration>,
}

#[derive(Debug)]
pub struct WipeSession {
    id: String,
    device_path: String,
    device_name: String,
    started_at: DateTime<Utc>,
    started: Instant,
    inner: Mutex<SessionInner>,
    state_tx: watch::Sender<SessionState>,
    cancel_tx: watch::Sender<bool>,
}

impl WipeSession {
    pub fn new(device_path: &str, device_name: &str, history_capacity: usize) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        let (cancel_tx, _) = watch::channel(false);
        Self {
            id: Uuid::new_v4().to_string(),
            device_path: device_path.to_string(),
            device_name: device_name.to_string(),
            started_at: Utc::now(),
            started: Instant::now(),
            inner: Mutex::new(SessionInner {
                state: SessionState::Idle,
                bytes_total: None,
                bytes_copied: 0,
                last_sample: None,
                history: UtilizationHistory::new(history_capacity),
                message: None,
                last_output: None,
                pgid: None,
                cancel_requested: false,
                finished_after: None,
            }),
            state_tx,
            cancel_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Move to `to`, refusing anything the lifecycle does not allow
    pub fn transition(&self, to: SessionState) -> WipeResult<()> {
        self.transition_with(to, None)
    }

    /// Enter a terminal state with an optional diagnostic message
    pub fn finish(&self, to: SessionState, message: Option<String>) -> WipeResult<()> {
        self.transition_with(to, message)
    }

    fn transition_with(&self, to: SessionState, message: Option<String>) -> WipeResult<()> {
        {
            let mut inner = self.lock();
            let from = inner.state;
            if !from.can_transition(to) {
                return Err(WipeError::InvalidTransition { from, to });
            }
            inner.state = to;
            if message.is_some() {
                inner.message = message;
            }
            if to.is_terminal() {
                inner.finished_after = Some(self.started.elapsed());
                inner.pgid = None;
                if to == SessionState::Completed {
                    if let Some(total) = inner.bytes_total {
                        inner.bytes_copied = inner.bytes_copied.max(total);
                    }
                }
            }
            tracing::info!(session = %self.id, device = %self.device_path, %from, %to, "Session transition");
        }
        self.state_tx.send_replace(to);
        Ok(())
    }

    pub fn set_total(&self, bytes_total: Option<u64>) {
        self.lock().bytes_total = bytes_total;
    }

    /// Record a progress sample. Ignored outside Running; bytes never go backwards.
    pub fn apply_progress(&self, sample: ProgressSample) -> bool {
        let mut inner = self.lock();
        if inner.state != SessionState::Running {
            return false;
        }
        inner.bytes_copied = inner.bytes_copied.max(sample.bytes_copied);
        inner.last_sample = Some(sample);
        true
    }

    /// Remember the latest non-progress output line for failure diagnostics
    pub fn note_output(&self, line: &str) {
        let line = line.trim();
        if !line.is_empty() {
            self.lock().last_output = Some(line.to_string());
        }
    }

    pub fn last_output(&self) -> Option<String> {
        self.lock().last_output.clone()
    }

    pub fn record_utilization(&self, percent: f64) {
        let mut inner = self.lock();
        if inner.state == SessionState::Running {
            inner.history.push(percent);
        }
    }

    /// Attach the process group of a freshly spawned step.
    /// Returns true if a cancel arrived before the process could be registered.
    pub fn attach_process(&self, pgid: i32) -> bool {
        let mut inner = self.lock();
        inner.pgid = Some(pgid);
        inner.cancel_requested
    }

    pub fn detach_process(&self) {
        self.lock().pgid = None;
    }

    pub fn pgid(&self) -> Option<i32> {
        self.lock().pgid
    }

    /// Flag the session for cancellation; returns the state and process group seen at that moment
    pub fn request_cancel(&self) -> (SessionState, Option<i32>) {
        let (state, pgid, flagged) = {
            let mut inner = self.lock();
            if inner.state.is_active() {
                inner.cancel_requested = true;
            }
            (inner.state, inner.pgid, inner.cancel_requested)
        };
        if flagged {
            self.cancel_tx.send_replace(true);
        }
        (state, pgid)
    }

    pub fn cancel_requested(&self) -> bool {
        self.lock().cancel_requested
    }

    /// Resolves once a cancel has been requested, immediately if one already was
    pub async fn cancelled(&self) {
        let mut requests = self.cancel_tx.subscribe();
        // The sender lives as long as the session, so this only ends on a request
        let _ = requests.wait_for(|requested| *requested).await;
    }

    /// Wait up to `limit` for a terminal state
    pub async fn wait_terminal(&self, limit: Duration) -> Option<SessionState> {
        let mut states = self.subscribe();
        let waited = tokio::time::timeout(limit, states.wait_for(|s| s.is_terminal())).await;
        match waited {
            Ok(Ok(state)) => Some(*state),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.lock();
        let elapsed = inner.finished_after.unwrap_or_else(|| self.started.elapsed());

        let (percent, eta) = match inner.state {
            SessionState::Completed => (Some(100.0), Eta::Remaining { seconds: 0 }),
            _ => (
                percent_complete(inner.bytes_copied, inner.bytes_total),
                estimate_eta(
                    inner.bytes_copied,
                    inner.bytes_total,
                    inner.last_sample.as_ref(),
                ),
            ),
        };

        SessionSnapshot {
            id: Some(self.id.clone()),
            device_path: Some(self.device_path.clone()),
            state: inner.state,
            percent,
            bytes_copied: inner.bytes_copied,
            bytes_total: inner.bytes_total,
            elapsed_secs: elapsed.as_secs_f64(),
            throughput_mbps: inner.last_sample.map(|s| s.throughput_mbps),
            eta,
            utilization: inner.history.to_vec(),
            message: inner.message.clone(),
            started_at: Some(self.started_at),
        }
    }
}
