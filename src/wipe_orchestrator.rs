// Wipe Orchestrator - process-scoped entry point for scans and wipe sessions
//
// Owns the cached device list of the latest scan generation and the single
// current wipe session. Scanning and wiping are mutually exclusive: a scan is
// refused while a session is Starting/Running and a wipe is refused while a
// scan is in progress.

use crate::config::EngineConfig;
use crate::drives::{wipe_plan, Classifier, DeviceEnumerator, WipePlan};
use crate::system::{is_root, CommandRunner, SystemRunner, ToolAvailability};
use crate::wipe::{
    cancel_session, SessionSnapshot, SessionState, UtilizationSampler, WipeSession,
    WipeSupervisor,
};
use crate::{ClassifiedDevice, WipeError, WipeResult};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tokio::sync::watch;

/// Diagnostic for a session cancelled before any data was written
pub const CANCELLED_BEFORE_LAUNCH: &str =
    "Wipe cancelled before the wipe command was launched; the device was not written";

/// Result of a scan request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanOutcome {
    Found {
        message: String,
        generation: u64,
        devices: Vec<ClassifiedDevice>,
    },
    Failed {
        message: String,
    },
}

impl ScanOutcome {
    pub fn success(&self) -> bool {
        matches!(self, ScanOutcome::Found { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            ScanOutcome::Found { message, .. } | ScanOutcome::Failed { message } => message,
        }
    }

    /// Devices of this scan; empty when the scan failed
    pub fn devices(&self) -> &[ClassifiedDevice] {
        match self {
            ScanOutcome::Found { devices, .. } => devices,
            ScanOutcome::Failed { .. } => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemStatus {
    pub is_root: bool,
    pub cached_devices: usize,
    pub tools: ToolAvailability,
}

/// Explicit operator confirmation naming the device to be erased
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WipeConfirmation {
    device_path: String,
}

impl WipeConfirmation {
    pub fn for_device(device_path: impl Into<String>) -> Self {
        Self {
            device_path: device_path.into(),
        }
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

/// Result of a cancel request
#[derive(Debug, Clone, PartialEq)]
pub enum CancelOutcome {
    /// No session was ever started
    NothingToCancel,
    /// The session had already reached this terminal state
    AlreadyFinished(SessionState),
    Cancelled(SessionSnapshot),
}

#[derive(Default)]
struct DeviceCache {
    generation: u64,
    devices: Vec<ClassifiedDevice>,
}

#[derive(Default)]
struct Gate {
    scanning: bool,
    session: Option<Arc<WipeSession>>,
}

impl Gate {
    fn session_active(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.state().is_active())
    }
}

/// Clears the scanning flag however the scan ends
struct ScanGuard<'a> {
    gate: &'a Mutex<Gate>,
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.gate.lock().unwrap_or_else(|e| e.into_inner()).scanning = false;
    }
}

pub struct WipeOrchestrator {
    config: EngineConfig,
    runner: Arc<dyn CommandRunner>,
    enumerator: DeviceEnumerator,
    classifier: Classifier,
    cache: RwLock<DeviceCache>,
    gate: Mutex<Gate>,
}

impl WipeOrchestrator {
    pub fn new(config: EngineConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let enumerator =
            DeviceEnumerator::new(config.ignore_prefixes.clone(), config.inventory_timeout());
        let classifier = Classifier::new(config.nvme_prefix.clone(), config.diagnostic_timeout());
        Self {
            config,
            runner,
            enumerator,
            classifier,
            cache: RwLock::new(DeviceCache::default()),
            gate: Mutex::new(Gate::default()),
        }
    }

    /// Orchestrator that talks to the real host
    pub fn with_system(config: EngineConfig) -> Self {
        Self::new(config, Arc::new(SystemRunner))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn gate(&self) -> MutexGuard<'_, Gate> {
        self.gate.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Enumerate and classify every physical device, replacing the cache wholesale.
    ///
    /// Enumeration failures are reported as [`ScanOutcome::Failed`] and leave the
    /// previous generation cached. Only a scan/wipe conflict is an error.
    pub async fn scan(&self) -> WipeResult<ScanOutcome> {
        let _guard = {
            let mut gate = self.gate();
            if gate.scanning {
                return Err(WipeError::Busy("a device scan is already in progress".to_string()));
            }
            if gate.session_active() {
                return Err(WipeError::Busy(
                    "cannot scan while a wipe session is active".to_string(),
                ));
            }
            gate.scanning = true;
            ScanGuard { gate: &self.gate }
        };

        tracing::info!("Scanning storage devices");
        let records = match self.enumerator.enumerate(self.runner.as_ref()).await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(error = %e, "Device scan failed");
                return Ok(ScanOutcome::Failed {
                    message: e.to_string(),
                });
            }
        };

        let runner = self.runner.as_ref();
        let devices = futures::future::join_all(
            records
                .iter()
                .map(|record| self.classifier.classify(record, runner)),
        )
        .await;

        let generation = {
            let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
            cache.generation += 1;
            cache.devices = devices.clone();
            cache.generation
        };

        let message = if devices.is_empty() {
            "No storage devices found".to_string()
        } else {
            format!("Found {} storage device(s)", devices.len())
        };
        tracing::info!(generation, count = devices.len(), "Scan complete");

        Ok(ScanOutcome::Found {
            message,
            generation,
            devices,
        })
    }

    pub async fn status(&self) -> SystemStatus {
        let tools = ToolAvailability::probe(self.runner.as_ref(), &self.config.required_tools).await;
        SystemStatus {
            is_root: is_root(),
            cached_devices: self.cache.read().unwrap_or_else(|e| e.into_inner()).devices.len(),
            tools,
        }
    }

    /// Device from the latest scan with this path
    pub fn get_device(&self, path: &str) -> Option<ClassifiedDevice> {
        self.cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .devices
            .iter()
            .find(|device| device.path == path)
            .cloned()
    }

    pub fn cached_devices(&self) -> Vec<ClassifiedDevice> {
        self.cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .devices
            .clone()
    }

    pub fn generation(&self) -> u64 {
        self.cache.read().unwrap_or_else(|e| e.into_inner()).generation
    }

    /// Start erasing `device` with the plan for its classification.
    ///
    /// Must be called from within a Tokio runtime; the session runs in the background.
    pub fn start_wipe(
        &self,
        device: &ClassifiedDevice,
        confirmation: &WipeConfirmation,
    ) -> WipeResult<Arc<WipeSession>> {
        let plan = wipe_plan(device.classification, &device.path).ok_or_else(|| {
            WipeError::InvalidClassification {
                path: device.path.clone(),
                classification: device.classification,
            }
        })?;
        self.start_wipe_with_plan(device, plan, confirmation)
    }

    /// Start a session that runs `plan` instead of the plan derived from the classification.
    ///
    /// Used to drive sessions with stand-in commands; presentation layers call [`Self::start_wipe`].
    #[doc(hidden)]
    pub fn start_wipe_with_plan(
        &self,
        device: &ClassifiedDevice,
        plan: WipePlan,
        confirmation: &WipeConfirmation,
    ) -> WipeResult<Arc<WipeSession>> {
        if !device.classification.is_actionable() {
            return Err(WipeError::InvalidClassification {
                path: device.path.clone(),
                classification: device.classification,
            });
        }
        if confirmation.device_path() != device.path {
            return Err(WipeError::ConfirmationMismatch {
                confirmed: confirmation.device_path().to_string(),
                requested: device.path.clone(),
            });
        }

        let session = {
            let mut gate = self.gate();
            if gate.scanning {
                return Err(WipeError::Busy(
                    "cannot start a wipe while a device scan is in progress".to_string(),
                ));
            }
            if gate.session_active() {
                return Err(WipeError::Busy("a wipe session is already active".to_string()));
            }

            let session = Arc::new(WipeSession::new(
                &device.path,
                &device.name,
                self.config.utilization_capacity,
            ));
            session.transition(SessionState::Starting)?;
            gate.session = Some(session.clone());
            session
        };

        tracing::warn!(
            session = %session.id(),
            device = %device.path,
            class = %device.classification,
            plan = ?plan.steps.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "Starting destructive wipe"
        );

        tokio::spawn(drive_session(
            session.clone(),
            plan,
            self.runner.clone(),
            self.config.clone(),
        ));
        Ok(session)
    }

    /// Cancel the current session with SIGTERM, then SIGKILL after the grace period
    pub async fn cancel_wipe(&self) -> CancelOutcome {
        let session = self.gate().session.clone();
        let Some(session) = session else {
            return CancelOutcome::NothingToCancel;
        };

        let state = session.state();
        if state.is_terminal() {
            tracing::info!(%state, "Cancel requested after the session finished");
            return CancelOutcome::AlreadyFinished(state);
        }

        match cancel_session(&session, self.config.cancel_grace(), self.config.kill_wait()).await {
            SessionState::Cancelled => CancelOutcome::Cancelled(session.snapshot()),
            other => CancelOutcome::AlreadyFinished(other),
        }
    }

    /// Snapshot of the current session, or an idle snapshot if none was started
    pub fn poll_session(&self) -> SessionSnapshot {
        self.gate()
            .session
            .as_ref()
            .map(|session| session.snapshot())
            .unwrap_or_else(SessionSnapshot::idle)
    }

    /// State changes of the current session
    pub fn subscribe(&self) -> Option<watch::Receiver<SessionState>> {
        self.gate().session.as_ref().map(|session| session.subscribe())
    }
}

/// Background body of one session: size query, sampler, then the plan
async fn drive_session(
    session: Arc<WipeSession>,
    plan: WipePlan,
    runner: Arc<dyn CommandRunner>,
    config: EngineConfig,
) {
    let size_query =
        DeviceEnumerator::device_size(runner.as_ref(), session.device_path(), config.size_timeout());
    let size = tokio::select! {
        size = size_query => size,
        _ = session.cancelled() => {
            tracing::info!(session = %session.id(), "Cancelled before the wipe command was launched");
            if let Err(e) = session.finish(
                SessionState::Cancelled,
                Some(CANCELLED_BEFORE_LAUNCH.to_string()),
            ) {
                tracing::debug!(error = %e, "Session finished concurrently");
            }
            return;
        }
    };
    let total = match size {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::warn!(device = %session.device_path(), error = %e, "Device size unknown, progress percent withheld");
            None
        }
    };
    session.set_total(total);

    let sampler = UtilizationSampler::new(
        config.sample_interval(),
        config.sample_backoff(),
        config.utilization_timeout(),
    );
    let sampler_task = tokio::spawn(sampler.run(session.clone(), runner));

    WipeSupervisor::new(session, config.stream_drain())
        .run(plan)
        .await;

    if let Err(e) = sampler_task.await {
        tracing::debug!(error = %e, "Utilization sampler ended abnormally");
    }
}
