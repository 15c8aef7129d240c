// Destructive process supervision
//
// Each plan step runs as the leader of its own process group so the whole tree
// can be signalled at once. Output from both streams feeds the progress
// parser while the step runner waits for exit. Cancellation is two-phase:
// SIGTERM to the group, a short grace period, then SIGKILL.

use super::progress::{parse_progress_line, LineAssembler};
use super::session::WipeSession;
use super::state::SessionState;
use crate::drives::{WipePlan, WipeStep};
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

pub const PARTIAL_ERASE_WARNING: &str =
    "Wipe cancelled: the device is partially erased and its previous contents are unrecoverable";

#[derive(Debug, Clone, PartialEq, Eq)]
enum StepOutcome {
    Succeeded,
    Cancelled,
    Failed(String),
}

/// Send `signal` to a process group; a group that already exited is not an error
pub fn signal_group(pgid: i32, signal: Signal) {
    match killpg(Pid::from_raw(pgid), signal) {
        Ok(()) => tracing::debug!(pgid, ?signal, "Signalled process group"),
        Err(Errno::ESRCH) => tracing::debug!(pgid, ?signal, "Process group already gone"),
        Err(e) => tracing::warn!(pgid, ?signal, error = %e, "Failed to signal process group"),
    }
}

/// Runs a wipe plan against one session
pub struct WipeSupervisor {
    session: Arc<WipeSession>,
    stream_drain: Duration,
}

impl WipeSupervisor {
    pub fn new(session: Arc<WipeSession>, stream_drain: Duration) -> Self {
        Self {
            session,
            stream_drain,
        }
    }

    /// Run every step in order and move the session to its terminal state.
    /// The session must be in Starting.
    pub async fn run(self, plan: WipePlan) -> SessionState {
        let outcome = if plan.steps.is_empty() {
            StepOutcome::Failed("Wipe plan has no steps".to_string())
        } else {
            self.run_steps(&plan).await
        };

        let (state, message) = match outcome {
            StepOutcome::Succeeded => (SessionState::Completed, None),
            StepOutcome::Cancelled => (
                SessionState::Cancelled,
                Some(PARTIAL_ERASE_WARNING.to_string()),
            ),
            StepOutcome::Failed(message) => (SessionState::Failed, Some(message)),
        };

        match self.session.finish(state, message) {
            Ok(()) => {
                tracing::info!(session = %self.session.id(), %state, "Wipe finished");
                state
            }
            Err(e) => {
                // Already terminal, forced by an unresponsive cancel
                tracing::warn!(session = %self.session.id(), error = %e, "Session already finished");
                self.session.state()
            }
        }
    }

    async fn run_steps(&self, plan: &WipePlan) -> StepOutcome {
        for (index, step) in plan.steps.iter().enumerate() {
            if self.session.cancel_requested() {
                return StepOutcome::Cancelled;
            }
            tracing::info!(
                session = %self.session.id(),
                step = index + 1,
                of = plan.steps.len(),
                command = %step,
                "Starting wipe step"
            );
            match self.run_step(step).await {
                StepOutcome::Succeeded => continue,
                other => return other,
            }
        }
        StepOutcome::Succeeded
    }

    async fn run_step(&self, step: &WipeStep) -> StepOutcome {
        let spawned = Command::new(&step.program)
            .args(&step.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(program = %step.program, error = %e, "Failed to launch wipe command");
                return StepOutcome::Failed(format!("Failed to launch {}: {}", step.program, e));
            }
        };

        if let Some(pid) = child.id() {
            let pgid = pid as i32;
            if self.session.attach_process(pgid) {
                signal_group(pgid, Signal::SIGKILL);
            }
        }

        if self.session.state() == SessionState::Starting {
            if let Err(e) = self.session.transition(SessionState::Running) {
                tracing::warn!(error = %e, "Could not mark session running");
            }
        }

        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, self.session.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, self.session.clone()));
        }

        let status = child.wait().await;
        self.session.detach_process();
        self.drain(readers).await;

        if self.session.cancel_requested() {
            return StepOutcome::Cancelled;
        }

        match status {
            Ok(status) if status.success() => StepOutcome::Succeeded,
            Ok(status) => {
                let exit = match status.code() {
                    Some(code) => format!("exit code {}", code),
                    None => "a signal".to_string(),
                };
                let mut message = format!("{} terminated with {}", step.program, exit);
                if let Some(line) = self.session.last_output() {
                    message.push_str(": ");
                    message.push_str(&line);
                }
                StepOutcome::Failed(message)
            }
            Err(e) => StepOutcome::Failed(format!("Failed to wait for {}: {}", step.program, e)),
        }
    }

    /// Let the readers finish the remaining output, but never wait on a cancelled step
    async fn drain(&self, mut readers: Vec<JoinHandle<()>>) {
        if !self.session.cancel_requested() {
            let finished = tokio::time::timeout(
                self.stream_drain,
                futures::future::join_all(readers.iter_mut()),
            )
            .await;
            if finished.is_ok() {
                return;
            }
            tracing::debug!("Output streams still open after exit, detaching");
        }
        for reader in &readers {
            reader.abort();
        }
    }
}

fn spawn_reader<R>(mut stream: R, session: Arc<WipeSession>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut assembler = LineAssembler::new();
        let mut buf = [0u8; 4096];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    for line in assembler.feed(&buf[..n]) {
                        handle_line(&session, &line);
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Output stream read failed");
                    break;
                }
            }
        }
        if let Some(line) = assembler.finish() {
            handle_line(&session, &line);
        }
    })
}

fn handle_line(session: &WipeSession, line: &str) {
    match parse_progress_line(line) {
        Some(sample) => {
            session.apply_progress(sample);
        }
        None => session.note_output(line),
    }
}

/// Two-phase cancellation. Returns the state the session ended in.
///
/// A session that is not active is left untouched and its current state returned.
pub async fn cancel_session(
    session: &WipeSession,
    grace: Duration,
    kill_wait: Duration,
) -> SessionState {
    let (state, pgid) = session.request_cancel();
    if !state.is_active() {
        return state;
    }

    tracing::warn!(session = %session.id(), device = %session.device_path(), "Cancelling wipe");
    let Some(pgid) = pgid else {
        // Nothing launched yet; the runner sees the request before it spawns anything
        if let Some(state) = session.wait_terminal(grace + kill_wait).await {
            return state;
        }
        tracing::warn!(session = %session.id(), "Session did not settle after cancel before launch");
        return force_cancelled(session);
    };

    signal_group(pgid, Signal::SIGTERM);
    if let Some(state) = session.wait_terminal(grace).await {
        return state;
    }

    if let Some(pgid) = session.pgid() {
        tracing::warn!(pgid, "Process group ignored SIGTERM, sending SIGKILL");
        signal_group(pgid, Signal::SIGKILL);
    }
    if let Some(state) = session.wait_terminal(kill_wait).await {
        return state;
    }

    tracing::error!(session = %session.id(), "Wipe process did not exit after SIGKILL");
    force_cancelled(session)
}

fn force_cancelled(session: &WipeSession) -> SessionState {
    if let Err(e) = session.finish(
        SessionState::Cancelled,
        Some(PARTIAL_ERASE_WARNING.to_string()),
    ) {
        tracing::debug!(error = %e, "Session finished concurrently");
    }
    session.state()
}
