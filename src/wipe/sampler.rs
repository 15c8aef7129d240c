// Device utilization sampling while a wipe runs
//
// One `iostat -d -x -y <dev> 1 1` per tick: a single fresh interval rather than
// the since-boot average. Samples are advisory; a missing iostat disables the
// sampler for the rest of the session and nothing else.

use super::session::WipeSession;
use super::state::SessionState;
use crate::system::CommandRunner;
use crate::WipeError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Read %util for `device_name` from an extended iostat report.
///
/// The matching row is the one whose first token is exactly the short device
/// name; %util is its last column.
pub fn parse_iostat_utilization(output: &str, device_name: &str) -> Option<f64> {
    output.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        if fields.next()? != device_name {
            return None;
        }
        let last = fields.last()?;
        last.replace(',', ".").parse().ok()
    })
}

#[derive(Debug, Clone)]
pub struct UtilizationSampler {
    interval: Duration,
    backoff: Duration,
    timeout: Duration,
}

impl UtilizationSampler {
    pub fn new(interval: Duration, backoff: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            backoff,
            timeout,
        }
    }

    /// Sample until the session leaves Running. Returns immediately if it never gets there.
    pub async fn run(self, session: Arc<WipeSession>, runner: Arc<dyn CommandRunner>) {
        let mut states = session.subscribe();
        if wait_until_started(&mut states).await != Some(SessionState::Running) {
            return;
        }

        let device = session.device_name().to_string();
        let args = ["-d", "-x", "-y", device.as_str(), "1", "1"];

        while session.state() == SessionState::Running {
            let started = Instant::now();
            let pause = match runner.run("iostat", &args, self.timeout).await {
                Ok(output) if output.success => {
                    match parse_iostat_utilization(&output.stdout, &device) {
                        Some(percent) => {
                            session.record_utilization(percent);
                            self.interval.saturating_sub(started.elapsed())
                        }
                        None => {
                            tracing::debug!(%device, "No iostat row for device, backing off");
                            self.backoff
                        }
                    }
                }
                Ok(output) => {
                    tracing::debug!(%device, error = %output.error_text(), "iostat failed, backing off");
                    self.backoff
                }
                Err(WipeError::CommandNotFound(_)) => {
                    tracing::warn!(%device, "iostat not available, utilization sampling disabled");
                    return;
                }
                Err(e) => {
                    tracing::debug!(%device, error = %e, "iostat query failed, backing off");
                    self.backoff
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = wait_until_stopped(&mut states) => {}
            }
        }
    }
}

async fn wait_until_started(states: &mut watch::Receiver<SessionState>) -> Option<SessionState> {
    states
        .wait_for(|s| !matches!(s, SessionState::Idle | SessionState::Starting))
        .await
        .map(|s| *s)
        .ok()
}

async fn wait_until_stopped(states: &mut watch::Receiver<SessionState>) {
    let _ = states.wait_for(|s| *s != SessionState::Running).await;
}
