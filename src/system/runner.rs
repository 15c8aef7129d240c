// External command execution with bounded waits
//
// Every diagnostic query (lsblk, smartctl, blockdev, iostat, which) goes
// through `CommandRunner` so a misbehaving tool can never stall the engine
// and tests can script the host's answers.

use crate::{WipeError, WipeResult};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Captured result of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Best available explanation of a failed run
    pub fn error_text(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        match self.code {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, giving up after `timeout`.
    ///
    /// A missing program is reported as [`WipeError::CommandNotFound`], an
    /// expired wait as [`WipeError::Timeout`]. A non-zero exit is not an error
    /// at this level; callers inspect [`CommandOutput::success`].
    async fn run(&self, program: &str, args: &[&str], timeout: Duration)
        -> WipeResult<CommandOutput>;
}

/// Runs commands on the host
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> WipeResult<CommandOutput> {
        tracing::debug!(program, ?args, "Running command");

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => WipeError::CommandNotFound(program.to_string()),
                _ => WipeError::IoError(e),
            })?;

        // Dropping the future on timeout drops the child, which kills it
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(program, ?timeout, "Command timed out");
                return Err(WipeError::Timeout(format!(
                    "{} did not finish within {:?}",
                    program, timeout
                )));
            }
        };

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
