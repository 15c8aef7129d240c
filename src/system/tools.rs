// Host capability checks: tool availability and privilege level

use super::runner::CommandRunner;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const WHICH_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolStatus {
    pub name: String,
    pub available: bool,
}

/// Availability of each external tool, in the order they were requested.
/// Recomputed on every call; never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolAvailability {
    pub tools: Vec<ToolStatus>,
}

impl ToolAvailability {
    pub async fn probe(runner: &dyn CommandRunner, names: &[String]) -> Self {
        let mut tools = Vec::with_capacity(names.len());
        for name in names {
            let available = match runner.run("which", &[name.as_str()], WHICH_TIMEOUT).await {
                Ok(output) => output.success,
                Err(e) => {
                    tracing::debug!(tool = %name, error = %e, "Tool lookup failed");
                    false
                }
            };
            tools.push(ToolStatus {
                name: name.clone(),
                available,
            });
        }
        Self { tools }
    }

    pub fn is_available(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name == name && t.available)
    }

    pub fn available_count(&self) -> usize {
        self.tools.iter().filter(|t| t.available).count()
    }

    pub fn missing(&self) -> Vec<&str> {
        self.tools
            .iter()
            .filter(|t| !t.available)
            .map(|t| t.name.as_str())
            .collect()
    }

    pub fn all_available(&self) -> bool {
        self.tools.iter().all(|t| t.available)
    }
}

pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}
