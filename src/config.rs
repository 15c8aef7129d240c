// Engine configuration
//
// Layered the same way every time: built-in defaults, then an optional TOML
// file, then SECURE_WIPE_* environment variables.

use crate::{WipeError, WipeResult};
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "SECURE_WIPE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Device name prefixes that never show up in a scan (loop, zram, device-mapper)
    pub ignore_prefixes: Vec<String>,
    /// Device name prefix that identifies NVMe namespaces
    pub nvme_prefix: String,
    /// Tools reported by the status query
    pub required_tools: Vec<String>,
    pub inventory_timeout_ms: u64,
    pub diagnostic_timeout_ms: u64,
    pub size_timeout_ms: u64,
    pub utilization_timeout_ms: u64,
    pub sample_interval_ms: u64,
    pub sample_backoff_ms: u64,
    pub utilization_capacity: usize,
    pub cancel_grace_ms: u64,
    pub kill_wait_ms: u64,
    pub stream_drain_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ignore_prefixes: vec!["loop".to_string(), "zram".to_string(), "dm-".to_string()],
            nvme_prefix: "nvme".to_string(),
            required_tools: [
                "lsblk", "smartctl", "hdparm", "nvme", "nwipe", "dd", "shred", "blockdev",
                "iostat",
            ]
            .iter()
            .map(|t| t.to_string())
            .collect(),
            inventory_timeout_ms: 10_000,
            diagnostic_timeout_ms: 6_000,
            size_timeout_ms: 6_000,
            utilization_timeout_ms: 6_000,
            sample_interval_ms: 1_000,
            sample_backoff_ms: 2_000,
            utilization_capacity: 60,
            cancel_grace_ms: 500,
            kill_wait_ms: 2_000,
            stream_drain_ms: 1_000,
        }
    }
}

impl EngineConfig {
    /// Default location of the configuration file, if the platform has one
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "secure-wipe", "secure-wipe")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load defaults, then `path` (or the default path) if it exists, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file_path = path.map(Path::to_path_buf).or_else(Self::default_path);

        let mut builder = Config::builder().add_source(
            Config::try_from(&EngineConfig::default())
                .context("Failed to seed configuration defaults")?,
        );

        if let Some(file_path) = &file_path {
            // An explicitly requested file must exist; the default one is optional
            builder = builder.add_source(File::from(file_path.as_path()).required(path.is_some()));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("ignore_prefixes")
                    .with_list_parse_key("required_tools"),
            )
            .build()
            .context("Failed to read configuration")?;

        let config: EngineConfig = settings
            .try_deserialize()
            .context("Failed to parse configuration")?;
        config.validate()?;

        tracing::debug!(file = ?file_path, "Configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> WipeResult<()> {
        if self.utilization_capacity == 0 {
            return Err(WipeError::Config(
                "utilization_capacity must be at least 1".to_string(),
            ));
        }
        if self.sample_interval_ms == 0 {
            return Err(WipeError::Config(
                "sample_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.nvme_prefix.is_empty() {
            return Err(WipeError::Config("nvme_prefix must not be empty".to_string()));
        }
        let timeouts = [
            ("inventory_timeout_ms", self.inventory_timeout_ms),
            ("diagnostic_timeout_ms", self.diagnostic_timeout_ms),
            ("size_timeout_ms", self.size_timeout_ms),
            ("utilization_timeout_ms", self.utilization_timeout_ms),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                return Err(WipeError::Config(format!("{} must be greater than zero", name)));
            }
        }
        Ok(())
    }

    pub fn inventory_timeout(&self) -> Duration {
        Duration::from_millis(self.inventory_timeout_ms)
    }

    pub fn diagnostic_timeout(&self) -> Duration {
        Duration::from_millis(self.diagnostic_timeout_ms)
    }

    pub fn size_timeout(&self) -> Duration {
        Duration::from_millis(self.size_timeout_ms)
    }

    pub fn utilization_timeout(&self) -> Duration {
        Duration::from_millis(self.utilization_timeout_ms)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn sample_backoff(&self) -> Duration {
        Duration::from_millis(self.sample_backoff_ms)
    }

    pub fn cancel_grace(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_ms)
    }

    pub fn kill_wait(&self) -> Duration {
        Duration::from_millis(self.kill_wait_ms)
    }

    pub fn stream_drain(&self) -> Duration {
        Duration::from_millis(self.stream_drain_ms)
    }
}
