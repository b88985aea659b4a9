use super::duration::human_duration;
use crate::logging::DEFAULT_BUFFER_SIZE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Name of the directory under the user config dir.
pub const APP_DIR_NAME: &str = "mcp-fleet";

/// Top-level `fleet.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    pub server_defaults: ServerDefaults,
    pub monitor: MonitorConfig,
    pub logging: LoggingConfig,
    /// Where records are stored. Defaults to the user config directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records_path: Option<PathBuf>,
}

impl FleetConfig {
    pub fn records_path(&self) -> PathBuf {
        self.records_path.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR_NAME)
                .join("records.json")
        })
    }
}

/// Settings applied to every server container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerDefaults {
    /// First host port handed out.
    pub default_port: u16,
    pub max_memory_mb: u64,
    pub restart_on_failure: bool,
    pub auto_start: bool,
}

impl Default for ServerDefaults {
    fn default() -> Self {
        Self {
            default_port: 8000,
            max_memory_mb: 512,
            restart_on_failure: true,
            auto_start: false,
        }
    }
}

impl ServerDefaults {
    pub fn restart_policy(&self) -> &'static str {
        if self.restart_on_failure {
            "on-failure"
        } else {
            "no"
        }
    }
}

/// Runtime health polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    #[serde(with = "human_duration")]
    pub interval: Duration,
    #[serde(with = "human_duration")]
    pub initial_delay: Duration,
    /// Upper bound on a single probe.
    #[serde(with = "human_duration")]
    pub probe_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            initial_delay: Duration::from_secs(2),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub buffer_size: usize,
    pub debug: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            debug: false,
        }
    }
}
