//! Controller Configuration
//!
//! Loaded from a mounted YAML file. Every section has defaults so a missing
//! file or a partial file still yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main controller configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ControllerConfig {
    /// Requeue cadence and per-cycle timeout
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Watched object enumeration settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// File dispatcher settings
    #[serde(default, rename = "fileLog")]
    pub file_log: FileLogConfig,

    /// Event dispatcher settings
    #[serde(default)]
    pub events: EventsConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Requeue cadence
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleConfig {
    /// Delay before the next cycle after a successful cycle
    #[serde(default = "default_resync_interval", rename = "resyncIntervalSeconds")]
    pub resync_interval_seconds: u64,

    /// Delay before the next cycle after an enumeration failure
    #[serde(default = "default_retry_interval", rename = "retryIntervalSeconds")]
    pub retry_interval_seconds: u64,

    /// Upper bound on the duration of a single cycle
    #[serde(default = "default_cycle_timeout", rename = "cycleTimeoutSeconds")]
    pub cycle_timeout_seconds: u64,
}

impl ScheduleConfig {
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_seconds)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_seconds)
    }

    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.cycle_timeout_seconds)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            resync_interval_seconds: default_resync_interval(),
            retry_interval_seconds: default_retry_interval(),
            cycle_timeout_seconds: default_cycle_timeout(),
        }
    }
}

/// Watched object enumeration settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchConfig {
    /// API version used when a `StatusAlert` does not set `watchApiVersion`
    #[serde(default = "default_api_version", rename = "defaultApiVersion")]
    pub default_api_version: String,

    /// Page size for list calls
    #[serde(default = "default_page_size", rename = "pageSize")]
    pub page_size: u32,

    /// Maximum number of objects processed concurrently within one cycle
    #[serde(default = "default_object_concurrency", rename = "objectConcurrency")]
    pub object_concurrency: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            default_api_version: default_api_version(),
            page_size: default_page_size(),
            object_concurrency: default_object_concurrency(),
        }
    }
}

/// File dispatcher settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileLogConfig {
    /// Append target used when a `StatusAlert` enables file logging without a path
    #[serde(default = "default_log_file_path", rename = "defaultPath")]
    pub default_path: String,
}

impl Default for FileLogConfig {
    fn default() -> Self {
        Self {
            default_path: default_log_file_path(),
        }
    }
}

/// Event dispatcher settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventsConfig {
    /// Reporting controller name written on every event
    #[serde(default = "default_reporting_controller", rename = "reportingController")]
    pub reporting_controller: String,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            reporting_controller: default_reporting_controller(),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address", rename = "bindAddress")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

fn default_resync_interval() -> u64 {
    300
}

fn default_retry_interval() -> u64 {
    60
}

fn default_cycle_timeout() -> u64 {
    30
}

fn default_api_version() -> String {
    "example.com/v1".to_string()
}

fn default_page_size() -> u32 {
    500
}

fn default_object_concurrency() -> usize {
    4
}

fn default_log_file_path() -> String {
    "/var/log/status-alerts.log".to_string()
}

fn default_reporting_controller() -> String {
    "status-alerts-controller".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

impl ControllerConfig {
    /// Validate that the configuration can drive the control loop
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let schedule = &self.schedule;
        if schedule.retry_interval_seconds == 0 {
            return Err(anyhow::anyhow!(
                "schedule.retryIntervalSeconds must be greater than zero"
            ));
        }
        if schedule.resync_interval_seconds < schedule.retry_interval_seconds {
            return Err(anyhow::anyhow!(
                "schedule.resyncIntervalSeconds ({}) must not be shorter than schedule.retryIntervalSeconds ({})",
                schedule.resync_interval_seconds,
                schedule.retry_interval_seconds
            ));
        }
        if schedule.cycle_timeout_seconds == 0 {
            return Err(anyhow::anyhow!(
                "schedule.cycleTimeoutSeconds must be greater than zero"
            ));
        }
        if self.watch.page_size == 0 {
            return Err(anyhow::anyhow!("watch.pageSize must be greater than zero"));
        }
        if self.watch.object_concurrency == 0 {
            return Err(anyhow::anyhow!(
                "watch.objectConcurrency must be greater than zero"
            ));
        }
        if self.watch.default_api_version.trim().is_empty() {
            return Err(anyhow::anyhow!("watch.defaultApiVersion must not be empty"));
        }
        if self.events.reporting_controller.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "events.reportingController must not be empty"
            ));
        }
        Ok(())
    }

    /// Load configuration from a mounted YAML file
    pub fn from_mounted_file(config_path: &str) -> Result<Self, anyhow::Error> {
        let config_str = std::fs::read_to_string(config_path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {config_path}: {e}"))?;

        Self::from_yaml(&config_str)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(config_str: &str) -> Result<Self, anyhow::Error> {
        serde_yaml::from_str(config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse config YAML: {e}"))
    }
}
