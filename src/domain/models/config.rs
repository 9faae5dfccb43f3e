use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Main configuration structure for the auto-ops engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Target cache refresh configuration
    #[serde(default)]
    pub target_cache: TargetCacheConfig,

    /// Watcher sweep configuration
    #[serde(default)]
    pub watchers: WatchersConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// `MySQL` connection URL
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

fn default_database_url() -> String {
    "mysql://localhost:3306/autoops".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

const fn default_acquire_timeout_secs() -> u64 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

/// Log line encoding
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Human-readable multi-line output
    Pretty,
}

/// How often rolling log files are rotated
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    /// New file every day
    #[default]
    Daily,
    /// New file every hour
    Hourly,
    /// Single file, never rotated
    Never,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json or pretty
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// Rotation policy for file output
    #[serde(default)]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            rotation: RotationPolicy::default(),
        }
    }
}

/// Target cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TargetCacheConfig {
    /// Seconds between background refreshes
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Upper bound for one refresh cycle in seconds
    #[serde(default = "default_refresh_timeout_secs")]
    pub refresh_timeout_secs: u64,

    /// Page size for upstream listing calls
    #[serde(default = "default_list_page_size")]
    pub list_page_size: usize,
}

const fn default_refresh_interval_secs() -> u64 {
    120
}

const fn default_refresh_timeout_secs() -> u64 {
    60
}

const fn default_list_page_size() -> usize {
    500
}

impl Default for TargetCacheConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            refresh_timeout_secs: default_refresh_timeout_secs(),
            list_page_size: default_list_page_size(),
        }
    }
}

impl TargetCacheConfig {
    /// Interval between background refreshes
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Upper bound for one refresh cycle
    pub const fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }
}

/// Watcher sweep configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WatchersConfig {
    /// Deadline for a single sweep in seconds
    #[serde(default = "default_sweep_timeout_secs")]
    pub sweep_timeout_secs: u64,

    /// Seconds between datetime sweeps
    #[serde(default = "default_watch_interval_secs")]
    pub datetime_interval_secs: u64,

    /// Seconds between event-rate sweeps
    #[serde(default = "default_watch_interval_secs")]
    pub event_rate_interval_secs: u64,

    /// Seconds between progressive rollout sweeps
    #[serde(default = "default_watch_interval_secs")]
    pub progressive_rollout_interval_secs: u64,

    /// Run every watcher once as soon as the scheduler starts
    #[serde(default = "default_true")]
    pub run_on_startup: bool,
}

const fn default_sweep_timeout_secs() -> u64 {
    300
}

const fn default_watch_interval_secs() -> u64 {
    10
}

const fn default_true() -> bool {
    true
}

impl Default for WatchersConfig {
    fn default() -> Self {
        Self {
            sweep_timeout_secs: default_sweep_timeout_secs(),
            datetime_interval_secs: default_watch_interval_secs(),
            event_rate_interval_secs: default_watch_interval_secs(),
            progressive_rollout_interval_secs: default_watch_interval_secs(),
            run_on_startup: default_true(),
        }
    }
}

impl WatchersConfig {
    /// Deadline applied to every sweep
    pub const fn sweep_timeout(&self) -> Duration {
        Duration::from_secs(self.sweep_timeout_secs)
    }
}
