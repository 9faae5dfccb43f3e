use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Database url cannot be empty")]
    EmptyDatabaseUrl,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid {0}: must be greater than zero")]
    ZeroInterval(&'static str),

    #[error("Invalid list_page_size: must be greater than zero")]
    ZeroPageSize,
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .autoops/config.yaml
    /// 3. .autoops/local.yaml (optional local overrides)
    /// 4. Environment variables (`AUTOOPS_*` prefix, `__` separates nested keys)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".autoops/config.yaml"))
            .merge(Yaml::file(".autoops/local.yaml"))
            .merge(Env::prefixed("AUTOOPS_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.url.trim().is_empty() {
            return Err(ConfigError::EmptyDatabaseUrl);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let cache = &config.target_cache;
        if cache.list_page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }

        let watchers = &config.watchers;
        let intervals = [
            ("target_cache.refresh_interval_secs", cache.refresh_interval_secs),
            ("target_cache.refresh_timeout_secs", cache.refresh_timeout_secs),
            ("watchers.sweep_timeout_secs", watchers.sweep_timeout_secs),
            ("watchers.datetime_interval_secs", watchers.datetime_interval_secs),
            ("watchers.event_rate_interval_secs", watchers.event_rate_interval_secs),
            (
                "watchers.progressive_rollout_interval_secs",
                watchers.progressive_rollout_interval_secs,
            ),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, secs)| *secs == 0) {
            return Err(ConfigError::ZeroInterval(*name));
        }

        Ok(())
    }
}
