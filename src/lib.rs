//! Auto-ops rule evaluation and progressive rollout scheduling engine
//!
//! A periodic control loop that watches feature flag automation rules across
//! every environment, decides which ones became eligible to fire, and triggers
//! each side effect exactly once through idempotent executors.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): rule, clause and rollout models, errors and port traits
//! - **Service Layer** (`services`): target cache, watchers, executors and scheduler
//! - **Application Layer** (`application`): engine assembly from configuration
//! - **Infrastructure Layer** (`infrastructure`): configuration, logging and `MySQL` adapters
//!
//! # Example
//!
//! ```ignore
//! use autoops_engine::{AutoOpsEngine, ConfigLoader, EngineDependencies, LoggerImpl};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let _logger = LoggerImpl::init(&config.logging)?;
//!     let deps = EngineDependencies::new(environments, auto_ops, features, counter, ops_counts);
//!     let handle = AutoOpsEngine::new(&config, deps).start();
//!     tokio::signal::ctrl_c().await?;
//!     handle.stop().await;
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{AutoOpsEngine, EngineDependencies, EngineHandle};
pub use domain::errors::{DomainResult, EngineError};
pub use domain::models::{
    AutoOpsRule, AutoOpsStatus, Clause, Config, DatetimeClause, Environment, OpsCount,
    OpsEventRateClause, OpsType, ProgressiveRollout, RolloutSchedule,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::database::{DatabaseConnection, MySqlOpsCountRepository};
pub use infrastructure::logging::LoggerImpl;
pub use services::{
    DatetimeWatcher, EventRateWatcher, ProgressiveRolloutWatcher, TargetCache, Watcher,
    WatcherScheduler,
};
