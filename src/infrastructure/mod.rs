//! Infrastructure layer module
//!
//! Adapters and bootstrapping concerns:
//! - Database implementations (`MySQL` with sqlx)
//! - Configuration management
//! - Logging infrastructure
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod config;
pub mod database;
pub mod logging;
