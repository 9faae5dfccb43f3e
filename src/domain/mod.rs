//! Domain layer for the auto-ops engine
//!
//! This module contains the rule, clause and rollout models and the port
//! traits through which the engine reaches its upstream collaborators.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainResult, EngineError, PayloadKind};
