//! Domain errors for the auto-ops engine.

use thiserror::Error;

/// Which polymorphic payload failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// A clause attached to an auto-ops rule.
    Clause,
    /// The schedule clause of a progressive rollout.
    RolloutSchedule,
}

impl PayloadKind {
    /// Human-readable name used in error messages.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clause => "clause",
            Self::RolloutSchedule => "rollout schedule",
        }
    }
}

impl std::fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while sweeping rules and rollouts.
///
/// Every variant is recoverable at the sweep level: a watcher records it and
/// moves on to the next item.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A clause or schedule payload could not be unpacked.
    #[error("Failed to decode {kind} {id}: {reason}")]
    DecodeFailed {
        kind: PayloadKind,
        id: String,
        reason: String,
    },

    /// An upstream listing, lookup or counting call failed.
    #[error("Upstream {service} call {operation} failed: {message}")]
    Upstream {
        service: &'static str,
        operation: &'static str,
        message: String,
    },

    /// A remote execute call failed.
    #[error("Execution failed for {target} {id}: {message}")]
    ExecutionFailed {
        target: &'static str,
        id: String,
        message: String,
    },

    /// The downstream feature flag cache could not be refreshed.
    #[error("Feature flag cache refresh failed for environment {environment_id}: {message}")]
    CacheRefreshFailed {
        environment_id: String,
        message: String,
    },

    /// Persisting counts failed.
    #[error("Database error: {0}")]
    Database(String),

    /// The sweep ran past its deadline.
    #[error("Sweep deadline exceeded")]
    DeadlineExceeded,
}

impl EngineError {
    /// Shorthand for an upstream failure.
    pub fn upstream(
        service: &'static str,
        operation: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::Upstream {
            service,
            operation,
            message: message.into(),
        }
    }

    /// Shorthand for a decode failure.
    pub fn decode(kind: PayloadKind, id: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::DecodeFailed {
            kind,
            id: id.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this is a data-integrity failure rather than a transient one.
    pub const fn is_decode_failure(&self) -> bool {
        matches!(self, Self::DecodeFailed { .. })
    }
}

/// Result type used across the domain and services.
pub type DomainResult<T> = Result<T, EngineError>;

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}
