//! Repository port for ops count persistence.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::OpsCount;

/// Persistence of [`OpsCount`] snapshots.
#[async_trait]
pub trait OpsCountRepository: Send + Sync {
    /// Insert or overwrite the row for `(auto_ops_rule_id, clause_id)`.
    async fn upsert_ops_count(&self, environment_id: &str, ops_count: &OpsCount)
        -> DomainResult<()>;
}
