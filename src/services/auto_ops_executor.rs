//! Executor for auto-ops rules.
//!
//! The only path that mutates a rule's trigger state. The remote call is
//! idempotent: a rule that was already triggered comes back as a no-op.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::domain::errors::{DomainResult, EngineError};
use crate::domain::ports::{AutoOpsClient, ExecuteAutoOpsRequest};

/// Triggers auto-ops rules on behalf of the watchers.
#[async_trait]
pub trait AutoOpsExecutor: Send + Sync {
    /// Fire `rule_id` because `clause_id` became satisfied.
    async fn execute(&self, environment_id: &str, rule_id: &str, clause_id: &str)
        -> DomainResult<()>;
}

/// [`AutoOpsExecutor`] backed by the auto-ops service.
pub struct AutoOpsExecutorImpl {
    client: Arc<dyn AutoOpsClient>,
}

impl AutoOpsExecutorImpl {
    /// Executor issuing execute calls through `client`.
    pub fn new(client: Arc<dyn AutoOpsClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AutoOpsExecutor for AutoOpsExecutorImpl {
    async fn execute(
        &self,
        environment_id: &str,
        rule_id: &str,
        clause_id: &str,
    ) -> DomainResult<()> {
        let request = ExecuteAutoOpsRequest {
            environment_id: environment_id.to_string(),
            rule_id: rule_id.to_string(),
            clause_id: clause_id.to_string(),
        };

        let response = self.client.execute_auto_ops(request).await.map_err(|err| {
            error!(
                environment_id,
                rule_id,
                clause_id,
                error = %err,
                "Failed to execute auto ops rule"
            );
            EngineError::ExecutionFailed {
                target: "auto ops rule",
                id: rule_id.to_string(),
                message: err.to_string(),
            }
        })?;

        if response.already_triggered {
            debug!(environment_id, rule_id, clause_id, "Auto ops rule already triggered");
            return Ok(());
        }

        info!(environment_id, rule_id, clause_id, "Auto ops rule executed");
        Ok(())
    }
}
