//! Executor for progressive rollout schedules.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::domain::errors::{DomainResult, EngineError};
use crate::domain::ports::{AutoOpsClient, ExecuteProgressiveRolloutRequest};

/// Applies rollout steps on behalf of the rollout watcher.
///
/// A step the service reports as already triggered counts as success.
#[async_trait]
pub trait ProgressiveRolloutExecutor: Send + Sync {
    /// Apply one schedule step of a rollout.
    async fn execute_progressive_rollout(
        &self,
        environment_id: &str,
        rollout_id: &str,
        schedule_id: &str,
    ) -> DomainResult<()>;
}

/// [`ProgressiveRolloutExecutor`] backed by the auto-ops service.
pub struct ProgressiveRolloutExecutorImpl {
    client: Arc<dyn AutoOpsClient>,
}

impl ProgressiveRolloutExecutorImpl {
    /// Executor issuing execute calls through `client`.
    pub fn new(client: Arc<dyn AutoOpsClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProgressiveRolloutExecutor for ProgressiveRolloutExecutorImpl {
    async fn execute_progressive_rollout(
        &self,
        environment_id: &str,
        rollout_id: &str,
        schedule_id: &str,
    ) -> DomainResult<()> {
        let request = ExecuteProgressiveRolloutRequest {
            environment_id: environment_id.to_string(),
            rollout_id: rollout_id.to_string(),
            schedule_id: schedule_id.to_string(),
        };

        let response = self
            .client
            .execute_progressive_rollout(request)
            .await
            .map_err(|err| {
                error!(
                    environment_id,
                    rollout_id,
                    schedule_id,
                    error = %err,
                    "Failed to execute progressive rollout"
                );
                EngineError::ExecutionFailed {
                    target: "progressive rollout",
                    id: rollout_id.to_string(),
                    message: err.to_string(),
                }
            })?;

        if response.already_triggered {
            debug!(
                environment_id,
                rollout_id, schedule_id, "Progressive rollout schedule already triggered"
            );
            return Ok(());
        }

        info!(environment_id, rollout_id, schedule_id, "Progressive rollout schedule executed");
        Ok(())
    }
}
