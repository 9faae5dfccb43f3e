//! Port for the auto-ops service.
//!
//! Besides listing rules and rollouts, the service owns the execute calls that
//! atomically check-and-set the trigger marker and apply the flag mutation.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{AutoOpsRule, ProgressiveRollout};

/// Paged rule listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListAutoOpsRulesRequest {
    /// Environment to list
    pub environment_id: String,
    /// Maximum rules per page
    pub page_size: usize,
    /// Opaque cursor; empty for the first page
    pub cursor: String,
}

/// One page of rules.
#[derive(Debug, Clone, Default)]
pub struct ListAutoOpsRulesResponse {
    /// Rules on this page
    pub auto_ops_rules: Vec<AutoOpsRule>,
    /// Cursor of the next page; empty when done
    pub cursor: String,
}

/// Paged rollout listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListProgressiveRolloutsRequest {
    /// Environment to list
    pub environment_id: String,
    /// Maximum rollouts per page
    pub page_size: usize,
    /// Opaque cursor; empty for the first page
    pub cursor: String,
}

/// One page of rollouts.
#[derive(Debug, Clone, Default)]
pub struct ListProgressiveRolloutsResponse {
    /// Rollouts on this page
    pub progressive_rollouts: Vec<ProgressiveRollout>,
    /// Cursor of the next page; empty when done
    pub cursor: String,
}

/// Trigger request for one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteAutoOpsRequest {
    /// Environment owning the rule
    pub environment_id: String,
    /// Rule to trigger
    pub rule_id: String,
    /// Clause whose condition was met.
    pub clause_id: String,
}

/// Outcome of an auto-ops execute call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecuteAutoOpsResponse {
    /// The rule was already triggered; the call was a no-op.
    pub already_triggered: bool,
}

/// Trigger request for one rollout step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteProgressiveRolloutRequest {
    /// Environment owning the rollout
    pub environment_id: String,
    /// Rollout to advance
    pub rollout_id: String,
    /// Step to apply
    pub schedule_id: String,
}

/// Outcome of a rollout execute call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecuteProgressiveRolloutResponse {
    /// The schedule was already triggered; the call was a no-op.
    /// Defaults to `false` when the remote does not report it.
    pub already_triggered: bool,
}

/// Client of the auto-ops service.
///
/// The execute calls are idempotent on the remote side: a second call for
/// the same rule or step reports `already_triggered` instead of applying the
/// change again.
#[async_trait]
pub trait AutoOpsClient: Send + Sync {
    /// List one page of rules of an environment.
    async fn list_auto_ops_rules(
        &self,
        request: ListAutoOpsRulesRequest,
    ) -> DomainResult<ListAutoOpsRulesResponse>;

    /// List one page of rollouts of an environment.
    async fn list_progressive_rollouts(
        &self,
        request: ListProgressiveRolloutsRequest,
    ) -> DomainResult<ListProgressiveRolloutsResponse>;

    /// Mark the rule triggered and apply its operation.
    async fn execute_auto_ops(
        &self,
        request: ExecuteAutoOpsRequest,
    ) -> DomainResult<ExecuteAutoOpsResponse>;

    /// Mark the schedule triggered and apply its weight change.
    async fn execute_progressive_rollout(
        &self,
        request: ExecuteProgressiveRolloutRequest,
    ) -> DomainResult<ExecuteProgressiveRolloutResponse>;
}
