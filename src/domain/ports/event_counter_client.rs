//! Port for the event counter service.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// Key shared by the evaluation and goal user count lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpsUserCountRequest {
    /// Environment owning the rule
    pub environment_id: String,
    /// Rule owning the clause
    pub rule_id: String,
    /// Event-rate clause
    pub clause_id: String,
    /// Feature the clause watches
    pub feature_id: String,
    /// Feature version counts are scoped to
    pub feature_version: i32,
    /// Variation the clause watches
    pub variation_id: String,
}

/// Distinct user count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpsUserCountResponse {
    /// Zero when nothing was recorded
    pub count: i64,
}

/// Client of the event counter service.
#[async_trait]
pub trait EventCounterClient: Send + Sync {
    /// Distinct users evaluated into the clause's variation.
    async fn get_ops_evaluation_user_count(
        &self,
        request: OpsUserCountRequest,
    ) -> DomainResult<OpsUserCountResponse>;

    /// Distinct users who fired the clause's goal event.
    async fn get_ops_goal_user_count(
        &self,
        request: OpsUserCountRequest,
    ) -> DomainResult<OpsUserCountResponse>;
}
