//! Port for invalidating the downstream feature flag cache.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// Invalidates cached flags after a rollout step changes them.
#[async_trait]
pub trait FeatureFlagCacheRefresher: Send + Sync {
    /// Rebuild the cached flags of one environment.
    async fn refresh_environment_cache(&self, environment_id: &str) -> DomainResult<()>;
}
