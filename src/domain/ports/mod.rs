//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces for every collaborator the engine talks to:
//! - EnvironmentClient: environment listing
//! - AutoOpsClient: rule/rollout listing and the idempotent execute calls
//! - FeatureClient: feature version lookup
//! - EventCounterClient: evaluation and goal user counts
//! - FeatureFlagCacheRefresher: downstream flag cache invalidation
//! - OpsCountRepository: ops count persistence
//! - Clock: wall clock
//!
//! Adapters for the remote services live with the hosting process; the
//! engine only depends on these contracts.

pub mod auto_ops_client;
pub mod clock;
pub mod environment_client;
pub mod event_counter_client;
pub mod feature_cache;
pub mod feature_client;
pub mod ops_count_repository;

pub use auto_ops_client::{
    AutoOpsClient, ExecuteAutoOpsRequest, ExecuteAutoOpsResponse,
    ExecuteProgressiveRolloutRequest, ExecuteProgressiveRolloutResponse, ListAutoOpsRulesRequest,
    ListAutoOpsRulesResponse, ListProgressiveRolloutsRequest, ListProgressiveRolloutsResponse,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use environment_client::{
    EnvironmentClient, ListEnvironmentsRequest, ListEnvironmentsResponse,
};
pub use event_counter_client::{EventCounterClient, OpsUserCountRequest, OpsUserCountResponse};
pub use feature_cache::FeatureFlagCacheRefresher;
pub use feature_client::{Feature, FeatureClient, GetFeatureRequest, GetFeatureResponse};
pub use ops_count_repository::OpsCountRepository;
