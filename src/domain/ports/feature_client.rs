//! Port for the feature service.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// Lookup of one feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetFeatureRequest {
    /// Feature to read
    pub feature_id: String,
    /// Environment owning the feature
    pub environment_id: String,
}

/// The subset of a feature the engine reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    /// Feature id
    pub id: String,
    /// Current version; counts are keyed by it
    pub version: i32,
}

/// Feature lookup result.
#[derive(Debug, Clone)]
pub struct GetFeatureResponse {
    /// The feature
    pub feature: Feature,
}

/// Client of the feature service.
#[async_trait]
pub trait FeatureClient: Send + Sync {
    /// Fetch one feature of an environment.
    async fn get_feature(&self, request: GetFeatureRequest) -> DomainResult<GetFeatureResponse>;
}
