//! Port for the environment service.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::Environment;

/// Paged environment listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListEnvironmentsRequest {
    /// Maximum environments per page
    pub page_size: usize,
    /// Opaque cursor; empty for the first page
    pub cursor: String,
    /// `Some(false)` restricts the listing to live environments.
    pub archived: Option<bool>,
}

/// One page of environments.
#[derive(Debug, Clone, Default)]
pub struct ListEnvironmentsResponse {
    /// Environments on this page
    pub environments: Vec<Environment>,
    /// Cursor of the next page; empty when done
    pub cursor: String,
}

/// Client of the environment service.
#[async_trait]
pub trait EnvironmentClient: Send + Sync {
    /// List one page of environments.
    async fn list_environments(
        &self,
        request: ListEnvironmentsRequest,
    ) -> DomainResult<ListEnvironmentsResponse>;
}
