//! Environment domain model.

use serde::{Deserialize, Serialize};

/// A tenant-scoped namespace that owns features and auto-ops rules.
///
/// Copies are read-only; the environment service is the system of record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Environment {
    /// Environment id, used as the namespace for every upstream call
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Owning project
    #[serde(default)]
    pub project_id: String,
    /// Archived environments are never listed for sweeps
    #[serde(default)]
    pub archived: bool,
}

impl Environment {
    /// Environment with only an id set.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            project_id: String::new(),
            archived: false,
        }
    }
}
