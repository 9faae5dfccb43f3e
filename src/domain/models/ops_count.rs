//! Denormalized evaluation/goal count snapshot for an event-rate clause.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Upsert record keyed by `(auto_ops_rule_id, clause_id)`.
///
/// Written for observability each time a rate clause is evaluated with
/// non-zero counts; triggering never reads it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OpsCount {
    /// Same as `clause_id`
    pub id: String,
    /// Feature the rule belongs to
    pub feature_id: String,
    /// Rule owning the clause
    pub auto_ops_rule_id: String,
    /// Event-rate clause id
    pub clause_id: String,
    /// Goal events counted for the clause goal
    pub ops_event_count: i64,
    /// Evaluations of the clause variation
    pub evaluation_count: i64,
    /// Unix seconds
    pub updated_at: i64,
}

impl OpsCount {
    /// Build a snapshot stamped with the current time. The id is the clause id.
    pub fn new(
        feature_id: &str,
        auto_ops_rule_id: &str,
        clause_id: &str,
        ops_event_count: i64,
        evaluation_count: i64,
    ) -> Self {
        Self {
            id: clause_id.to_string(),
            feature_id: feature_id.to_string(),
            auto_ops_rule_id: auto_ops_rule_id.to_string(),
            clause_id: clause_id.to_string(),
            ops_event_count,
            evaluation_count,
            updated_at: Utc::now().timestamp(),
        }
    }
}
