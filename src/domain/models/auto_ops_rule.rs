//! Auto-ops rule domain model.

use serde::{Deserialize, Serialize};

use super::clause::{
    Clause, ClauseCondition, DatetimeClause, OpsEventRateClause, DATETIME_CLAUSE_TYPE_URL,
    OPS_EVENT_RATE_CLAUSE_TYPE_URL,
};
use crate::domain::errors::DomainResult;

/// Condition family of a rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpsType {
    /// Unset; rules of this type are never evaluated.
    #[default]
    TypeUnknown,
    /// Time-triggered; holds datetime clauses.
    Schedule,
    /// Rate-triggered; holds ops event rate clauses.
    EventRate,
}

/// Lifecycle of a rule. `Finished` and `Stopped` are terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutoOpsStatus {
    /// Created, no clause has fired yet.
    #[default]
    Waiting,
    /// At least one clause has fired.
    Running,
    /// Every action has been applied.
    Finished,
    /// Stopped by a user.
    Stopped,
}

impl AutoOpsStatus {
    /// Whether the rule can no longer fire.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Stopped)
    }
}

/// A feature flag automation rule owned by the auto-ops service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AutoOpsRule {
    /// Rule id.
    pub id: String,
    /// Feature the rule acts on.
    pub feature_id: String,
    /// Clause family the rule holds.
    pub ops_type: OpsType,
    /// Lifecycle state.
    #[serde(default)]
    pub auto_ops_status: AutoOpsStatus,
    /// Conditions in evaluation order.
    #[serde(default)]
    pub clauses: Vec<Clause>,
    /// Unix seconds of the last trigger, 0 if never triggered.
    #[serde(default)]
    pub triggered_at: i64,
    /// Unix seconds.
    #[serde(default)]
    pub created_at: i64,
    /// Unix seconds.
    #[serde(default)]
    pub updated_at: i64,
    /// Soft-delete marker.
    #[serde(default)]
    pub deleted: bool,
}

impl AutoOpsRule {
    /// New waiting rule with no timestamps.
    pub fn new(
        id: impl Into<String>,
        feature_id: impl Into<String>,
        ops_type: OpsType,
        clauses: Vec<Clause>,
    ) -> Self {
        Self {
            id: id.into(),
            feature_id: feature_id.into(),
            ops_type,
            auto_ops_status: AutoOpsStatus::Waiting,
            clauses,
            triggered_at: 0,
            created_at: 0,
            updated_at: 0,
            deleted: false,
        }
    }

    /// Terminal rules are never evaluated again.
    pub const fn already_triggered(&self) -> bool {
        self.auto_ops_status.is_terminal()
    }

    /// Decode every datetime clause, in list order, skipping other families.
    pub fn extract_datetime_clauses(&self) -> DomainResult<Vec<(&str, DatetimeClause)>> {
        self.extract_clauses(DATETIME_CLAUSE_TYPE_URL, |condition| match condition {
            ClauseCondition::Datetime(clause) => Some(clause),
            ClauseCondition::OpsEventRate(_) => None,
        })
    }

    /// Decode every ops event rate clause keyed by clause id, in list order.
    pub fn extract_ops_event_rate_clauses(
        &self,
    ) -> DomainResult<Vec<(&str, OpsEventRateClause)>> {
        self.extract_clauses(OPS_EVENT_RATE_CLAUSE_TYPE_URL, |condition| match condition {
            ClauseCondition::OpsEventRate(clause) => Some(clause),
            ClauseCondition::Datetime(_) => None,
        })
    }

    /// Clauses of other families are skipped without being decoded; the first
    /// clause of `type_url` that fails to decode fails the whole extraction.
    fn extract_clauses<T>(
        &self,
        type_url: &str,
        pick: impl Fn(ClauseCondition) -> Option<T>,
    ) -> DomainResult<Vec<(&str, T)>> {
        let mut extracted = Vec::new();
        for clause in self.clauses.iter().filter(|c| c.clause.is(type_url)) {
            if let Some(condition) = pick(clause.condition()?) {
                extracted.push((clause.id.as_str(), condition));
            }
        }
        Ok(extracted)
    }
}
