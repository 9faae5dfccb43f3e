//! Auto-ops clause model.
//!
//! A clause carries its condition as an opaque envelope: a type URL naming the
//! concrete condition plus its JSON body. Conditions are decoded on demand, so a
//! rule with a corrupt clause can still be listed and cached.

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainResult, EngineError, PayloadKind};

/// Type URL of [`DatetimeClause`] payloads.
pub const DATETIME_CLAUSE_TYPE_URL: &str = "type.googleapis.com/autoops.DatetimeClause";
/// Type URL of [`OpsEventRateClause`] payloads.
pub const OPS_EVENT_RATE_CLAUSE_TYPE_URL: &str = "type.googleapis.com/autoops.OpsEventRateClause";

/// Polymorphic payload envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PayloadEnvelope {
    /// Names the concrete payload type.
    pub type_url: String,
    /// Payload body; `null` when absent.
    #[serde(default)]
    pub value: serde_json::Value,
}

impl PayloadEnvelope {
    /// Wrap a serializable condition under the given type URL.
    pub fn pack<T: Serialize>(type_url: &str, payload: &T) -> serde_json::Result<Self> {
        Ok(Self {
            type_url: type_url.to_string(),
            value: serde_json::to_value(payload)?,
        })
    }

    /// Whether the envelope carries `type_url`.
    pub fn is(&self, type_url: &str) -> bool {
        self.type_url == type_url
    }

    /// Decode the body as `T`, tagging failures with the owning payload id.
    pub fn unpack<'a, T: Deserialize<'a>>(
        &'a self,
        kind: PayloadKind,
        id: &str,
    ) -> DomainResult<T> {
        T::deserialize(&self.value).map_err(|e| EngineError::decode(kind, id, e))
    }
}

/// What the remote executor does to the feature when the clause fires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    /// Not set by the rule owner.
    #[default]
    Unknown,
    /// Turn the feature on.
    Enable,
    /// Turn the feature off.
    Disable,
}

/// Fires once the wall clock reaches `time` (unix seconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatetimeClause {
    /// Unix seconds.
    pub time: i64,
}

impl DatetimeClause {
    /// Whether `time` has been reached at `now`.
    pub const fn is_due(&self, now: i64) -> bool {
        self.time <= now
    }
}

/// Comparison applied between the observed rate and the threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RateOperator {
    /// Fire when `rate >= threshold_rate`.
    #[default]
    GreaterOrEqual,
    /// Fire when `rate <= threshold_rate`.
    LessOrEqual,
}

/// Fires when the goal-event rate among evaluated users crosses a threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OpsEventRateClause {
    /// Variation whose evaluated users are counted.
    pub variation_id: String,
    /// Goal whose events are counted.
    pub goal_id: String,
    /// Minimum goal user count before the rate is considered.
    #[serde(default)]
    pub min_count: i64,
    /// Rate the observed goal rate is compared against, in `[0, 1]`.
    pub threshold_rate: f64,
    /// Comparison direction.
    #[serde(default)]
    pub operator: RateOperator,
}

/// Result of assessing an event-rate clause against observed counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateAssessment {
    /// Fewer goal events than `min_count`; the rate was not computed.
    BelowMinCount,
    /// The rate was computed and compared.
    Evaluated {
        /// Goal users over evaluated users, at most 1.0.
        rate: f64,
        /// Whether the rate met the threshold.
        satisfied: bool,
        /// The goal count exceeded the evaluation count and was clamped.
        clamped: bool,
    },
}

impl RateAssessment {
    /// Whether the clause should fire.
    pub const fn is_satisfied(&self) -> bool {
        matches!(self, Self::Evaluated { satisfied: true, .. })
    }
}

impl OpsEventRateClause {
    /// Assess the clause. `evaluation_count` must be non-zero.
    ///
    /// The min-count gate runs on the raw goal count, before clamping.
    pub fn assess(&self, evaluation_count: i64, ops_event_count: i64) -> RateAssessment {
        if ops_event_count < self.min_count {
            return RateAssessment::BelowMinCount;
        }
        let clamped = ops_event_count > evaluation_count;
        let ops = ops_event_count.min(evaluation_count);
        #[allow(clippy::cast_precision_loss)]
        let rate = ops as f64 / evaluation_count as f64;
        let satisfied = match self.operator {
            RateOperator::GreaterOrEqual => rate >= self.threshold_rate,
            RateOperator::LessOrEqual => rate <= self.threshold_rate,
        };
        RateAssessment::Evaluated {
            rate,
            satisfied,
            clamped,
        }
    }
}

/// Decoded clause condition.
///
/// Rules decode their clauses through [`Clause::condition`] and keep the
/// variant matching the watcher's family.
#[derive(Debug, Clone, PartialEq)]
pub enum ClauseCondition {
    /// A time-triggered condition.
    Datetime(DatetimeClause),
    /// An event-rate condition.
    OpsEventRate(OpsEventRateClause),
}

/// A single condition attached to an auto-ops rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Clause {
    /// Clause id, unique within its rule.
    pub id: String,
    /// Unix seconds of the last execution, 0 if never executed.
    #[serde(default)]
    pub executed_at: i64,
    /// Effect on the feature when the clause fires.
    #[serde(default)]
    pub action_type: ActionType,
    /// Encoded condition.
    pub clause: PayloadEnvelope,
}

impl Clause {
    /// Clause that enables the feature at a point in time.
    pub fn datetime(id: impl Into<String>, condition: DatetimeClause) -> serde_json::Result<Self> {
        Ok(Self {
            id: id.into(),
            executed_at: 0,
            action_type: ActionType::Enable,
            clause: PayloadEnvelope::pack(DATETIME_CLAUSE_TYPE_URL, &condition)?,
        })
    }

    /// Clause that disables the feature when the event rate crosses its threshold.
    pub fn ops_event_rate(
        id: impl Into<String>,
        condition: &OpsEventRateClause,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            id: id.into(),
            executed_at: 0,
            action_type: ActionType::Disable,
            clause: PayloadEnvelope::pack(OPS_EVENT_RATE_CLAUSE_TYPE_URL, condition)?,
        })
    }

    /// Decode the envelope into its concrete condition.
    pub fn condition(&self) -> DomainResult<ClauseCondition> {
        match self.clause.type_url.as_str() {
            DATETIME_CLAUSE_TYPE_URL => self
                .clause
                .unpack(PayloadKind::Clause, &self.id)
                .map(ClauseCondition::Datetime),
            OPS_EVENT_RATE_CLAUSE_TYPE_URL => self
                .clause
                .unpack(PayloadKind::Clause, &self.id)
                .map(ClauseCondition::OpsEventRate),
            other => Err(EngineError::decode(
                PayloadKind::Clause,
                &self.id,
                format!("unknown clause type {other}"),
            )),
        }
    }
}
