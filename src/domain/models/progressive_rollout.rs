//! Progressive rollout domain model.
//!
//! A rollout moves traffic towards a variation in steps. Each step is a
//! [`RolloutSchedule`] that becomes due at `execute_at` and is stamped with
//! `triggered_at` by the remote executor once it has been applied.

use serde::{Deserialize, Serialize};

use super::clause::PayloadEnvelope;
use crate::domain::errors::{DomainResult, EngineError, PayloadKind};

/// Type URL of a [`ManualScheduleClause`] payload.
pub const MANUAL_SCHEDULE_CLAUSE_TYPE_URL: &str =
    "type.googleapis.com/autoops.ProgressiveRolloutManualScheduleClause";
/// Type URL of a [`TemplateScheduleClause`] payload.
pub const TEMPLATE_SCHEDULE_CLAUSE_TYPE_URL: &str =
    "type.googleapis.com/autoops.ProgressiveRolloutTemplateScheduleClause";

/// Which schedule payload a rollout carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RolloutType {
    /// Steps listed by hand
    #[default]
    ManualSchedule,
    /// Steps generated from an interval and increment
    TemplateSchedule,
}

impl RolloutType {
    /// Type URL the payload must carry for this rollout type.
    pub const fn type_url(self) -> &'static str {
        match self {
            Self::ManualSchedule => MANUAL_SCHEDULE_CLAUSE_TYPE_URL,
            Self::TemplateSchedule => TEMPLATE_SCHEDULE_CLAUSE_TYPE_URL,
        }
    }
}

/// Lifecycle of a rollout.
///
/// Only the remote executor moves a rollout between states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RolloutStatus {
    /// No step applied yet
    #[default]
    Waiting,
    /// At least one step applied
    Running,
    /// Every step applied
    Finished,
    /// Halted by an operator or an auto-ops rule
    Stopped,
}

/// Step spacing of a template rollout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RolloutInterval {
    /// Not set
    #[default]
    Unknown,
    /// One step per hour
    Hourly,
    /// One step per day
    Daily,
    /// One step per week
    Weekly,
}

/// One step of a rollout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RolloutSchedule {
    /// Step id, unique within the rollout
    pub schedule_id: String,
    /// Unix seconds at which the step becomes due
    pub execute_at: i64,
    /// Traffic weight applied by the step
    #[serde(default)]
    pub weight: i32,
    /// 0 while pending; immutable once set.
    #[serde(default)]
    pub triggered_at: i64,
}

impl RolloutSchedule {
    /// True until the executor stamps `triggered_at`.
    pub const fn is_pending(&self) -> bool {
        self.triggered_at == 0
    }

    /// Pending and scheduled at or before `now`.
    pub const fn is_due(&self, now: i64) -> bool {
        self.is_pending() && self.execute_at <= now
    }
}

/// Payload of a manual rollout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ManualScheduleClause {
    /// Steps in execution order
    pub schedules: Vec<RolloutSchedule>,
    /// Variation receiving the traffic
    #[serde(default)]
    pub variation_id: String,
}

/// Payload of a template rollout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TemplateScheduleClause {
    /// Steps generated from the template
    pub schedules: Vec<RolloutSchedule>,
    /// Spacing between steps
    #[serde(default)]
    pub interval: RolloutInterval,
    /// Weight added per step
    #[serde(default)]
    pub increments: i64,
    /// Variation receiving the traffic
    #[serde(default)]
    pub variation_id: String,
}

/// Decoded rollout payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RolloutScheduleClause {
    /// Manual steps
    Manual(ManualScheduleClause),
    /// Template steps
    Template(TemplateScheduleClause),
}

impl RolloutScheduleClause {
    /// Steps in execution order.
    pub fn schedules(&self) -> &[RolloutSchedule] {
        match self {
            Self::Manual(c) => &c.schedules,
            Self::Template(c) => &c.schedules,
        }
    }

    /// Consume the payload and keep only its steps.
    pub fn into_schedules(self) -> Vec<RolloutSchedule> {
        match self {
            Self::Manual(c) => c.schedules,
            Self::Template(c) => c.schedules,
        }
    }
}

/// A progressive rollout of one feature.
///
/// The schedule payload is stored packed; use
/// [`ProgressiveRollout::schedules`] to read the steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProgressiveRollout {
    /// Rollout id
    pub id: String,
    /// Feature being rolled out
    pub feature_id: String,
    /// Selects the payload shape
    #[serde(rename = "type", default)]
    pub rollout_type: RolloutType,
    /// Current lifecycle state
    #[serde(default)]
    pub status: RolloutStatus,
    /// Packed schedule payload
    pub clause: PayloadEnvelope,
    /// Unix seconds
    #[serde(default)]
    pub created_at: i64,
    /// Unix seconds
    #[serde(default)]
    pub updated_at: i64,
}

impl ProgressiveRollout {
    /// Waiting manual rollout with a packed payload.
    pub fn manual(
        id: impl Into<String>,
        feature_id: impl Into<String>,
        clause: &ManualScheduleClause,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            id: id.into(),
            feature_id: feature_id.into(),
            rollout_type: RolloutType::ManualSchedule,
            status: RolloutStatus::Waiting,
            clause: PayloadEnvelope::pack(MANUAL_SCHEDULE_CLAUSE_TYPE_URL, clause)?,
            created_at: 0,
            updated_at: 0,
        })
    }

    /// Waiting template rollout with a packed payload.
    pub fn template(
        id: impl Into<String>,
        feature_id: impl Into<String>,
        clause: &TemplateScheduleClause,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            id: id.into(),
            feature_id: feature_id.into(),
            rollout_type: RolloutType::TemplateSchedule,
            status: RolloutStatus::Waiting,
            clause: PayloadEnvelope::pack(TEMPLATE_SCHEDULE_CLAUSE_TYPE_URL, clause)?,
            created_at: 0,
            updated_at: 0,
        })
    }

    /// Finished or stopped rollouts are never swept.
    pub const fn is_finished(&self) -> bool {
        matches!(self.status, RolloutStatus::Finished | RolloutStatus::Stopped)
    }

    /// Decode the payload according to the rollout type.
    pub fn schedule_clause(&self) -> DomainResult<RolloutScheduleClause> {
        let expected = self.rollout_type.type_url();
        if !self.clause.is(expected) {
            return Err(EngineError::decode(
                PayloadKind::RolloutSchedule,
                &self.id,
                format!(
                    "payload type {} does not match rollout type {expected}",
                    self.clause.type_url
                ),
            ));
        }
        match self.rollout_type {
            RolloutType::ManualSchedule => self
                .clause
                .unpack(PayloadKind::RolloutSchedule, &self.id)
                .map(RolloutScheduleClause::Manual),
            RolloutType::TemplateSchedule => self
                .clause
                .unpack(PayloadKind::RolloutSchedule, &self.id)
                .map(RolloutScheduleClause::Template),
        }
    }

    /// Decode the ordered schedule list.
    pub fn schedules(&self) -> DomainResult<Vec<RolloutSchedule>> {
        self.schedule_clause().map(RolloutScheduleClause::into_schedules)
    }

    /// First schedule in list order that is pending and due.
    ///
    /// List order is authoritative; schedules are not sorted by `execute_at`.
    pub fn next_due_schedule(schedules: &[RolloutSchedule], now: i64) -> Option<&RolloutSchedule> {
        schedules.iter().find(|s| s.is_due(now))
    }
}
