pub mod auto_ops_rule;
pub mod clause;
pub mod config;
pub mod environment;
pub mod ops_count;
pub mod progressive_rollout;

pub use auto_ops_rule::{AutoOpsRule, AutoOpsStatus, OpsType};
pub use clause::{
    ActionType, Clause, ClauseCondition, DatetimeClause, OpsEventRateClause, PayloadEnvelope,
    RateAssessment, RateOperator,
};
pub use config::{
    Config, DatabaseConfig, LogFormat, LoggingConfig, RotationPolicy, TargetCacheConfig,
    WatchersConfig,
};
pub use environment::Environment;
pub use ops_count::OpsCount;
pub use progressive_rollout::{
    ManualScheduleClause, ProgressiveRollout, RolloutInterval, RolloutSchedule,
    RolloutScheduleClause, RolloutStatus, RolloutType, TemplateScheduleClause,
};
