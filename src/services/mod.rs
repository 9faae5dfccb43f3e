//! Engine services: the target cache, executors, watchers and the scheduler
//! that drives them.

pub mod auto_ops_executor;
pub mod datetime_watcher;
pub mod event_rate_watcher;
pub mod progressive_rollout_executor;
pub mod progressive_rollout_watcher;
pub mod sweep;
pub mod target_cache;
pub mod watcher_scheduler;

pub use auto_ops_executor::{AutoOpsExecutor, AutoOpsExecutorImpl};
pub use datetime_watcher::DatetimeWatcher;
pub use event_rate_watcher::EventRateWatcher;
pub use progressive_rollout_executor::{
    ProgressiveRolloutExecutor, ProgressiveRolloutExecutorImpl,
};
pub use progressive_rollout_watcher::ProgressiveRolloutWatcher;
pub use sweep::{SweepContext, SweepErrors, SweepSummary, Watcher};
pub use target_cache::{
    AutoOpsRuleLister, EnvironmentLister, ProgressiveRolloutLister, TargetCache,
    TargetCacheHandle,
};
pub use watcher_scheduler::{SchedulerHandle, WatcherScheduler, WatcherStats};
