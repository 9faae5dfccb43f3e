//! Progressive rollout watcher.
//!
//! Each sweep applies at most one schedule per rollout: the first pending
//! schedule, in list order, whose `execute_at` has passed. Environments that
//! had a schedule applied get their feature flag cache refreshed once.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::domain::errors::{DomainResult, EngineError};
use crate::domain::models::ProgressiveRollout;
use crate::domain::ports::{Clock, FeatureFlagCacheRefresher};
use crate::services::progressive_rollout_executor::ProgressiveRolloutExecutor;
use crate::services::sweep::{SweepContext, SweepErrors, SweepSummary, Watcher};
use crate::services::target_cache::{EnvironmentLister, ProgressiveRolloutLister};

/// Watcher that advances progressive rollouts one step at a time.
pub struct ProgressiveRolloutWatcher {
    environment_lister: Arc<dyn EnvironmentLister>,
    rollout_lister: Arc<dyn ProgressiveRolloutLister>,
    executor: Arc<dyn ProgressiveRolloutExecutor>,
    clock: Arc<dyn Clock>,
    cache_refresher: Option<Arc<dyn FeatureFlagCacheRefresher>>,
    sweep_timeout: Duration,
}

impl ProgressiveRolloutWatcher {
    /// Watcher without a cache refresher.
    pub fn new(
        environment_lister: Arc<dyn EnvironmentLister>,
        rollout_lister: Arc<dyn ProgressiveRolloutLister>,
        executor: Arc<dyn ProgressiveRolloutExecutor>,
        clock: Arc<dyn Clock>,
        sweep_timeout: Duration,
    ) -> Self {
        Self {
            environment_lister,
            rollout_lister,
            executor,
            clock,
            cache_refresher: None,
            sweep_timeout,
        }
    }

    /// Refresh the downstream flag cache after applying schedules.
    #[must_use]
    pub fn with_cache_refresher(mut self, refresher: Arc<dyn FeatureFlagCacheRefresher>) -> Self {
        self.cache_refresher = Some(refresher);
        self
    }

    async fn assess_rollout(
        &self,
        ctx: &SweepContext,
        environment_id: &str,
        rollout: &ProgressiveRollout,
        now: i64,
        errors: &mut SweepErrors,
    ) -> bool {
        let schedules = match rollout.schedules() {
            Ok(schedules) => schedules,
            Err(err) => {
                error!(
                    environment_id,
                    feature_id = %rollout.feature_id,
                    rollout_id = %rollout.id,
                    error = %err,
                    "Failed to decode rollout schedules"
                );
                errors.record(err);
                return false;
            }
        };

        let Some(schedule) = ProgressiveRollout::next_due_schedule(&schedules, now) else {
            return false;
        };

        debug!(
            environment_id,
            rollout_id = %rollout.id,
            schedule_id = %schedule.schedule_id,
            execute_at = schedule.execute_at,
            "Rollout schedule is due"
        );

        match ctx
            .call(self.executor.execute_progressive_rollout(
                environment_id,
                &rollout.id,
                &schedule.schedule_id,
            ))
            .await
        {
            Ok(()) => true,
            Err(err) => {
                errors.record(err);
                false
            }
        }
    }

    /// Bounded by its own timeout so an expired sweep still refreshes the
    /// environments it already changed.
    async fn refresh_feature_cache(&self, environment_id: &str) {
        let Some(refresher) = &self.cache_refresher else {
            return;
        };
        let result = SweepContext::with_timeout(self.sweep_timeout)
            .call(refresher.refresh_environment_cache(environment_id))
            .await;
        if let Err(err) = result {
            error!(environment_id, error = %err, "Failed to refresh feature flag cache");
        }
    }
}

#[async_trait]
impl Watcher for ProgressiveRolloutWatcher {
    fn name(&self) -> &'static str {
        "progressive_rollout"
    }

    async fn run(&self) -> DomainResult<()> {
        let ctx = SweepContext::with_timeout(self.sweep_timeout);
        let started = std::time::Instant::now();
        let now = self.clock.now_unix();
        let mut errors = SweepErrors::default();
        let mut summary = SweepSummary::default();

        let environments = self.environment_lister.get_environments();
        for env in environments.iter() {
            summary.environments += 1;
            let rollouts = self.rollout_lister.get_progressive_rollouts(&env.id).await;
            let mut triggered = false;
            let mut expired = false;

            for rollout in rollouts.iter() {
                if ctx.is_expired() {
                    expired = true;
                    break;
                }
                if rollout.is_finished() {
                    continue;
                }
                summary.assessed += 1;
                if self.assess_rollout(&ctx, &env.id, rollout, now, &mut errors).await {
                    summary.triggered += 1;
                    triggered = true;
                }
            }

            if triggered {
                self.refresh_feature_cache(&env.id).await;
            }
            if expired {
                errors.record(EngineError::DeadlineExceeded);
                break;
            }
        }

        info!(
            watcher = self.name(),
            environments = summary.environments,
            assessed = summary.assessed,
            triggered = summary.triggered,
            failures = errors.failures(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Sweep finished"
        );
        errors.into_result()
    }
}
