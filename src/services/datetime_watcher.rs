//! Datetime watcher: fires schedule rules whose clause time has passed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::domain::errors::{DomainResult, EngineError};
use crate::domain::models::{AutoOpsRule, DatetimeClause};
use crate::domain::ports::Clock;
use crate::services::auto_ops_executor::AutoOpsExecutor;
use crate::services::sweep::{SweepContext, SweepErrors, SweepSummary, Watcher};
use crate::services::target_cache::{AutoOpsRuleLister, EnvironmentLister};

/// Watcher for schedule rules.
///
/// Each sweep walks the cached environments and their open rules. A rule
/// with at least one datetime clause at or before the clock's `now` is
/// triggered through its latest due clause. Rules are independent: a failed
/// execute is recorded and the sweep moves on.
pub struct DatetimeWatcher {
    environment_lister: Arc<dyn EnvironmentLister>,
    rule_lister: Arc<dyn AutoOpsRuleLister>,
    executor: Arc<dyn AutoOpsExecutor>,
    clock: Arc<dyn Clock>,
    sweep_timeout: Duration,
}

impl DatetimeWatcher {
    /// Watcher reading targets from the given listers.
    ///
    /// `sweep_timeout` bounds every sweep, including in-flight execute calls.
    pub fn new(
        environment_lister: Arc<dyn EnvironmentLister>,
        rule_lister: Arc<dyn AutoOpsRuleLister>,
        executor: Arc<dyn AutoOpsExecutor>,
        clock: Arc<dyn Clock>,
        sweep_timeout: Duration,
    ) -> Self {
        Self {
            environment_lister,
            rule_lister,
            executor,
            clock,
            sweep_timeout,
        }
    }

    /// Among the clauses due at `now`, the one with the latest time.
    ///
    /// Ties resolve to the clause listed first.
    pub fn select_due_clause<'a>(clauses: &[(&'a str, DatetimeClause)], now: i64) -> Option<&'a str> {
        let mut best: Option<(&'a str, i64)> = None;
        for (id, clause) in clauses.iter().filter(|(_, clause)| clause.is_due(now)) {
            match best {
                Some((_, time)) if time >= clause.time => {}
                _ => best = Some((*id, clause.time)),
            }
        }
        best.map(|(id, _)| id)
    }

    async fn assess_rule(
        &self,
        ctx: &SweepContext,
        environment_id: &str,
        rule: &AutoOpsRule,
        now: i64,
        errors: &mut SweepErrors,
    ) -> bool {
        let clauses = match rule.extract_datetime_clauses() {
            Ok(clauses) => clauses,
            Err(err) => {
                error!(
                    environment_id,
                    feature_id = %rule.feature_id,
                    rule_id = %rule.id,
                    error = %err,
                    "Failed to extract datetime clauses"
                );
                errors.record(err);
                return false;
            }
        };

        let Some(clause_id) = Self::select_due_clause(&clauses, now) else {
            return false;
        };

        debug!(
            environment_id,
            feature_id = %rule.feature_id,
            rule_id = %rule.id,
            clause_id,
            "Datetime clause is due"
        );

        match ctx
            .call(self.executor.execute(environment_id, &rule.id, clause_id))
            .await
        {
            Ok(()) => true,
            Err(err) => {
                errors.record(err);
                false
            }
        }
    }
}

#[async_trait]
impl Watcher for DatetimeWatcher {
    fn name(&self) -> &'static str {
        "datetime"
    }

    async fn run(&self) -> DomainResult<()> {
        let ctx = SweepContext::with_timeout(self.sweep_timeout);
        let started = std::time::Instant::now();
        let now = self.clock.now_unix();
        let mut errors = SweepErrors::default();
        let mut summary = SweepSummary::default();

        let environments = self.environment_lister.get_environments();
        'sweep: for env in environments.iter() {
            summary.environments += 1;
            let rules = self.rule_lister.get_auto_ops_rules(&env.id).await;
            for rule in rules.iter() {
                if ctx.is_expired() {
                    errors.record(EngineError::DeadlineExceeded);
                    break 'sweep;
                }
                if rule.already_triggered() {
                    continue;
                }
                summary.assessed += 1;
                if self.assess_rule(&ctx, &env.id, rule, now, &mut errors).await {
                    summary.triggered += 1;
                }
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
