//! Event-rate watcher.
//!
//! For every open rule with ops event rate clauses, fetches the feature
//! version once, then walks the clauses in order:
//! 1. Evaluation user count (zero: skip, nothing persisted)
//! 2. Goal user count (zero: skip, nothing persisted)
//! 3. Persist the counts as an [`OpsCount`] snapshot
//! 4. Compare the goal rate against the clause threshold
//!
//! The first satisfied clause fires the rule and ends that rule's evaluation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::domain::errors::{DomainResult, EngineError};
use crate::domain::models::{AutoOpsRule, OpsCount, OpsEventRateClause, RateAssessment};
use crate::domain::ports::{
    EventCounterClient, FeatureClient, GetFeatureRequest, OpsCountRepository, OpsUserCountRequest,
};
use crate::services::auto_ops_executor::AutoOpsExecutor;
use crate::services::sweep::{SweepContext, SweepErrors, SweepSummary, Watcher};
use crate::services::target_cache::{AutoOpsRuleLister, EnvironmentLister};

/// Watcher for event-rate rules.
///
/// See the module docs for the per-clause steps. The feature version is
/// fetched once per rule; a failed lookup skips the rule.
pub struct EventRateWatcher {
    environment_lister: Arc<dyn EnvironmentLister>,
    rule_lister: Arc<dyn AutoOpsRuleLister>,
    feature_client: Arc<dyn FeatureClient>,
    event_counter: Arc<dyn EventCounterClient>,
    ops_count_repository: Arc<dyn OpsCountRepository>,
    executor: Arc<dyn AutoOpsExecutor>,
    sweep_timeout: Duration,
}

/// What happened to one clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClauseOutcome {
    NoData,
    NotSatisfied,
    Satisfied,
}

/// What happened to one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleOutcome {
    Triggered,
    NotTriggered,
    /// The deadline passed before every clause was evaluated.
    Expired,
}

impl EventRateWatcher {
    /// Watcher wired to its collaborators.
    ///
    /// `sweep_timeout` bounds every sweep; an expired sweep reports
    /// [`EngineError::DeadlineExceeded`].
    pub fn new(
        environment_lister: Arc<dyn EnvironmentLister>,
        rule_lister: Arc<dyn AutoOpsRuleLister>,
        feature_client: Arc<dyn FeatureClient>,
        event_counter: Arc<dyn EventCounterClient>,
        ops_count_repository: Arc<dyn OpsCountRepository>,
        executor: Arc<dyn AutoOpsExecutor>,
        sweep_timeout: Duration,
    ) -> Self {
        Self {
            environment_lister,
            rule_lister,
            feature_client,
            event_counter,
            ops_count_repository,
            executor,
            sweep_timeout,
        }
    }

    async fn assess_rule(
        &self,
        ctx: &SweepContext,
        environment_id: &str,
        rule: &AutoOpsRule,
        errors: &mut SweepErrors,
    ) -> RuleOutcome {
        let clauses = match rule.extract_ops_event_rate_clauses() {
            Ok(clauses) => clauses,
            Err(err) => {
                error!(
                    environment_id,
                    feature_id = %rule.feature_id,
                    rule_id = %rule.id,
                    error = %err,
                    "Failed to extract ops event rate clauses"
                );
                errors.record(err);
                return RuleOutcome::NotTriggered;
            }
        };
        if clauses.is_empty() {
            return RuleOutcome::NotTriggered;
        }

        let feature_version = match ctx
            .call(self.feature_client.get_feature(GetFeatureRequest {
                feature_id: rule.feature_id.clone(),
                environment_id: environment_id.to_string(),
            }))
            .await
        {
            Ok(response) => response.feature.version,
            Err(err) => {
                error!(
                    environment_id,
                    feature_id = %rule.feature_id,
                    rule_id = %rule.id,
                    error = %err,
                    "Failed to get feature"
                );
                errors.record(err);
                return RuleOutcome::NotTriggered;
            }
        };

        for (clause_id, clause) in &clauses {
            if ctx.is_expired() {
                return RuleOutcome::Expired;
            }
            let outcome = self
                .assess_clause(ctx, environment_id, rule, feature_version, clause_id, clause)
                .await;
            match outcome {
                Ok(ClauseOutcome::Satisfied) => {
                    return match ctx
                        .call(self.executor.execute(environment_id, &rule.id, clause_id))
                        .await
                    {
                        Ok(()) => RuleOutcome::Triggered,
                        Err(err) => {
                            errors.record(err);
                            RuleOutcome::NotTriggered
                        }
                    };
                }
                Ok(ClauseOutcome::NoData | ClauseOutcome::NotSatisfied) => {}
                Err(err) => errors.record(err),
            }
        }
        RuleOutcome::NotTriggered
    }

    async fn assess_clause(
        &self,
        ctx: &SweepContext,
        environment_id: &str,
        rule: &AutoOpsRule,
        feature_version: i32,
        clause_id: &str,
        clause: &OpsEventRateClause,
    ) -> DomainResult<ClauseOutcome> {
        let request = OpsUserCountRequest {
            environment_id: environment_id.to_string(),
            rule_id: rule.id.clone(),
            clause_id: clause_id.to_string(),
            feature_id: rule.feature_id.clone(),
            feature_version,
            variation_id: clause.variation_id.clone(),
        };

        let evaluation_count = ctx
            .call(self.event_counter.get_ops_evaluation_user_count(request.clone()))
            .await
            .inspect_err(|err| {
                error!(
                    environment_id,
                    feature_id = %rule.feature_id,
                    rule_id = %rule.id,
                    clause_id,
                    error = %err,
                    "Failed to get evaluation user count"
                );
            })?
            .count;
        if evaluation_count == 0 {
            debug!(environment_id, rule_id = %rule.id, clause_id, "No evaluations yet");
            return Ok(ClauseOutcome::NoData);
        }

        let ops_event_count = ctx
            .call(self.event_counter.get_ops_goal_user_count(request))
            .await
            .inspect_err(|err| {
                error!(
                    environment_id,
                    feature_id = %rule.feature_id,
                    rule_id = %rule.id,
                    clause_id,
                    error = %err,
                    "Failed to get goal user count"
                );
            })?
            .count;
        if ops_event_count == 0 {
            debug!(environment_id, rule_id = %rule.id, clause_id, "No goal events yet");
            return Ok(ClauseOutcome::NoData);
        }

        let ops_count = OpsCount::new(
            &rule.feature_id,
            &rule.id,
            clause_id,
            ops_event_count,
            evaluation_count,
        );
        ctx.call(
            self.ops_count_repository
                .upsert_ops_count(environment_id, &ops_count),
        )
        .await
        .inspect_err(|err| {
            error!(
                environment_id,
                rule_id = %rule.id,
                clause_id,
                error = %err,
                "Failed to persist ops count"
            );
        })?;

        match clause.assess(evaluation_count, ops_event_count) {
            RateAssessment::BelowMinCount => {
                debug!(
                    environment_id,
                    rule_id = %rule.id,
                    clause_id,
                    ops_event_count,
                    min_count = clause.min_count,
                    "Goal count below minimum"
                );
                Ok(ClauseOutcome::NotSatisfied)
            }
            RateAssessment::Evaluated {
                rate,
                satisfied,
                clamped,
            } => {
                if clamped {
                    warn!(
                        environment_id,
                        feature_id = %rule.feature_id,
                        rule_id = %rule.id,
                        clause_id,
                        ops_event_count,
                        evaluation_count,
                        "Goal count exceeds evaluation count, clamping"
                    );
                }
                debug!(
                    environment_id,
                    rule_id = %rule.id,
                    clause_id,
                    rate,
                    threshold = clause.threshold_rate,
                    satisfied,
                    "Event rate assessed"
                );
                Ok(if satisfied {
                    ClauseOutcome::Satisfied
                } else {
                    ClauseOutcome::NotSatisfied
                })
            }
        }
    }
}

#[async_trait]
impl Watcher for EventRateWatcher {
    fn name(&self) -> &'static str {
        "event_rate"
    }

    async fn run(&self) -> DomainResult<()> {
        let ctx = SweepContext::with_timeout(self.sweep_timeout);
        let started = std::time::Instant::now();
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
                match self.assess_rule(&ctx, &env.id, rule, &mut errors).await {
                    RuleOutcome::Triggered => summary.triggered += 1,
                    RuleOutcome::NotTriggered => {}
                    RuleOutcome::Expired => {
                        errors.record(EngineError::DeadlineExceeded);
                        break 'sweep;
                    }
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
