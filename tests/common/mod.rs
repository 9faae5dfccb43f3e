//! Common test utilities for integration tests
//!
//! Hand-written fakes for every port the engine consumes, plus builders for
//! rules and rollouts. Every fake records what it was asked so tests can
//! assert on call sequences.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use autoops_engine::domain::errors::{DomainResult, EngineError};
use autoops_engine::domain::models::{
    AutoOpsRule, Clause, DatetimeClause, Environment, ManualScheduleClause, OpsCount,
    OpsEventRateClause, OpsType, ProgressiveRollout, RateOperator, RolloutSchedule,
};
use autoops_engine::domain::ports::{
    AutoOpsClient, EnvironmentClient, EventCounterClient, ExecuteAutoOpsRequest,
    ExecuteAutoOpsResponse, ExecuteProgressiveRolloutRequest, ExecuteProgressiveRolloutResponse,
    Feature, FeatureClient, FeatureFlagCacheRefresher, GetFeatureRequest, GetFeatureResponse,
    ListAutoOpsRulesRequest, ListAutoOpsRulesResponse, ListEnvironmentsRequest,
    ListEnvironmentsResponse, ListProgressiveRolloutsRequest, ListProgressiveRolloutsResponse,
    OpsCountRepository, OpsUserCountRequest, OpsUserCountResponse,
};
use autoops_engine::services::{
    AutoOpsExecutor, AutoOpsRuleLister, EnvironmentLister, ProgressiveRolloutExecutor,
    ProgressiveRolloutLister,
};

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn datetime_rule(id: &str, feature_id: &str, times: &[(&str, i64)]) -> AutoOpsRule {
    let clauses = times
        .iter()
        .map(|(clause_id, time)| Clause::datetime(*clause_id, DatetimeClause { time: *time }).unwrap())
        .collect();
    AutoOpsRule::new(id, feature_id, OpsType::Schedule, clauses)
}

pub fn rate_clause(variation_id: &str, min_count: i64, threshold_rate: f64) -> OpsEventRateClause {
    OpsEventRateClause {
        variation_id: variation_id.to_string(),
        goal_id: "goal-1".to_string(),
        min_count,
        threshold_rate,
        operator: RateOperator::GreaterOrEqual,
    }
}

pub fn event_rate_rule(
    id: &str,
    feature_id: &str,
    clauses: &[(&str, OpsEventRateClause)],
) -> AutoOpsRule {
    let clauses = clauses
        .iter()
        .map(|(clause_id, clause)| Clause::ops_event_rate(*clause_id, clause).unwrap())
        .collect();
    AutoOpsRule::new(id, feature_id, OpsType::EventRate, clauses)
}

pub fn schedule(id: &str, execute_at: i64, triggered_at: i64) -> RolloutSchedule {
    RolloutSchedule {
        schedule_id: id.to_string(),
        execute_at,
        weight: 20,
        triggered_at,
    }
}

pub fn manual_rollout(id: &str, feature_id: &str, schedules: Vec<RolloutSchedule>) -> ProgressiveRollout {
    ProgressiveRollout::manual(
        id,
        feature_id,
        &ManualScheduleClause {
            schedules,
            variation_id: "vid-1".to_string(),
        },
    )
    .unwrap()
}

pub fn upstream_error(operation: &'static str, message: &str) -> EngineError {
    EngineError::upstream("fake", operation, message)
}

// ---------------------------------------------------------------------------
// Listers
// ---------------------------------------------------------------------------

/// Fixed targets served to watchers in place of the target cache.
#[derive(Default)]
pub struct StaticTargets {
    pub environments: Vec<Environment>,
    pub rules: HashMap<String, Vec<AutoOpsRule>>,
    pub rollouts: HashMap<String, Vec<ProgressiveRollout>>,
}

impl StaticTargets {
    pub fn with_rules(environment_id: &str, rules: Vec<AutoOpsRule>) -> Self {
        let mut targets = Self::default();
        targets.environments.push(Environment::new(environment_id));
        targets.rules.insert(environment_id.to_string(), rules);
        targets
    }

    pub fn with_rollouts(environment_id: &str, rollouts: Vec<ProgressiveRollout>) -> Self {
        let mut targets = Self::default();
        targets.environments.push(Environment::new(environment_id));
        targets.rollouts.insert(environment_id.to_string(), rollouts);
        targets
    }

    pub fn add_rules(&mut self, environment_id: &str, rules: Vec<AutoOpsRule>) {
        self.environments.push(Environment::new(environment_id));
        self.rules.insert(environment_id.to_string(), rules);
    }

    pub fn add_rollouts(&mut self, environment_id: &str, rollouts: Vec<ProgressiveRollout>) {
        self.environments.push(Environment::new(environment_id));
        self.rollouts.insert(environment_id.to_string(), rollouts);
    }
}

impl EnvironmentLister for StaticTargets {
    fn get_environments(&self) -> Arc<[Environment]> {
        Arc::from(self.environments.clone())
    }
}

#[async_trait]
impl AutoOpsRuleLister for StaticTargets {
    async fn get_auto_ops_rules(&self, environment_id: &str) -> Arc<[AutoOpsRule]> {
        Arc::from(self.rules.get(environment_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl ProgressiveRolloutLister for StaticTargets {
    async fn get_progressive_rollouts(&self, environment_id: &str) -> Arc<[ProgressiveRollout]> {
        Arc::from(self.rollouts.get(environment_id).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Executors
// ---------------------------------------------------------------------------

/// Records every `(environment, rule, clause)` it finished executing.
///
/// With a latency set, each call sleeps first, so a call cut off by the
/// sweep deadline is never recorded.
#[derive(Default)]
pub struct RecordingAutoOpsExecutor {
    pub calls: Mutex<Vec<(String, String, String)>>,
    pub fail_rules: Mutex<HashSet<String>>,
    pub latency: Mutex<Option<Duration>>,
}

impl RecordingAutoOpsExecutor {
    pub fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_rule(&self, rule_id: &str) {
        self.fail_rules.lock().unwrap().insert(rule_id.to_string());
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }
}

#[async_trait]
impl AutoOpsExecutor for RecordingAutoOpsExecutor {
    async fn execute(&self, environment_id: &str, rule_id: &str, clause_id: &str) -> DomainResult<()> {
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.calls.lock().unwrap().push((
            environment_id.to_string(),
            rule_id.to_string(),
            clause_id.to_string(),
        ));
        if self.fail_rules.lock().unwrap().contains(rule_id) {
            return Err(EngineError::ExecutionFailed {
                target: "auto ops rule",
                id: rule_id.to_string(),
                message: "injected".to_string(),
            });
        }
        Ok(())
    }
}

/// Records every `(environment, rollout, schedule)` it finished executing.
#[derive(Default)]
pub struct RecordingRolloutExecutor {
    pub calls: Mutex<Vec<(String, String, String)>>,
    pub fail_rollouts: Mutex<HashSet<String>>,
    pub latency: Mutex<Option<Duration>>,
}

impl RecordingRolloutExecutor {
    pub fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_rollout(&self, rollout_id: &str) {
        self.fail_rollouts.lock().unwrap().insert(rollout_id.to_string());
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }
}

#[async_trait]
impl ProgressiveRolloutExecutor for RecordingRolloutExecutor {
    async fn execute_progressive_rollout(
        &self,
        environment_id: &str,
        rollout_id: &str,
        schedule_id: &str,
    ) -> DomainResult<()> {
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.calls.lock().unwrap().push((
            environment_id.to_string(),
            rollout_id.to_string(),
            schedule_id.to_string(),
        ));
        if self.fail_rollouts.lock().unwrap().contains(rollout_id) {
            return Err(EngineError::ExecutionFailed {
                target: "progressive rollout",
                id: rollout_id.to_string(),
                message: "injected".to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Feature, counter, persistence and cache refresher fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeFeatureClient {
    pub versions: Mutex<HashMap<String, i32>>,
    pub requests: Mutex<Vec<GetFeatureRequest>>,
}

impl FakeFeatureClient {
    pub fn with_version(feature_id: &str, version: i32) -> Self {
        let fake = Self::default();
        fake.versions
            .lock()
            .unwrap()
            .insert(feature_id.to_string(), version);
        fake
    }
}

#[async_trait]
impl FeatureClient for FakeFeatureClient {
    async fn get_feature(&self, request: GetFeatureRequest) -> DomainResult<GetFeatureResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let version = self
            .versions
            .lock()
            .unwrap()
            .get(&request.feature_id)
            .copied()
            .ok_or_else(|| upstream_error("get_feature", "feature not found"))?;
        Ok(GetFeatureResponse {
            feature: Feature {
                id: request.feature_id,
                version,
            },
        })
    }
}

/// Counts keyed by clause id. A missing key or an injected error fails the call.
#[derive(Default)]
pub struct FakeEventCounter {
    pub evaluation_counts: Mutex<HashMap<String, i64>>,
    pub goal_counts: Mutex<HashMap<String, i64>>,
    pub failing_evaluation_clauses: Mutex<HashSet<String>>,
    pub requests: Mutex<Vec<OpsUserCountRequest>>,
    pub evaluation_latency: Mutex<Option<Duration>>,
}

impl FakeEventCounter {
    pub fn set_counts(&self, clause_id: &str, evaluation: i64, goal: i64) {
        self.evaluation_counts
            .lock()
            .unwrap()
            .insert(clause_id.to_string(), evaluation);
        self.goal_counts
            .lock()
            .unwrap()
            .insert(clause_id.to_string(), goal);
    }

    pub fn fail_evaluation(&self, clause_id: &str) {
        self.failing_evaluation_clauses
            .lock()
            .unwrap()
            .insert(clause_id.to_string());
    }

    /// Delay every evaluation count lookup; the request is recorded first.
    pub fn set_evaluation_latency(&self, latency: Duration) {
        *self.evaluation_latency.lock().unwrap() = Some(latency);
    }

    pub fn requested_clauses(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.clause_id.clone())
            .collect()
    }
}

#[async_trait]
impl EventCounterClient for FakeEventCounter {
    async fn get_ops_evaluation_user_count(
        &self,
        request: OpsUserCountRequest,
    ) -> DomainResult<OpsUserCountResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let latency = *self.evaluation_latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self
            .failing_evaluation_clauses
            .lock()
            .unwrap()
            .contains(&request.clause_id)
        {
            return Err(upstream_error("get_ops_evaluation_user_count", "not found"));
        }
        let count = self
            .evaluation_counts
            .lock()
            .unwrap()
            .get(&request.clause_id)
            .copied()
            .unwrap_or_default();
        Ok(OpsUserCountResponse { count })
    }

    async fn get_ops_goal_user_count(
        &self,
        request: OpsUserCountRequest,
    ) -> DomainResult<OpsUserCountResponse> {
        let count = self
            .goal_counts
            .lock()
            .unwrap()
            .get(&request.clause_id)
            .copied()
            .unwrap_or_default();
        Ok(OpsUserCountResponse { count })
    }
}

#[derive(Default)]
pub struct FakeOpsCountRepository {
    pub upserts: Mutex<Vec<(String, OpsCount)>>,
    pub fail: AtomicBool,
}

impl FakeOpsCountRepository {
    pub fn upserts(&self) -> Vec<(String, OpsCount)> {
        self.upserts.lock().unwrap().clone()
    }
}

#[async_trait]
impl OpsCountRepository for FakeOpsCountRepository {
    async fn upsert_ops_count(&self, environment_id: &str, ops_count: &OpsCount) -> DomainResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EngineError::Database("connection refused".to_string()));
        }
        self.upserts
            .lock()
            .unwrap()
            .push((environment_id.to_string(), ops_count.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeCacheRefresher {
    pub refreshed: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

impl FakeCacheRefresher {
    pub fn refreshed(&self) -> Vec<String> {
        self.refreshed.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeatureFlagCacheRefresher for FakeCacheRefresher {
    async fn refresh_environment_cache(&self, environment_id: &str) -> DomainResult<()> {
        self.refreshed.lock().unwrap().push(environment_id.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(EngineError::CacheRefreshFailed {
                environment_id: environment_id.to_string(),
                message: "redis unavailable".to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Upstream listing fakes
// ---------------------------------------------------------------------------

/// Serve `items[cursor..cursor + page_size]`, with the cursor as a decimal offset.
fn page<T: Clone>(items: &[T], cursor: &str, page_size: usize) -> (Vec<T>, String) {
    let start = cursor.parse::<usize>().unwrap_or(0).min(items.len());
    let end = (start + page_size).min(items.len());
    (items[start..end].to_vec(), end.to_string())
}

#[derive(Default)]
pub struct FakeEnvironmentClient {
    pub environments: Mutex<Vec<Environment>>,
    pub requests: Mutex<Vec<ListEnvironmentsRequest>>,
    pub fail: AtomicBool,
}

impl FakeEnvironmentClient {
    pub fn with_ids(ids: &[&str]) -> Self {
        let fake = Self::default();
        fake.set_ids(ids);
        fake
    }

    pub fn set_ids(&self, ids: &[&str]) {
        *self.environments.lock().unwrap() = ids.iter().map(|id| Environment::new(*id)).collect();
    }
}

#[async_trait]
impl EnvironmentClient for FakeEnvironmentClient {
    async fn list_environments(
        &self,
        request: ListEnvironmentsRequest,
    ) -> DomainResult<ListEnvironmentsResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(upstream_error("list_environments", "unavailable"));
        }
        let environments = self.environments.lock().unwrap();
        let (environments, cursor) = page(&environments, &request.cursor, request.page_size);
        Ok(ListEnvironmentsResponse {
            environments,
            cursor,
        })
    }
}

/// Pauses the rule listing of one environment until released.
pub struct ListingGate {
    pub environment_id: String,
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[derive(Default)]
pub struct FakeAutoOpsClient {
    pub rules: Mutex<HashMap<String, Vec<AutoOpsRule>>>,
    pub rollouts: Mutex<HashMap<String, Vec<ProgressiveRollout>>>,
    pub failing_rule_listings: Mutex<HashSet<String>>,
    pub rule_list_calls: AtomicUsize,
    pub gate: Mutex<Option<ListingGate>>,
    pub executed_rules: Mutex<Vec<ExecuteAutoOpsRequest>>,
    pub executed_rollouts: Mutex<Vec<ExecuteProgressiveRolloutRequest>>,
}

impl FakeAutoOpsClient {
    pub fn set_rules(&self, environment_id: &str, rules: Vec<AutoOpsRule>) {
        self.rules
            .lock()
            .unwrap()
            .insert(environment_id.to_string(), rules);
    }

    pub fn set_rollouts(&self, environment_id: &str, rollouts: Vec<ProgressiveRollout>) {
        self.rollouts
            .lock()
            .unwrap()
            .insert(environment_id.to_string(), rollouts);
    }

    pub fn fail_rule_listing(&self, environment_id: &str) {
        self.failing_rule_listings
            .lock()
            .unwrap()
            .insert(environment_id.to_string());
    }

    /// Install a gate and return `(entered, release)`.
    pub fn gate_rule_listing(&self, environment_id: &str) -> (Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(ListingGate {
            environment_id: environment_id.to_string(),
            entered: entered.clone(),
            release: release.clone(),
        });
        (entered, release)
    }
}

#[async_trait]
impl AutoOpsClient for FakeAutoOpsClient {
    async fn list_auto_ops_rules(
        &self,
        request: ListAutoOpsRulesRequest,
    ) -> DomainResult<ListAutoOpsRulesResponse> {
        self.rule_list_calls.fetch_add(1, Ordering::SeqCst);

        let gate = {
            let mut gate = self.gate.lock().unwrap();
            let matches = gate
                .as_ref()
                .is_some_and(|g| g.environment_id == request.environment_id);
            if matches {
                gate.take()
            } else {
                None
            }
        };
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        if self
            .failing_rule_listings
            .lock()
            .unwrap()
            .contains(&request.environment_id)
        {
            return Err(upstream_error("list_auto_ops_rules", "unavailable"));
        }
        let rules = self
            .rules
            .lock()
            .unwrap()
            .get(&request.environment_id)
            .cloned()
            .unwrap_or_default();
        let (auto_ops_rules, cursor) = page(&rules, &request.cursor, request.page_size);
        Ok(ListAutoOpsRulesResponse {
            auto_ops_rules,
            cursor,
        })
    }

    async fn list_progressive_rollouts(
        &self,
        request: ListProgressiveRolloutsRequest,
    ) -> DomainResult<ListProgressiveRolloutsResponse> {
        let rollouts = self
            .rollouts
            .lock()
            .unwrap()
            .get(&request.environment_id)
            .cloned()
            .unwrap_or_default();
        let (progressive_rollouts, cursor) = page(&rollouts, &request.cursor, request.page_size);
        Ok(ListProgressiveRolloutsResponse {
            progressive_rollouts,
            cursor,
        })
    }

    async fn execute_auto_ops(
        &self,
        request: ExecuteAutoOpsRequest,
    ) -> DomainResult<ExecuteAutoOpsResponse> {
        let mut executed = self.executed_rules.lock().unwrap();
        let already_triggered = executed.iter().any(|r| r.rule_id == request.rule_id);
        executed.push(request);
        Ok(ExecuteAutoOpsResponse { already_triggered })
    }

    async fn execute_progressive_rollout(
        &self,
        request: ExecuteProgressiveRolloutRequest,
    ) -> DomainResult<ExecuteProgressiveRolloutResponse> {
        let mut executed = self.executed_rollouts.lock().unwrap();
        let already_triggered = executed
            .iter()
            .any(|r| r.rollout_id == request.rollout_id && r.schedule_id == request.schedule_id);
        executed.push(request);
        Ok(ExecuteProgressiveRolloutResponse { already_triggered })
    }
}
