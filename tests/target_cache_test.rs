//! Integration tests for the target cache

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use autoops_engine::domain::models::{AutoOpsStatus, RolloutStatus, TargetCacheConfig};
use autoops_engine::services::{
    AutoOpsRuleLister, EnvironmentLister, ProgressiveRolloutLister, TargetCache,
};
use autoops_engine::EngineError;
use common::{datetime_rule, manual_rollout, schedule, FakeAutoOpsClient, FakeEnvironmentClient};

fn config(page_size: usize) -> TargetCacheConfig {
    TargetCacheConfig {
        refresh_interval_secs: 120,
        refresh_timeout_secs: 60,
        list_page_size: page_size,
    }
}

fn cache(
    environments: Arc<FakeEnvironmentClient>,
    auto_ops: Arc<FakeAutoOpsClient>,
    page_size: usize,
) -> Arc<TargetCache> {
    Arc::new(TargetCache::new(environments, auto_ops, config(page_size)))
}

fn ids<T>(items: &[T], id: impl Fn(&T) -> &str) -> Vec<String> {
    items.iter().map(|item| id(item).to_string()).collect()
}

#[tokio::test]
async fn test_empty_before_first_refresh() {
    let cache = cache(
        Arc::new(FakeEnvironmentClient::with_ids(&["ns0"])),
        Arc::new(FakeAutoOpsClient::default()),
        500,
    );

    assert!(cache.get_environments().is_empty());
    assert!(cache.get_auto_ops_rules("ns0").await.is_empty());
    assert!(cache.get_progressive_rollouts("ns0").await.is_empty());
}

#[tokio::test]
async fn test_refresh_pages_through_environments() {
    let environments = Arc::new(FakeEnvironmentClient::with_ids(&["a", "b", "c", "d", "e"]));
    let cache = cache(environments.clone(), Arc::new(FakeAutoOpsClient::default()), 2);

    cache.refresh().await.unwrap();

    assert_eq!(
        ids(&cache.get_environments(), |e| &e.id),
        vec!["a", "b", "c", "d", "e"]
    );
    let requests = environments.requests.lock().unwrap();
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|r| r.archived == Some(false) && r.page_size == 2));
    assert_eq!(requests[0].cursor, "");
    assert_eq!(requests[1].cursor, "2");
}

#[tokio::test]
async fn test_archived_environments_are_dropped() {
    let environments = Arc::new(FakeEnvironmentClient::with_ids(&["live", "old"]));
    environments.environments.lock().unwrap()[1].archived = true;
    let cache = cache(environments, Arc::new(FakeAutoOpsClient::default()), 500);

    cache.refresh().await.unwrap();

    assert_eq!(ids(&cache.get_environments(), |e| &e.id), vec!["live"]);
}

#[tokio::test]
async fn test_terminal_rules_and_finished_rollouts_are_dropped() {
    let auto_ops = Arc::new(FakeAutoOpsClient::default());
    let mut finished = datetime_rule("finished", "f", &[("c", 1)]);
    finished.auto_ops_status = AutoOpsStatus::Finished;
    let mut stopped = datetime_rule("stopped", "f", &[("c", 1)]);
    stopped.auto_ops_status = AutoOpsStatus::Stopped;
    auto_ops.set_rules(
        "ns0",
        vec![datetime_rule("waiting", "f", &[("c", 1)]), finished, stopped],
    );
    let mut done = manual_rollout("done", "f", vec![schedule("s1", 1, 0)]);
    done.status = RolloutStatus::Finished;
    auto_ops.set_rollouts(
        "ns0",
        vec![manual_rollout("open", "f", vec![schedule("s1", 1, 0)]), done],
    );

    let cache = cache(
        Arc::new(FakeEnvironmentClient::with_ids(&["ns0"])),
        auto_ops,
        500,
    );
    cache.refresh().await.unwrap();

    assert_eq!(ids(&cache.get_auto_ops_rules("ns0").await, |r| &r.id), vec!["waiting"]);
    assert_eq!(
        ids(&cache.get_progressive_rollouts("ns0").await, |r| &r.id),
        vec!["open"]
    );
}

#[tokio::test]
async fn test_rules_are_paged() {
    let auto_ops = Arc::new(FakeAutoOpsClient::default());
    let rules = (0..5)
        .map(|i| datetime_rule(&format!("r{i}"), "f", &[("c", 1)]))
        .collect();
    auto_ops.set_rules("ns0", rules);

    let cache = cache(
        Arc::new(FakeEnvironmentClient::with_ids(&["ns0"])),
        auto_ops.clone(),
        2,
    );
    cache.refresh().await.unwrap();

    assert_eq!(cache.get_auto_ops_rules("ns0").await.len(), 5);
    assert_eq!(auto_ops.rule_list_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_failed_environment_listing_keeps_stale_snapshot() {
    let environments = Arc::new(FakeEnvironmentClient::with_ids(&["ns0"]));
    let auto_ops = Arc::new(FakeAutoOpsClient::default());
    auto_ops.set_rules("ns0", vec![datetime_rule("r0", "f", &[("c", 1)])]);
    let cache = cache(environments.clone(), auto_ops, 500);
    cache.refresh().await.unwrap();

    environments.fail.store(true, Ordering::SeqCst);
    let err = cache.refresh().await.unwrap_err();

    assert!(matches!(err, EngineError::Upstream { .. }));
    assert_eq!(ids(&cache.get_environments(), |e| &e.id), vec!["ns0"]);
    assert_eq!(cache.get_auto_ops_rules("ns0").await.len(), 1);
}

#[tokio::test]
async fn test_failed_rule_listing_omits_only_that_environment() {
    let auto_ops = Arc::new(FakeAutoOpsClient::default());
    auto_ops.set_rules("ns0", vec![datetime_rule("r0", "f", &[("c", 1)])]);
    auto_ops.set_rules("ns1", vec![datetime_rule("r1", "f", &[("c", 1)])]);
    let cache = cache(
        Arc::new(FakeEnvironmentClient::with_ids(&["ns0", "ns1"])),
        auto_ops.clone(),
        500,
    );
    cache.refresh().await.unwrap();

    auto_ops.fail_rule_listing("ns0");
    assert!(cache.refresh().await.is_err());

    assert!(cache.get_auto_ops_rules("ns0").await.is_empty());
    assert_eq!(ids(&cache.get_auto_ops_rules("ns1").await, |r| &r.id), vec!["r1"]);
}

#[tokio::test]
async fn test_readers_never_observe_partial_generation() {
    let environments = Arc::new(FakeEnvironmentClient::with_ids(&["ns0", "ns1"]));
    let auto_ops = Arc::new(FakeAutoOpsClient::default());
    auto_ops.set_rules("ns0", vec![datetime_rule("old-0", "f", &[("c", 1)])]);
    auto_ops.set_rules("ns1", vec![datetime_rule("old-1", "f", &[("c", 1)])]);
    let cache = cache(environments, auto_ops.clone(), 500);
    cache.refresh().await.unwrap();

    auto_ops.set_rules("ns0", vec![datetime_rule("new-0", "f", &[("c", 1)])]);
    auto_ops.set_rules("ns1", vec![datetime_rule("new-1", "f", &[("c", 1)])]);
    let (entered, release) = auto_ops.gate_rule_listing("ns1");

    let refreshing = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.refresh().await })
    };

    // ns0 of the new generation is already listed; it must stay invisible.
    entered.notified().await;
    assert_eq!(ids(&cache.get_auto_ops_rules("ns0").await, |r| &r.id), vec!["old-0"]);
    assert_eq!(ids(&cache.get_auto_ops_rules("ns1").await, |r| &r.id), vec!["old-1"]);

    release.notify_one();
    refreshing.await.unwrap().unwrap();

    assert_eq!(ids(&cache.get_auto_ops_rules("ns0").await, |r| &r.id), vec!["new-0"]);
    assert_eq!(ids(&cache.get_auto_ops_rules("ns1").await, |r| &r.id), vec!["new-1"]);
}

#[tokio::test]
async fn test_unknown_environment_is_empty() {
    let cache = cache(
        Arc::new(FakeEnvironmentClient::with_ids(&["ns0"])),
        Arc::new(FakeAutoOpsClient::default()),
        500,
    );
    cache.refresh().await.unwrap();
    assert!(cache.get_auto_ops_rules("nope").await.is_empty());
    assert!(cache.get_progressive_rollouts("nope").await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_background_loop_refreshes_and_stops() {
    let environments = Arc::new(FakeEnvironmentClient::with_ids(&["ns0"]));
    let cache = cache(environments.clone(), Arc::new(FakeAutoOpsClient::default()), 500);
    let mut snapshots = cache.subscribe_environments();

    let handle = cache.clone().start();

    // Eager refresh on start
    snapshots.changed().await.unwrap();
    assert_eq!(ids(&cache.get_environments(), |e| &e.id), vec!["ns0"]);

    environments.set_ids(&["ns0", "ns1"]);
    tokio::time::sleep(Duration::from_secs(121)).await;
    assert_eq!(ids(&cache.get_environments(), |e| &e.id), vec!["ns0", "ns1"]);

    handle.stop().await;
    let calls_after_stop = environments.requests.lock().unwrap().len();
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(environments.requests.lock().unwrap().len(), calls_after_stop);
}
