//! Wires the target cache, executors, watchers and scheduler from [`Config`].

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::domain::models::Config;
use crate::domain::ports::{
    AutoOpsClient, Clock, EnvironmentClient, EventCounterClient, FeatureClient,
    FeatureFlagCacheRefresher, OpsCountRepository, SystemClock,
};
use crate::services::{
    AutoOpsExecutorImpl, DatetimeWatcher, EventRateWatcher, ProgressiveRolloutExecutorImpl,
    ProgressiveRolloutWatcher, SchedulerHandle, TargetCache, TargetCacheHandle, WatcherScheduler,
    WatcherStats,
};

/// Collaborators the engine reaches through its ports.
pub struct EngineDependencies {
    /// Lists environments for the target cache.
    pub environment_client: Arc<dyn EnvironmentClient>,
    /// Lists rules and rollouts, and executes them.
    pub auto_ops_client: Arc<dyn AutoOpsClient>,
    /// Resolves the feature version for count lookups.
    pub feature_client: Arc<dyn FeatureClient>,
    /// Evaluation and goal user counts.
    pub event_counter: Arc<dyn EventCounterClient>,
    /// Persists count snapshots.
    pub ops_count_repository: Arc<dyn OpsCountRepository>,
    /// Refreshes the flag cache after rollout steps; none by default.
    pub cache_refresher: Option<Arc<dyn FeatureFlagCacheRefresher>>,
    /// Time source for due checks; the system clock by default.
    pub clock: Arc<dyn Clock>,
}

impl EngineDependencies {
    /// Required collaborators, with no cache refresher and the system clock.
    pub fn new(
        environment_client: Arc<dyn EnvironmentClient>,
        auto_ops_client: Arc<dyn AutoOpsClient>,
        feature_client: Arc<dyn FeatureClient>,
        event_counter: Arc<dyn EventCounterClient>,
        ops_count_repository: Arc<dyn OpsCountRepository>,
    ) -> Self {
        Self {
            environment_client,
            auto_ops_client,
            feature_client,
            event_counter,
            ops_count_repository,
            cache_refresher: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Refresh the flag cache of environments that had a rollout step applied.
    #[must_use]
    pub fn with_cache_refresher(mut self, refresher: Arc<dyn FeatureFlagCacheRefresher>) -> Self {
        self.cache_refresher = Some(refresher);
        self
    }

    /// Replace the clock, typically with a fixed one in tests.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// The assembled engine before it is started.
pub struct AutoOpsEngine {
    cache: Arc<TargetCache>,
    scheduler: WatcherScheduler,
}

impl AutoOpsEngine {
    /// Build the target cache, both executors and the three watchers.
    ///
    /// Every watcher shares the cache as its lister and gets the sweep timeout
    /// and interval from `config.watchers`. Nothing runs until [`Self::start`].
    pub fn new(config: &Config, deps: EngineDependencies) -> Self {
        let cache = Arc::new(TargetCache::new(
            Arc::clone(&deps.environment_client),
            Arc::clone(&deps.auto_ops_client),
            config.target_cache.clone(),
        ));
        let watchers = &config.watchers;
        let sweep_timeout = watchers.sweep_timeout();

        let auto_ops_executor = Arc::new(AutoOpsExecutorImpl::new(Arc::clone(&deps.auto_ops_client)));
        let rollout_executor = Arc::new(ProgressiveRolloutExecutorImpl::new(Arc::clone(
            &deps.auto_ops_client,
        )));

        let datetime = DatetimeWatcher::new(
            cache.clone(),
            cache.clone(),
            auto_ops_executor.clone(),
            Arc::clone(&deps.clock),
            sweep_timeout,
        );
        let event_rate = EventRateWatcher::new(
            cache.clone(),
            cache.clone(),
            deps.feature_client,
            deps.event_counter,
            deps.ops_count_repository,
            auto_ops_executor,
            sweep_timeout,
        );
        let mut rollout = ProgressiveRolloutWatcher::new(
            cache.clone(),
            cache.clone(),
            rollout_executor,
            deps.clock,
            sweep_timeout,
        );
        if let Some(refresher) = deps.cache_refresher {
            rollout = rollout.with_cache_refresher(refresher);
        }

        let scheduler = WatcherScheduler::from_config(watchers)
            .register(
                Arc::new(datetime),
                Duration::from_secs(watchers.datetime_interval_secs),
            )
            .register(
                Arc::new(event_rate),
                Duration::from_secs(watchers.event_rate_interval_secs),
            )
            .register(
                Arc::new(rollout),
                Duration::from_secs(watchers.progressive_rollout_interval_secs),
            );

        Self { cache, scheduler }
    }

    /// The cache the watchers read from.
    pub fn target_cache(&self) -> Arc<TargetCache> {
        Arc::clone(&self.cache)
    }

    /// Start the cache refresh loop and every watcher.
    pub fn start(self) -> EngineHandle {
        let cache = self.cache.start();
        let scheduler = self.scheduler.start();
        info!("Auto ops engine started");
        EngineHandle { cache, scheduler }
    }
}

/// Controls a running engine.
pub struct EngineHandle {
    cache: TargetCacheHandle,
    scheduler: SchedulerHandle,
}

impl EngineHandle {
    /// Run counters of a watcher by name, once it has run at least once.
    pub async fn watcher_stats(&self, name: &str) -> Option<WatcherStats> {
        self.scheduler.watcher_stats(name).await
    }

    /// Stop the watchers first, then the cache they read from.
    pub async fn stop(self) {
        self.scheduler.stop().await;
        self.cache.stop().await;
        info!("Auto ops engine stopped");
    }
}
