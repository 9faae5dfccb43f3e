//! In-memory snapshot of the environments, open rules and open rollouts that
//! watchers sweep.
//!
//! The cache is refreshed on a timer from the upstream listing APIs. Readers
//! always get a complete generation: the environment list is swapped as one
//! value and the per-environment maps are built off-lock and replaced whole.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::domain::errors::{DomainResult, EngineError};
use crate::domain::models::{AutoOpsRule, Environment, ProgressiveRollout, TargetCacheConfig};
use crate::domain::ports::{
    AutoOpsClient, EnvironmentClient, ListAutoOpsRulesRequest, ListEnvironmentsRequest,
    ListProgressiveRolloutsRequest,
};
use crate::services::sweep::SweepErrors;

/// Read access to the cached environment list.
pub trait EnvironmentLister: Send + Sync {
    /// Last successfully refreshed snapshot; empty before the first refresh.
    fn get_environments(&self) -> Arc<[Environment]>;
}

/// Read access to the cached open rules of an environment.
#[async_trait]
pub trait AutoOpsRuleLister: Send + Sync {
    /// Open rules of `environment_id`; empty for unknown environments.
    async fn get_auto_ops_rules(&self, environment_id: &str) -> Arc<[AutoOpsRule]>;
}

/// Read access to the cached open rollouts of an environment.
#[async_trait]
pub trait ProgressiveRolloutLister: Send + Sync {
    /// Open rollouts of `environment_id`; empty for unknown environments.
    async fn get_progressive_rollouts(&self, environment_id: &str) -> Arc<[ProgressiveRollout]>;
}

/// Page through a cursor-based listing until a short or empty page.
pub(crate) async fn collect_pages<T, F, Fut>(page_size: usize, mut fetch: F) -> DomainResult<Vec<T>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = DomainResult<(Vec<T>, String)>>,
{
    let mut items = Vec::new();
    let mut cursor = String::new();
    loop {
        let (page, next_cursor) = fetch(cursor).await?;
        let len = page.len();
        items.extend(page);
        if len == 0 || len < page_size {
            return Ok(items);
        }
        cursor = next_cursor;
    }
}

/// Environments, open auto-ops rules and open progressive rollouts.
pub struct TargetCache {
    environment_client: Arc<dyn EnvironmentClient>,
    auto_ops_client: Arc<dyn AutoOpsClient>,
    config: TargetCacheConfig,
    environments: watch::Sender<Arc<[Environment]>>,
    auto_ops_rules: Mutex<HashMap<String, Arc<[AutoOpsRule]>>>,
    progressive_rollouts: Mutex<HashMap<String, Arc<[ProgressiveRollout]>>>,
}

impl TargetCache {
    /// Empty cache; nothing is listed until the first refresh.
    pub fn new(
        environment_client: Arc<dyn EnvironmentClient>,
        auto_ops_client: Arc<dyn AutoOpsClient>,
        config: TargetCacheConfig,
    ) -> Self {
        Self {
            environment_client,
            auto_ops_client,
            config,
            environments: watch::Sender::new(Arc::from(Vec::new())),
            auto_ops_rules: Mutex::new(HashMap::new()),
            progressive_rollouts: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe to environment snapshot swaps.
    pub fn subscribe_environments(&self) -> watch::Receiver<Arc<[Environment]>> {
        self.environments.subscribe()
    }

    /// Run one refresh cycle bounded by the refresh timeout.
    ///
    /// A failed environment listing keeps the previous generation. A failed
    /// rule or rollout listing drops only that environment from the new
    /// generation; the last such failure is returned.
    pub async fn refresh(&self) -> DomainResult<()> {
        tokio::time::timeout(self.config.refresh_timeout(), self.refresh_generation())
            .await
            .unwrap_or(Err(EngineError::DeadlineExceeded))
    }

    async fn refresh_generation(&self) -> DomainResult<()> {
        let environments: Arc<[Environment]> = self
            .list_environments()
            .await?
            .into_iter()
            .filter(|env| !env.archived)
            .collect();

        let mut errors = SweepErrors::default();
        let mut rules = HashMap::with_capacity(environments.len());
        let mut rollouts = HashMap::with_capacity(environments.len());

        for env in environments.iter() {
            match self.list_auto_ops_rules(&env.id).await {
                Ok(list) => {
                    let open: Arc<[AutoOpsRule]> =
                        list.into_iter().filter(|r| !r.already_triggered()).collect();
                    rules.insert(env.id.clone(), open);
                }
                Err(err) => {
                    warn!(environment_id = %env.id, error = %err, "Failed to list auto ops rules");
                    errors.record(err);
                }
            }

            match self.list_progressive_rollouts(&env.id).await {
                Ok(list) => {
                    let open: Arc<[ProgressiveRollout]> =
                        list.into_iter().filter(|p| !p.is_finished()).collect();
                    rollouts.insert(env.id.clone(), open);
                }
                Err(err) => {
                    warn!(environment_id = %env.id, error = %err, "Failed to list progressive rollouts");
                    errors.record(err);
                }
            }
        }

        *self.auto_ops_rules.lock().await = rules;
        *self.progressive_rollouts.lock().await = rollouts;
        self.environments.send_replace(Arc::clone(&environments));

        debug!(
            environments = environments.len(),
            failures = errors.failures(),
            "Target cache generation replaced"
        );
        errors.into_result()
    }

    async fn list_environments(&self) -> DomainResult<Vec<Environment>> {
        let client = &self.environment_client;
        let page_size = self.config.list_page_size;
        collect_pages(page_size, |cursor| {
            let request = ListEnvironmentsRequest {
                page_size,
                cursor,
                archived: Some(false),
            };
            async move {
                let response = client.list_environments(request).await?;
                Ok((response.environments, response.cursor))
            }
        })
        .await
    }

    async fn list_auto_ops_rules(&self, environment_id: &str) -> DomainResult<Vec<AutoOpsRule>> {
        let client = &self.auto_ops_client;
        let page_size = self.config.list_page_size;
        collect_pages(page_size, |cursor| {
            let request = ListAutoOpsRulesRequest {
                environment_id: environment_id.to_string(),
                page_size,
                cursor,
            };
            async move {
                let response = client.list_auto_ops_rules(request).await?;
                Ok((response.auto_ops_rules, response.cursor))
            }
        })
        .await
    }

    async fn list_progressive_rollouts(
        &self,
        environment_id: &str,
    ) -> DomainResult<Vec<ProgressiveRollout>> {
        let client = &self.auto_ops_client;
        let page_size = self.config.list_page_size;
        collect_pages(page_size, |cursor| {
            let request = ListProgressiveRolloutsRequest {
                environment_id: environment_id.to_string(),
                page_size,
                cursor,
            };
            async move {
                let response = client.list_progressive_rollouts(request).await?;
                Ok((response.progressive_rollouts, response.cursor))
            }
        })
        .await
    }

    async fn refresh_and_log(&self) {
        if let Err(err) = self.refresh().await {
            error!(error = %err, "Target cache refresh failed");
        }
    }

    /// Spawn the refresh loop: one eager refresh, then one per interval.
    pub fn start(self: Arc<Self>) -> TargetCacheHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let period = self.config.refresh_interval();

        let join = tokio::spawn(async move {
            info!(interval_secs = period.as_secs(), "Target cache started");
            self.refresh_and_log().await;

            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => self.refresh_and_log().await,
                }
            }
            info!("Target cache stopped");
        });

        TargetCacheHandle { stop_tx, join }
    }
}

impl EnvironmentLister for TargetCache {
    fn get_environments(&self) -> Arc<[Environment]> {
        Arc::clone(&self.environments.borrow())
    }
}

#[async_trait]
impl AutoOpsRuleLister for TargetCache {
    async fn get_auto_ops_rules(&self, environment_id: &str) -> Arc<[AutoOpsRule]> {
        self.auto_ops_rules
            .lock()
            .await
            .get(environment_id)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }
}

#[async_trait]
impl ProgressiveRolloutLister for TargetCache {
    async fn get_progressive_rollouts(&self, environment_id: &str) -> Arc<[ProgressiveRollout]> {
        self.progressive_rollouts
            .lock()
            .await
            .get(environment_id)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }
}

/// Stops the refresh loop started by [`TargetCache::start`].
pub struct TargetCacheHandle {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

impl TargetCacheHandle {
    /// Signal the loop and wait until it has exited.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(());
        if let Err(err) = self.join.await {
            warn!(error = %err, "Target cache task ended abnormally");
        }
    }
}
