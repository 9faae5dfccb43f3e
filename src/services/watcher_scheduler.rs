//! Drives registered watchers on their own cadence.
//!
//! Every watcher gets its own task and interval, so a slow sweep of one kind
//! never delays another. Sweeps of the same watcher never overlap: a tick that
//! lands while a sweep is still running is skipped.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::domain::models::WatchersConfig;
use crate::services::sweep::Watcher;

/// Run counters of one watcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatcherStats {
    /// Sweeps started
    pub total_runs: u64,
    /// Sweeps that returned `Ok`
    pub successful_runs: u64,
    /// Sweeps that returned an error
    pub failed_runs: u64,
    /// Start of the latest sweep
    pub last_run_at: Option<DateTime<Utc>>,
    /// Duration of the latest sweep
    pub last_duration_ms: u64,
    /// Error of the latest failed sweep
    pub last_error: Option<String>,
}

type StatsMap = Arc<RwLock<HashMap<&'static str, WatcherStats>>>;

struct Registration {
    watcher: Arc<dyn Watcher>,
    period: Duration,
}

/// Runs registered [`Watcher`]s until stopped.
///
/// Build it with [`WatcherScheduler::register`], then call
/// [`WatcherScheduler::start`] to spawn the tasks.
pub struct WatcherScheduler {
    registrations: Vec<Registration>,
    run_on_startup: bool,
    stats: StatsMap,
}

impl WatcherScheduler {
    /// Scheduler with no watchers.
    pub fn new(run_on_startup: bool) -> Self {
        Self {
            registrations: Vec::new(),
            run_on_startup,
            stats: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Scheduler configured from the `watchers` section.
    pub fn from_config(config: &WatchersConfig) -> Self {
        Self::new(config.run_on_startup)
    }

    /// Register `watcher` to run every `period`.
    #[must_use]
    pub fn register(mut self, watcher: Arc<dyn Watcher>, period: Duration) -> Self {
        self.registrations.push(Registration { watcher, period });
        self
    }

    /// Number of registered watchers.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Spawn one task per registered watcher.
    pub fn start(self) -> SchedulerHandle {
        let (stop_tx, _) = watch::channel(false);
        let mut tasks = Vec::with_capacity(self.registrations.len());

        for Registration { watcher, period } in self.registrations {
            let stop_rx = stop_tx.subscribe();
            let stats = Arc::clone(&self.stats);
            let run_on_startup = self.run_on_startup;
            tasks.push(tokio::spawn(async move {
                watch_loop(watcher, period, run_on_startup, stats, stop_rx).await;
            }));
        }

        info!(watchers = tasks.len(), "Watcher scheduler started");
        SchedulerHandle {
            stop_tx,
            tasks,
            stats: self.stats,
        }
    }
}

async fn watch_loop(
    watcher: Arc<dyn Watcher>,
    period: Duration,
    run_on_startup: bool,
    stats: StatsMap,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = if run_on_startup {
        interval(period)
    } else {
        interval_at(Instant::now() + period, period)
    };
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        if *stop_rx.borrow() {
            break;
        }
        tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => run_once(watcher.as_ref(), &stats).await,
        }
    }
    info!(watcher = watcher.name(), "Watcher stopped");
}

async fn run_once(watcher: &dyn Watcher, stats: &StatsMap) {
    let name = watcher.name();
    let run_id = Uuid::new_v4();
    let span = info_span!("watcher_run", watcher = name, run_id = %run_id);

    let started = Instant::now();
    let result = watcher.run().instrument(span).await;
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let mut stats = stats.write().await;
    let entry = stats.entry(name).or_default();
    entry.total_runs += 1;
    entry.last_run_at = Some(Utc::now());
    entry.last_duration_ms = duration_ms;

    match result {
        Ok(()) => {
            entry.successful_runs += 1;
            entry.last_error = None;
            info!(watcher = name, %run_id, duration_ms, "Watcher run succeeded");
        }
        Err(err) => {
            entry.failed_runs += 1;
            entry.last_error = Some(err.to_string());
            warn!(watcher = name, %run_id, duration_ms, error = %err, "Watcher run failed");
        }
    }
}

/// Controls a running [`WatcherScheduler`].
pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    stats: StatsMap,
}

impl SchedulerHandle {
    /// Snapshot of the stats of every watcher that has run at least once.
    pub async fn stats(&self) -> HashMap<&'static str, WatcherStats> {
        self.stats.read().await.clone()
    }

    /// Stats of one watcher by name.
    pub async fn watcher_stats(&self, name: &str) -> Option<WatcherStats> {
        self.stats.read().await.get(name).cloned()
    }

    /// Signal every watcher task and wait for in-flight sweeps to finish.
    pub async fn stop(self) {
        self.stop_tx.send_replace(true);
        for task in self.tasks {
            if let Err(err) = task.await {
                warn!(error = %err, "Watcher task ended abnormally");
            }
        }
        info!("Watcher scheduler stopped");
    }
}
