//! Shared sweep plumbing for watchers.
//!
//! A sweep walks every environment and rule once. It is bounded by a deadline
//! that aborts in-flight remote calls, never stops on a per-item error, and
//! reports the most recent error it saw.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::domain::errors::{DomainResult, EngineError};

/// One periodic job, invoked by the scheduler on a cadence.
#[async_trait]
pub trait Watcher: Send + Sync {
    /// Stable name used in logs and scheduler stats.
    fn name(&self) -> &'static str;

    /// Perform one full sweep.
    ///
    /// Returns the last error encountered, if any; the sweep itself always
    /// runs to completion or to its deadline.
    async fn run(&self) -> DomainResult<()>;
}

/// Deadline shared by every remote call made during one sweep.
#[derive(Debug, Clone, Copy)]
pub struct SweepContext {
    deadline: Instant,
}

impl SweepContext {
    /// Context whose deadline is `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
        }
    }

    /// True once the deadline has passed.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Run `fut`, failing with [`EngineError::DeadlineExceeded`] if the sweep
    /// deadline passes first.
    pub async fn call<T, F>(&self, fut: F) -> DomainResult<T>
    where
        F: Future<Output = DomainResult<T>>,
    {
        tokio::time::timeout_at(self.deadline, fut)
            .await
            .unwrap_or(Err(EngineError::DeadlineExceeded))
    }
}

/// Last-error-wins accumulator.
///
/// Only the most recent error is returned to the caller; `failures` keeps the
/// count so the completion log shows how many items failed.
#[derive(Debug, Default)]
pub struct SweepErrors {
    last: Option<EngineError>,
    failures: usize,
}

impl SweepErrors {
    /// Count `err` and make it the reported error.
    pub fn record(&mut self, err: EngineError) {
        self.failures += 1;
        self.last = Some(err);
    }

    /// Number of recorded errors.
    pub const fn failures(&self) -> usize {
        self.failures
    }

    /// Most recently recorded error.
    pub const fn last(&self) -> Option<&EngineError> {
        self.last.as_ref()
    }

    /// `Err` with the last error, `Ok` when nothing was recorded.
    pub fn into_result(self) -> DomainResult<()> {
        self.last.map_or(Ok(()), Err)
    }
}

/// Counters reported when a sweep finishes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    /// Environments visited
    pub environments: usize,
    /// Rules or rollouts looked at
    pub assessed: usize,
    /// Execute calls that succeeded
    pub triggered: usize,
}
