// src/pipeline/supervisor.rs

//! Supervises one polling task per configured bucket.
//!
//! Tasks share nothing but a [`CancellationToken`]. Cancelling it is
//! idempotent and wakes every task; each one finishes its current cycle,
//! if any, and exits. [`Supervisor::shutdown`] returns once every task has
//! exited or the grace period has elapsed, aborting whatever is left.

use std::time::Duration;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::models::{Bucket, WatcherSettings};
use crate::pipeline::cycle::{CycleReport, WatcherDeps, run_cycle};
use crate::pipeline::watcher::{BucketWatcher, WatcherExit, WatcherState};

struct WatcherTask {
    bucket: Bucket,
    state: watch::Receiver<WatcherState>,
    handle: JoinHandle<WatcherExit>,
}

/// Owns the bucket tasks and the shared stop signal.
pub struct Supervisor {
    cancel: CancellationToken,
    tasks: Vec<WatcherTask>,
    grace: Duration,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("task_count", &self.tasks.len())
            .field("grace", &self.grace)
            .field("shutdown_cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl Supervisor {
    /// Spawn one task per bucket. Must be called within a Tokio runtime.
    pub fn start(settings: &WatcherSettings, deps: WatcherDeps) -> Self {
        let cancel = CancellationToken::new();
        let tasks = settings
            .buckets
            .iter()
            .map(|bucket| {
                let watcher = BucketWatcher::new(
                    bucket.clone(),
                    deps.clone(),
                    settings.poll_interval,
                    settings.on_corrupt_snapshot,
                );
                let state = watcher.subscribe();
                let handle = tokio::spawn(watcher.run(cancel.child_token()));
                WatcherTask {
                    bucket: bucket.clone(),
                    state,
                    handle,
                }
            })
            .collect::<Vec<_>>();

        log::info!(
            "Started {} bucket watcher(s), polling every {}",
            tasks.len(),
            humantime::format_duration(settings.poll_interval)
        );

        Self {
            cancel,
            tasks,
            grace: settings.shutdown_grace,
        }
    }

    /// Request every task to stop. Safe to call more than once.
    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            log::info!("Stop requested for {} bucket watcher(s)", self.tasks.len());
        }
        self.cancel.cancel();
    }

    /// Token that stops every task when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Current lifecycle state of every task.
    pub fn states(&self) -> Vec<(Bucket, WatcherState)> {
        self.tasks
            .iter()
            .map(|t| (t.bucket.clone(), *t.state.borrow()))
            .collect()
    }

    /// Stop all tasks and wait for them, at most for the grace period.
    pub async fn shutdown(self) -> ShutdownReport {
        self.stop();
        let deadline = Instant::now() + self.grace;

        let ends = join_all(self.tasks.into_iter().map(|task| async move {
            let WatcherTask {
                bucket, mut handle, ..
            } = task;
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(exit)) => (bucket, TaskEnd::Exited(exit)),
                Ok(Err(e)) => {
                    log::error!("[{}] watcher task failed: {}", bucket, e);
                    (bucket, TaskEnd::Failed)
                }
                Err(_) => {
                    log::warn!("[{}] watcher task timed out during shutdown", bucket);
                    handle.abort();
                    (bucket, TaskEnd::TimedOut)
                }
            }
        }))
        .await;

        let mut report = ShutdownReport::default();
        for (bucket, end) in ends {
            match end {
                TaskEnd::Exited(WatcherExit::Stopped { .. }) => report.stopped.push(bucket),
                TaskEnd::Exited(WatcherExit::Halted { .. }) => report.halted.push(bucket),
                TaskEnd::Failed => report.failed.push(bucket),
                TaskEnd::TimedOut => report.timed_out.push(bucket),
            }
        }

        log::info!("Watcher shutdown complete: {}", report);
        report
    }
}

enum TaskEnd {
    Exited(WatcherExit),
    Failed,
    TimedOut,
}

/// Outcome of a supervisor shutdown, per bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Observed the stop signal and exited
    pub stopped: Vec<Bucket>,
    /// Had already exited because the snapshot could not be loaded
    pub halted: Vec<Bucket>,
    /// Panicked
    pub failed: Vec<Bucket>,
    /// Still running at the end of the grace period and aborted
    pub timed_out: Vec<Bucket>,
}

impl ShutdownReport {
    /// True when no task had to be aborted or failed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.timed_out.is_empty()
    }
}

impl std::fmt::Display for ShutdownReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} stopped, {} halted, {} failed, {} timed out",
            self.stopped.len(),
            self.halted.len(),
            self.failed.len(),
            self.timed_out.len()
        )
    }
}

/// Run exactly one cycle for every bucket concurrently.
///
/// Used for one-shot runs; a bucket whose snapshot cannot be loaded under
/// the halt policy reports that load error.
pub async fn poll_once(
    settings: &WatcherSettings,
    deps: &WatcherDeps,
) -> Vec<(Bucket, Result<CycleReport>)> {
    join_all(settings.buckets.iter().map(|bucket| async move {
        let watcher = BucketWatcher::new(
            bucket.clone(),
            deps.clone(),
            settings.poll_interval,
            settings.on_corrupt_snapshot,
        );
        let result = match watcher.initialize().await {
            Ok(mut snapshot) => run_cycle(bucket, &mut snapshot, deps).await,
            Err(e) => Err(e),
        };
        (bucket.clone(), result)
    }))
    .await
}
