// src/pipeline/watcher.rs

//! Per-bucket polling task.
//!
//! ```text
//! Initializing ──load ok──▶ Polling ──stop observed──▶ Stopped
//!      │                      ▲   │
//!      │                      └───┘ tick: run one cycle
//!      └──load failed (halt policy)──────────────────▶ Stopped
//! ```
//!
//! The stop signal is only checked between ticks; a cycle in progress
//! always runs to completion.

use std::fmt;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::models::{Bucket, CorruptSnapshotPolicy, Snapshot};
use crate::pipeline::cycle::{WatcherDeps, run_cycle};

/// Lifecycle state of a bucket task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Initializing,
    Polling,
    Stopped,
}

impl fmt::Display for WatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WatcherState::Initializing => "initializing",
            WatcherState::Polling => "polling",
            WatcherState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// How a bucket task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatcherExit {
    /// Observed the stop signal after `cycles` completed cycles
    Stopped { cycles: u64 },
    /// Never polled because the snapshot could not be loaded
    Halted { reason: String },
}

/// Owns one bucket's snapshot and timer.
#[derive(Debug)]
pub struct BucketWatcher {
    bucket: Bucket,
    deps: WatcherDeps,
    poll_interval: Duration,
    policy: CorruptSnapshotPolicy,
    state: watch::Sender<WatcherState>,
}

impl BucketWatcher {
    pub fn new(
        bucket: Bucket,
        deps: WatcherDeps,
        poll_interval: Duration,
        policy: CorruptSnapshotPolicy,
    ) -> Self {
        let (state, _) = watch::channel(WatcherState::Initializing);
        Self {
            bucket,
            deps,
            poll_interval,
            policy,
            state,
        }
    }

    pub fn bucket(&self) -> &Bucket {
        &self.bucket
    }

    /// Observe this task's lifecycle state.
    pub fn subscribe(&self) -> watch::Receiver<WatcherState> {
        self.state.subscribe()
    }

    /// Load the baseline snapshot, applying the corrupt-snapshot policy.
    pub async fn initialize(&self) -> Result<Snapshot> {
        match self.deps.store.load(&self.bucket.key()).await {
            Ok(snapshot) => {
                log::info!(
                    "[{}] loaded snapshot with {} objects",
                    self.bucket,
                    snapshot.len()
                );
                Ok(snapshot)
            }
            Err(e) if self.policy == CorruptSnapshotPolicy::Reset => {
                log::warn!(
                    "[{}] unreadable snapshot ({}), starting from empty",
                    self.bucket,
                    e
                );
                Ok(Snapshot::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Run until `cancel` fires. The first cycle starts one interval in.
    pub async fn run(self, cancel: CancellationToken) -> WatcherExit {
        let mut snapshot = match self.initialize().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::error!(
                    "[{}] cannot load snapshot, not polling this bucket: {}",
                    self.bucket,
                    e
                );
                self.state.send_replace(WatcherState::Stopped);
                return WatcherExit::Halted {
                    reason: e.to_string(),
                };
            }
        };

        self.state.send_replace(WatcherState::Polling);
        log::info!(
            "[{}] polling every {}",
            self.bucket,
            humantime::format_duration(self.poll_interval)
        );

        let first_tick = Instant::now() + self.poll_interval;
        let mut ticker = tokio::time::interval_at(first_tick, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match run_cycle(&self.bucket, &mut snapshot, &self.deps).await {
                Ok(_) => cycles += 1,
                Err(e) => log::warn!("[{}] cycle aborted: {}", self.bucket, e),
            }
        }

        self.state.send_replace(WatcherState::Stopped);
        log::info!("[{}] stopped after {} cycles", self.bucket, cycles);
        WatcherExit::Stopped { cycles }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::ChangeEvent;
    use crate::services::fakes::{Listing, RecordingNotifier, ScriptedLister};
    use crate::storage::SnapshotStore;
    use crate::storage::memory::MemorySnapshotStore;

    const INTERVAL: Duration = Duration::from_secs(10);

    fn setup() -> (
        Arc<ScriptedLister>,
        Arc<MemorySnapshotStore>,
        Arc<RecordingNotifier>,
        WatcherDeps,
    ) {
        let lister = Arc::new(ScriptedLister::new());
        let store = Arc::new(MemorySnapshotStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let deps = WatcherDeps {
            lister: lister.clone(),
            store: store.clone(),
            notifier: notifier.clone(),
        };
        (lister, store, notifier, deps)
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_on_interval_until_stopped() {
        let (lister, store, notifier, deps) = setup();
        lister.push_objects("logs", &[("x.txt", "aaa"), ("y.txt", "bbb")]);
        lister.push_objects("logs", &[("x.txt", "aaa")]);

        let watcher = BucketWatcher::new(
            Bucket::new("ns", "logs"),
            deps,
            INTERVAL,
            CorruptSnapshotPolicy::Halt,
        );
        let mut state = watcher.subscribe();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(watcher.run(cancel.clone()));

        state
            .wait_for(|s| *s == WatcherState::Polling)
            .await
            .unwrap();
        // Nothing happens before the first interval elapses.
        assert!(notifier.sent_for("logs").is_empty());

        tokio::time::sleep(INTERVAL + Duration::from_millis(1)).await;
        assert_eq!(notifier.sent_for("logs").len(), 2);

        tokio::time::sleep(INTERVAL).await;
        assert_eq!(
            notifier.sent_for("logs")[2..],
            [ChangeEvent::removed("y.txt", "bbb")]
        );
        let expected: Snapshot = [("x.txt", "aaa")].into_iter().collect();
        assert_eq!(store.persisted("ns/logs"), Some(expected));

        cancel.cancel();
        let exit = handle.await.unwrap();
        assert_eq!(exit, WatcherExit::Stopped { cycles: 2 });
        assert_eq!(*state.borrow(), WatcherState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resumes_from_persisted_snapshot() {
        let (lister, store, notifier, deps) = setup();
        let previous: Snapshot = [("x.txt", "aaa"), ("y.txt", "bbb")].into_iter().collect();
        store.save("ns/logs", &previous).await.unwrap();
        lister.push_objects("logs", &[("x.txt", "ccc"), ("y.txt", "bbb")]);

        let watcher = BucketWatcher::new(
            Bucket::new("ns", "logs"),
            deps,
            INTERVAL,
            CorruptSnapshotPolicy::Halt,
        );
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(watcher.run(cancel.clone()));

        tokio::time::sleep(INTERVAL + Duration::from_millis(1)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(
            notifier.sent_for("logs"),
            vec![ChangeEvent::updated("x.txt", "ccc")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_corrupt_snapshot_halts_with_default_policy() {
        let (lister, store, notifier, deps) = setup();
        store.put_raw("ns/logs", b"garbage");
        lister.push_objects("logs", &[("a", "1")]);

        let watcher = BucketWatcher::new(
            Bucket::new("ns", "logs"),
            deps,
            INTERVAL,
            CorruptSnapshotPolicy::Halt,
        );
        let exit = watcher.run(CancellationToken::new()).await;

        assert!(matches!(exit, WatcherExit::Halted { .. }));
        assert!(notifier.sent_for("logs").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_corrupt_snapshot_resets_with_reset_policy() {
        let (lister, store, notifier, deps) = setup();
        store.put_raw("ns/logs", b"garbage");
        lister.push_objects("logs", &[("a", "1")]);

        let watcher = BucketWatcher::new(
            Bucket::new("ns", "logs"),
            deps,
            INTERVAL,
            CorruptSnapshotPolicy::Reset,
        );
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(watcher.run(cancel.clone()));

        tokio::time::sleep(INTERVAL + Duration::from_millis(1)).await;
        cancel.cancel();

        assert_eq!(handle.await.unwrap(), WatcherExit::Stopped { cycles: 1 });
        assert_eq!(notifier.sent_for("logs"), vec![ChangeEvent::added("a", "1")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_listing_failure_retries_from_same_baseline() {
        let (lister, _store, notifier, deps) = setup();
        lister.push("logs", Listing::Fail("timeout".into()));
        lister.push_objects("logs", &[("a", "1")]);

        let watcher = BucketWatcher::new(
            Bucket::new("ns", "logs"),
            deps,
            INTERVAL,
            CorruptSnapshotPolicy::Halt,
        );
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(watcher.run(cancel.clone()));

        tokio::time::sleep(INTERVAL + Duration::from_millis(1)).await;
        assert!(notifier.sent_for("logs").is_empty());

        tokio::time::sleep(INTERVAL).await;
        assert_eq!(notifier.sent_for("logs"), vec![ChangeEvent::added("a", "1")]);

        cancel.cancel();
        // Only the successful cycle counts.
        assert_eq!(handle.await.unwrap(), WatcherExit::Stopped { cycles: 1 });
    }
}
