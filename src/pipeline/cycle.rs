// src/pipeline/cycle.rs

//! One poll cycle for one bucket: list → diff → notify → persist.
//!
//! Failure handling per step:
//! - listing fails: the cycle aborts, nothing is notified or persisted
//! - a delivery fails: logged and counted, the remaining events still go out
//! - persisting fails: logged; the in-memory snapshot still advances

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::models::{Bucket, ChangeKind, Snapshot};
use crate::pipeline::diff::calculate_diff;
use crate::services::{Notifier, ObjectLister};
use crate::storage::SnapshotStore;

/// Collaborators shared by every bucket task.
#[derive(Clone)]
pub struct WatcherDeps {
    pub lister: Arc<dyn ObjectLister>,
    pub store: Arc<dyn SnapshotStore>,
    pub notifier: Arc<dyn Notifier>,
}

impl fmt::Debug for WatcherDeps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatcherDeps").finish_non_exhaustive()
    }
}

/// Summary of a completed cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    /// Events the webhook did not accept
    pub failed_deliveries: usize,
    /// Whether the new snapshot reached the store
    pub persisted: bool,
    /// Objects in the bucket after this cycle
    pub object_count: usize,
}

impl CycleReport {
    pub fn change_count(&self) -> usize {
        self.added + self.updated + self.removed
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} added, {} updated, {} removed, {} failed deliveries, {} objects{}",
            self.added,
            self.updated,
            self.removed,
            self.failed_deliveries,
            self.object_count,
            if self.persisted { "" } else { " (not persisted)" }
        )
    }
}

/// Run one cycle, advancing `snapshot` to the new listing on success.
///
/// Returns an error only when the listing fails; `snapshot` is then untouched.
pub async fn run_cycle(
    bucket: &Bucket,
    snapshot: &mut Snapshot,
    deps: &WatcherDeps,
) -> Result<CycleReport> {
    let listing = deps.lister.list(bucket).await?;

    let diff = calculate_diff(snapshot, listing);
    let mut report = CycleReport {
        added: diff.count(ChangeKind::Added),
        updated: diff.count(ChangeKind::Updated),
        removed: diff.count(ChangeKind::Removed),
        object_count: diff.snapshot.len(),
        ..CycleReport::default()
    };

    for event in &diff.events {
        if let Err(e) = deps.notifier.notify(bucket, event).await {
            report.failed_deliveries += 1;
            log::warn!(
                "[{}] failed to deliver {} {}: {}",
                bucket,
                event.kind,
                event.object_name,
                e
            );
        }
    }

    *snapshot = diff.snapshot;

    match deps.store.save(&bucket.key(), snapshot).await {
        Ok(()) => report.persisted = true,
        Err(e) => log::error!("[{}] failed to persist snapshot: {}", bucket, e),
    }

    if report.change_count() > 0 || report.failed_deliveries > 0 {
        log::info!("[{}] cycle: {}", bucket, report);
    } else {
        log::debug!("[{}] cycle: no changes ({} objects)", bucket, report.object_count);
    }
    Ok(report)
}
