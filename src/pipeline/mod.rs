//! Watcher pipeline.
//!
//! - `diff`: compare two snapshots into change events
//! - `cycle`: one list → diff → notify → persist pass for a bucket
//! - `watcher`: per-bucket polling task
//! - `supervisor`: starts, stops and awaits all bucket tasks

pub mod cycle;
pub mod diff;
pub mod supervisor;
pub mod watcher;

pub use cycle::{CycleReport, WatcherDeps, run_cycle};
pub use diff::{DiffResult, calculate_diff};
pub use supervisor::{ShutdownReport, Supervisor, poll_once};
pub use watcher::{BucketWatcher, WatcherExit, WatcherState};
