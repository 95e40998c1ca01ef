// src/models/mod.rs

//! Domain models for the watcher.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod bucket;
mod config;
mod event;
mod snapshot;

// Re-export all public types
pub use bucket::Bucket;
pub use config::{
    Config, CorruptSnapshotPolicy, HttpConfig, MAX_BUCKETS, ShutdownConfig, StateBackend,
    StateConfig, StorageConfig, WatcherSettings, parse_duration,
};
pub use event::{ChangeEvent, ChangeKind, WebhookPayload};
pub use snapshot::{ObjectEntry, Snapshot};
