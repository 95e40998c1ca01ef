// src/lib.rs

//! Object storage watcher library.
//!
//! Polls object storage buckets, diffs each listing against the last
//! persisted snapshot and POSTs one webhook per detected change.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
