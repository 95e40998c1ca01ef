//! In-memory snapshot store for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::Snapshot;
use crate::storage::{SnapshotRecord, SnapshotStore, StoredSnapshot};

/// Keeps encoded records in a map, so loads go through the real decoder.
#[derive(Debug, Default)]
pub(crate) struct MemorySnapshotStore {
    records: Mutex<HashMap<String, Vec<u8>>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw bytes as a record, valid or not.
    pub fn put_raw(&self, key: &str, bytes: &[u8]) {
        self.records
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Decoded snapshot currently persisted under `key`.
    pub fn persisted(&self, key: &str) -> Option<Snapshot> {
        let bytes = self.records.lock().unwrap().get(key).cloned()?;
        SnapshotRecord::decode(key, &bytes).ok().map(|s| s.snapshot)
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load_stored(&self, key: &str) -> Result<Option<StoredSnapshot>> {
        let bytes = self.records.lock().unwrap().get(key).cloned();
        bytes
            .map(|bytes| SnapshotRecord::decode(key, &bytes))
            .transpose()
    }

    async fn save(&self, key: &str, snapshot: &Snapshot) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(AppError::Io(std::io::Error::other("disk full")));
        }
        let bytes = SnapshotRecord::new(key, snapshot).encode()?;
        self.put_raw(key, &bytes);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
