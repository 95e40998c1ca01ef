//! Snapshot persistence.
//!
//! Each bucket has exactly one persisted record, keyed by `Bucket::key()`.
//! Records are versioned JSON so that newer builds keep reading older ones:
//!
//! ```text
//! {
//!   "version": 1,
//!   "key": "namespace/bucket",
//!   "updated_at": "2026-01-01T00:00:00Z",
//!   "checksum": "<sha256 hex of the ordered entries>",
//!   "objects": [{ "name": "x.txt", "hash": "aaa" }, ...]
//! }
//! ```
//!
//! Backends:
//! - [`LocalSnapshotStore`]: one file per bucket, replaced atomically
//! - `S3SnapshotStore`: one object per bucket (feature `s3`)

pub mod local;
#[cfg(test)]
pub(crate) mod memory;
#[cfg(feature = "s3")]
pub mod s3;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};
use crate::models::{ObjectEntry, Snapshot};

// Re-export for convenience
pub use local::LocalSnapshotStore;
#[cfg(feature = "s3")]
pub use s3::S3SnapshotStore;

/// Newest record format this build writes and understands.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A decoded snapshot together with its persistence metadata.
#[derive(Debug, Clone)]
pub struct StoredSnapshot {
    pub snapshot: Snapshot,
    pub updated_at: DateTime<Utc>,
}

/// Trait for snapshot storage backends.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the persisted snapshot, or `None` if nothing was ever saved.
    ///
    /// A record that exists but cannot be decoded is an error.
    async fn load_stored(&self, key: &str) -> Result<Option<StoredSnapshot>>;

    /// Persist the full snapshot, replacing the previous record atomically.
    async fn save(&self, key: &str, snapshot: &Snapshot) -> Result<()>;

    /// Load the persisted snapshot; a missing record yields an empty one.
    async fn load(&self, key: &str) -> Result<Snapshot> {
        Ok(self
            .load_stored(key)
            .await?
            .map(|stored| stored.snapshot)
            .unwrap_or_default())
    }
}

/// On-disk representation of a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub version: u32,
    pub key: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub checksum: Option<String>,
    pub objects: Vec<ObjectEntry>,
}

impl SnapshotRecord {
    pub fn new(key: &str, snapshot: &Snapshot) -> Self {
        let objects = snapshot.entries().to_vec();
        Self {
            version: SNAPSHOT_FORMAT_VERSION,
            key: key.to_string(),
            updated_at: Utc::now(),
            checksum: Some(checksum(&objects)),
            objects,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Decode and verify a persisted record.
    pub fn decode(key: &str, bytes: &[u8]) -> Result<StoredSnapshot> {
        let record: SnapshotRecord =
            serde_json::from_slice(bytes).map_err(|e| AppError::corrupt_snapshot(key, e))?;

        if record.version == 0 || record.version > SNAPSHOT_FORMAT_VERSION {
            return Err(AppError::corrupt_snapshot(
                key,
                format!("unsupported format version {}", record.version),
            ));
        }

        if let Some(expected) = &record.checksum {
            let actual = checksum(&record.objects);
            if &actual != expected {
                return Err(AppError::corrupt_snapshot(
                    key,
                    format!("checksum mismatch (expected {expected}, got {actual})"),
                ));
            }
        }

        let snapshot = Snapshot::try_from_entries(record.objects).map_err(|name| {
            AppError::corrupt_snapshot(key, format!("duplicate object name {name}"))
        })?;

        Ok(StoredSnapshot {
            snapshot,
            updated_at: record.updated_at,
        })
    }
}

/// Hex SHA-256 over the ordered `(name, hash)` entries.
fn checksum(entries: &[ObjectEntry]) -> String {
    let mut hasher = Sha256::new();
    for entry in entries {
        hasher.update(entry.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(entry.hash.as_bytes());
        hasher.update([b'\n']);
    }
    hex::encode(hasher.finalize())
}
