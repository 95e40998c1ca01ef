//! Local filesystem snapshot storage.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! └── {namespace}/
//!     ├── logs.json         # one versioned record per bucket
//!     └── uploads.json
//! ```
//!
//! Records are replaced with write-to-temp + rename, so a crash mid-write
//! leaves either the old record or the new one, never a truncated file.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::Snapshot;
use crate::storage::{SnapshotRecord, SnapshotStore, StoredSnapshot};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalSnapshotStore {
    root_dir: PathBuf,
}

impl LocalSnapshotStore {
    /// Create a new store rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Record path for a bucket key. Keys must stay inside the root.
    fn path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = key.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(AppError::validation(format!(
                "invalid snapshot key '{key}'"
            )));
        }
        Ok(self.root_dir.join(format!("{key}.json")))
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl SnapshotStore for LocalSnapshotStore {
    async fn load_stored(&self, key: &str) -> Result<Option<StoredSnapshot>> {
        let path = self.path(key)?;
        match self.read_bytes(&path).await? {
            Some(bytes) => SnapshotRecord::decode(key, &bytes).map(Some),
            None => {
                log::debug!("No snapshot at {}", path.display());
                Ok(None)
            }
        }
    }

    async fn save(&self, key: &str, snapshot: &Snapshot) -> Result<()> {
        let path = self.path(key)?;
        let bytes = SnapshotRecord::new(key, snapshot).encode()?;
        self.write_bytes(&path, &bytes).await?;
        log::debug!(
            "Saved {} objects to {}",
            snapshot.len(),
            path.display()
        );
        Ok(())
    }
}
