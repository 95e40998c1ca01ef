//! AWS S3 snapshot storage.
//!
//! Stores one record per bucket at `{prefix}/{namespace}/{bucket}.json`.
//! A PUT replaces the whole object, so readers never observe a partial record.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;

use crate::error::{AppError, Result};
use crate::models::Snapshot;
use crate::storage::{SnapshotRecord, SnapshotStore, StoredSnapshot};

/// S3-based snapshot storage.
#[derive(Debug, Clone)]
pub struct S3SnapshotStore {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3SnapshotStore {
    /// Create a new S3 snapshot store.
    pub fn new(client: Client, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    fn object_key(&self, key: &str) -> String {
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("{key}.json")
        } else {
            format!("{prefix}/{key}.json")
        }
    }

    /// Read an object, returning None if it does not exist.
    async fn read_bytes_optional(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let bytes = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| AppError::S3(format!("reading s3://{}/{key}: {e}", self.bucket)))?;
                Ok(Some(bytes.into_bytes().to_vec()))
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    log::debug!("No existing snapshot at s3://{}/{}", self.bucket, key);
                    Ok(None)
                } else {
                    Err(AppError::S3(DisplayErrorContext(&service_err).to_string()))
                }
            }
        }
    }

    async fn write_bytes(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| AppError::S3(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for S3SnapshotStore {
    async fn load_stored(&self, key: &str) -> Result<Option<StoredSnapshot>> {
        let object_key = self.object_key(key);
        match self.read_bytes_optional(&object_key).await? {
            Some(bytes) => SnapshotRecord::decode(key, &bytes).map(Some),
            None => Ok(None),
        }
    }

    async fn save(&self, key: &str, snapshot: &Snapshot) -> Result<()> {
        let object_key = self.object_key(key);
        let bytes = SnapshotRecord::new(key, snapshot).encode()?;
        self.write_bytes(&object_key, bytes).await?;
        log::debug!(
            "Saved {} objects to s3://{}/{}",
            snapshot.len(),
            self.bucket,
            object_key
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(prefix: &str) -> S3SnapshotStore {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new("us-east-1"))
            .build();
        S3SnapshotStore::new(Client::from_conf(config), "state", prefix)
    }

    #[test]
    fn test_object_key_layout() {
        assert_eq!(store("snapshots").object_key("ns/logs"), "snapshots/ns/logs.json");
        assert_eq!(store("/snapshots/").object_key("ns/logs"), "snapshots/ns/logs.json");
        assert_eq!(store("").object_key("ns/logs"), "ns/logs.json");
    }
}
