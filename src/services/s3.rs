//! S3 `ListObjectsV2` listing backend.
//!
//! The object's ETag serves as its content hash. For single-part uploads it
//! is the MD5 of the content; for multipart uploads it still changes whenever
//! the object is rewritten, which is all change detection needs.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;

use crate::error::{AppError, Result};
use crate::models::{Bucket, ObjectEntry, StorageConfig};
use crate::services::lister::{ListPage, ListingBackend};

/// Objects requested per listing page.
const PAGE_SIZE: i32 = 1000;

/// Build an S3 client from the SDK default chain plus config overrides.
///
/// `timeout` bounds each operation, retries included.
pub async fn build_client(config: &StorageConfig, timeout: Duration) -> Client {
    let timeouts = TimeoutConfig::builder().operation_timeout(timeout).build();
    let mut loader =
        aws_config::defaults(aws_config::BehaviorVersion::latest()).timeout_config(timeouts);
    if let Some(region) = &config.region {
        loader = loader.region(aws_config::Region::new(region.clone()));
    }
    let shared = loader.load().await;

    let mut builder = aws_sdk_s3::config::Builder::from(&shared);
    if let Some(endpoint) = &config.endpoint {
        builder = builder.endpoint_url(endpoint);
    }
    if config.force_path_style {
        builder = builder.force_path_style(true);
    }
    Client::from_conf(builder.build())
}

/// Lists bucket pages through the S3 API.
#[derive(Debug, Clone)]
pub struct S3ListingBackend {
    client: Client,
}

impl S3ListingBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ListingBackend for S3ListingBackend {
    async fn list_page(&self, bucket: &Bucket, token: Option<&str>) -> Result<ListPage> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&bucket.name)
            .max_keys(PAGE_SIZE)
            .set_continuation_token(token.map(str::to_string))
            .send()
            .await
            .map_err(|e| AppError::listing(bucket.to_string(), DisplayErrorContext(&e)))?;

        let objects = output
            .contents()
            .iter()
            .filter_map(|object| {
                let name = object.key()?;
                let hash = object.e_tag().map(normalize_etag).unwrap_or_default();
                Some(ObjectEntry {
                    name: name.to_string(),
                    hash,
                })
            })
            .collect();

        let next_token = if output.is_truncated().unwrap_or(false) {
            output.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(ListPage {
            objects,
            next_token,
        })
    }
}

/// Strip the quotes S3 puts around ETags.
fn normalize_etag(etag: &str) -> String {
    etag.trim_matches('"').to_string()
}
