// src/services/webhook.rs

//! Webhook delivery of change events.
//!
//! One POST per event with a JSON body; no batching, no retry. A non-2xx
//! answer or a transport failure is returned to the caller, which logs it
//! and moves on.

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Bucket, ChangeEvent};

/// Delivers a single change event.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, bucket: &Bucket, event: &ChangeEvent) -> Result<()>;
}

/// Posts events to a configured HTTP endpoint.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: Url,
}

impl WebhookNotifier {
    pub fn new(client: Client, url: Url) -> Self {
        Self { client, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, bucket: &Bucket, event: &ChangeEvent) -> Result<()> {
        let payload = event.payload(bucket);
        log::debug!(
            "[{}] posting {} {} to {}",
            bucket,
            event.kind,
            event.object_name,
            self.url
        );

        let response = self
            .client
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Webhook {
                status: status.as_u16(),
                url: self.url.to_string(),
            });
        }
        Ok(())
    }
}
