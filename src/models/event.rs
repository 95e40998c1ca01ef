//! Change events and their webhook payload.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Bucket;

/// Kind of change detected between two snapshots.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    #[serde(rename = "NEW")]
    Added,
    #[serde(rename = "DELETE")]
    Removed,
    #[serde(rename = "UPDATE")]
    Updated,
}

impl ChangeKind {
    /// Wire name used in the webhook payload.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Added => "NEW",
            ChangeKind::Removed => "DELETE",
            ChangeKind::Updated => "UPDATE",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single detected difference for one object.
///
/// `content_hash` is the new hash for added/updated objects and the
/// last known hash for removed ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub object_name: String,
    pub content_hash: String,
}

impl ChangeEvent {
    pub fn added(name: impl Into<String>, hash: impl Into<String>) -> Self {
        Self::new(ChangeKind::Added, name, hash)
    }

    pub fn removed(name: impl Into<String>, hash: impl Into<String>) -> Self {
        Self::new(ChangeKind::Removed, name, hash)
    }

    pub fn updated(name: impl Into<String>, hash: impl Into<String>) -> Self {
        Self::new(ChangeKind::Updated, name, hash)
    }

    fn new(kind: ChangeKind, name: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            kind,
            object_name: name.into(),
            content_hash: hash.into(),
        }
    }

    /// Attach the bucket identity to build the webhook body.
    pub fn payload(&self, bucket: &Bucket) -> WebhookPayload {
        WebhookPayload {
            namespace: bucket.namespace.clone(),
            bucket: bucket.name.clone(),
            object_name: self.object_name.clone(),
            content_hash: self.content_hash.clone(),
            kind: self.kind,
        }
    }
}

/// JSON body posted to the webhook, one per event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub namespace: String,
    pub bucket: String,
    pub object_name: String,
    pub content_hash: String,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
}
