//! Service layer for the watcher.
//!
//! Provides the external collaborators a bucket cycle talks to:
//! the object lister and the webhook notifier.

#[cfg(test)]
pub(crate) mod fakes;
pub mod lister;
#[cfg(feature = "s3")]
pub mod s3;
pub mod webhook;

pub use lister::{ListPage, ListingBackend, ObjectLister, PagedLister};
#[cfg(feature = "s3")]
pub use s3::{S3ListingBackend, build_client};
pub use webhook::{Notifier, WebhookNotifier};
