// src/services/lister.rs

//! Object listing.
//!
//! A [`ListingBackend`] fetches one page of `(name, hash)` pairs at a time;
//! [`PagedLister`] follows continuation tokens until the backend stops
//! returning one and merges every page into a single [`Snapshot`].
//! Any page failure aborts the whole listing, and nothing is retried here.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Bucket, ObjectEntry, Snapshot};

/// One page of a bucket listing.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub objects: Vec<ObjectEntry>,
    /// Token for the next page; `None` or empty means the listing is complete
    pub next_token: Option<String>,
}

/// Storage API able to list one page of a bucket.
#[async_trait]
pub trait ListingBackend: Send + Sync {
    async fn list_page(&self, bucket: &Bucket, token: Option<&str>) -> Result<ListPage>;
}

/// Produces the complete listing of a bucket.
#[async_trait]
pub trait ObjectLister: Send + Sync {
    async fn list(&self, bucket: &Bucket) -> Result<Snapshot>;
}

/// Lister that pages through a [`ListingBackend`].
#[derive(Debug, Clone)]
pub struct PagedLister<B> {
    backend: B,
}

impl<B: ListingBackend> PagedLister<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl<B: ListingBackend> ObjectLister for PagedLister<B> {
    async fn list(&self, bucket: &Bucket) -> Result<Snapshot> {
        let mut snapshot = Snapshot::new();
        let mut token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.backend.list_page(bucket, token.as_deref()).await?;
            pages += 1;
            snapshot.extend(page.objects.into_iter().map(|o| (o.name, o.hash)));

            match page.next_token.filter(|t| !t.is_empty()) {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        log::debug!(
            "[{}] listed {} objects in {} page(s)",
            bucket,
            snapshot.len(),
            pages
        );
        Ok(snapshot)
    }
}
