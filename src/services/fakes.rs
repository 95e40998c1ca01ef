//! Scripted lister and recording notifier for pipeline tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{Bucket, ChangeEvent, Snapshot};
use crate::services::{Notifier, ObjectLister};

/// Per-bucket listing outcome.
#[derive(Debug, Clone)]
pub(crate) enum Listing {
    Objects(Snapshot),
    Fail(String),
}

/// Returns scripted listings per bucket name; the last one repeats.
#[derive(Debug, Default)]
pub(crate) struct ScriptedLister {
    scripts: Mutex<HashMap<String, VecDeque<Listing>>>,
}

impl ScriptedLister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, bucket: &str, listing: Listing) {
        self.scripts
            .lock()
            .unwrap()
            .entry(bucket.to_string())
            .or_default()
            .push_back(listing);
    }

    pub fn push_objects(&self, bucket: &str, pairs: &[(&str, &str)]) {
        self.push(bucket, Listing::Objects(pairs.iter().copied().collect()));
    }
}

#[async_trait]
impl ObjectLister for ScriptedLister {
    async fn list(&self, bucket: &Bucket) -> Result<Snapshot> {
        let listing = {
            let mut scripts = self.scripts.lock().unwrap();
            let queue = scripts.entry(bucket.name.clone()).or_default();
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        };
        match listing {
            Some(Listing::Objects(snapshot)) => Ok(snapshot),
            Some(Listing::Fail(message)) => Err(AppError::listing(bucket.name.clone(), message)),
            None => Ok(Snapshot::new()),
        }
    }
}

/// Records every notification; can be told to fail specific objects.
#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    sent: Mutex<Vec<(Bucket, ChangeEvent)>>,
    failing_objects: Mutex<Vec<String>>,
    fail_all: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_object(&self, name: &str) {
        self.failing_objects.lock().unwrap().push(name.to_string());
    }

    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Events attempted for one bucket, in order.
    pub fn sent_for(&self, bucket: &str) -> Vec<ChangeEvent> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(b, _)| b.name == bucket)
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, bucket: &Bucket, event: &ChangeEvent) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((bucket.clone(), event.clone()));

        let fails = self.fail_all.load(Ordering::SeqCst)
            || self
                .failing_objects
                .lock()
                .unwrap()
                .contains(&event.object_name);
        if fails {
            return Err(AppError::Webhook {
                status: 503,
                url: "http://test/hook".to_string(),
            });
        }
        Ok(())
    }
}
