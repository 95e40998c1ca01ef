//! Snapshot of a bucket's objects.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One listed object: its name and opaque content hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectEntry {
    pub name: String,
    pub hash: String,
}

/// Complete mapping of object name to content hash for one bucket.
///
/// Names are unique. Iteration follows insertion order, so a snapshot built
/// from a listing replays objects in the order the backend returned them.
/// Equality compares the mapping only, not the order.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: Vec<ObjectEntry>,
    index: HashMap<String, usize>,
}

impl Snapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an object's hash.
    ///
    /// Replacing keeps the object's original position.
    /// Returns the previous hash, if any.
    pub fn insert(&mut self, name: impl Into<String>, hash: impl Into<String>) -> Option<String> {
        let name = name.into();
        let hash = hash.into();
        match self.index.get(&name) {
            Some(&pos) => Some(std::mem::replace(&mut self.entries[pos].hash, hash)),
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push(ObjectEntry { name, hash });
                None
            }
        }
    }

    /// Content hash for an object name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.index
            .get(name)
            .map(|&pos| self.entries[pos].hash.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(name, hash)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|e| (e.name.as_str(), e.hash.as_str()))
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[ObjectEntry] {
        &self.entries
    }

    /// Build a snapshot from entries that must not repeat a name.
    ///
    /// Returns the first duplicated name on failure.
    pub fn try_from_entries(entries: Vec<ObjectEntry>) -> std::result::Result<Self, String> {
        let mut snapshot = Self::new();
        for entry in entries {
            if snapshot.contains(&entry.name) {
                return Err(entry.name);
            }
            snapshot.insert(entry.name, entry.hash);
        }
        Ok(snapshot)
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(name, hash)| other.get(name) == Some(hash))
    }
}

impl Eq for Snapshot {}

impl<N: Into<String>, H: Into<String>> FromIterator<(N, H)> for Snapshot {
    /// Later duplicates overwrite earlier hashes.
    fn from_iter<I: IntoIterator<Item = (N, H)>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for (name, hash) in iter {
            snapshot.insert(name, hash);
        }
        snapshot
    }
}

impl<N: Into<String>, H: Into<String>> Extend<(N, H)> for Snapshot {
    fn extend<I: IntoIterator<Item = (N, H)>>(&mut self, iter: I) {
        for (name, hash) in iter {
            self.insert(name, hash);
        }
    }
}
