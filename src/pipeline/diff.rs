//! Diff calculation between two bucket snapshots.
//!
//! Computes the minimal set of added, updated, and removed objects between
//! the previously persisted snapshot and a fresh listing. Content hash
//! equality is the only criterion for "unchanged".
//!
//! Event order is stable: removals and updates first, in the order of the
//! previous snapshot, then additions in the order of the current snapshot.

use crate::models::{ChangeEvent, ChangeKind, Snapshot};

/// Events detected between two snapshots, plus the snapshot to keep.
#[derive(Debug, Clone, Default)]
pub struct DiffResult {
    /// Ordered change events
    pub events: Vec<ChangeEvent>,
    /// The current snapshot; it becomes the baseline of the next cycle
    pub snapshot: Snapshot,
}

impl DiffResult {
    /// Check if there are any changes.
    pub fn has_changes(&self) -> bool {
        !self.events.is_empty()
    }

    /// Get the total number of changes.
    pub fn change_count(&self) -> usize {
        self.events.len()
    }

    /// Number of events of one kind.
    pub fn count(&self, kind: ChangeKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }
}

/// Calculate the diff between the previous and current snapshots.
pub fn calculate_diff(previous: &Snapshot, current: Snapshot) -> DiffResult {
    let mut events = Vec::new();

    for (name, old_hash) in previous.iter() {
        match current.get(name) {
            None => events.push(ChangeEvent::removed(name, old_hash)),
            Some(new_hash) if new_hash != old_hash => {
                events.push(ChangeEvent::updated(name, new_hash))
            }
            Some(_) => {}
        }
    }

    events.extend(
        current
            .iter()
            .filter(|(name, _)| !previous.contains(name))
            .map(|(name, hash)| ChangeEvent::added(name, hash)),
    );

    DiffResult {
        events,
        snapshot: current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn snapshot(pairs: &[(&str, &str)]) -> Snapshot {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_no_changes() {
        let prev = snapshot(&[("a", "h1"), ("b", "h2")]);
        let result = calculate_diff(&prev, prev.clone());
        assert!(!result.has_changes());
        assert_eq!(result.change_count(), 0);
        assert_eq!(result.snapshot, prev);
    }

    #[test]
    fn test_empty_to_full() {
        let curr = snapshot(&[("a", "h1"), ("b", "h2")]);
        let result = calculate_diff(&Snapshot::new(), curr.clone());

        assert_eq!(
            result.events,
            vec![ChangeEvent::added("a", "h1"), ChangeEvent::added("b", "h2")]
        );
        assert_eq!(result.snapshot, curr);
    }

    #[test]
    fn test_full_to_empty() {
        let prev = snapshot(&[("a", "h1")]);
        let result = calculate_diff(&prev, Snapshot::new());
        assert_eq!(result.events, vec![ChangeEvent::removed("a", "h1")]);
        assert!(result.snapshot.is_empty());
    }

    #[test]
    fn test_hash_change_is_single_update() {
        let prev = snapshot(&[("a", "h1")]);
        let curr = snapshot(&[("a", "h2")]);
        let result = calculate_diff(&prev, curr);
        assert_eq!(result.events, vec![ChangeEvent::updated("a", "h2")]);
        assert_eq!(result.count(ChangeKind::Removed), 0);
        assert_eq!(result.count(ChangeKind::Added), 0);
    }

    #[test]
    fn test_mixed_changes_order() {
        let prev = snapshot(&[("keep", "1"), ("gone", "2"), ("edit", "3")]);
        let curr = snapshot(&[("new-b", "9"), ("edit", "4"), ("keep", "1"), ("new-a", "8")]);

        let result = calculate_diff(&prev, curr);
        assert_eq!(
            result.events,
            vec![
                ChangeEvent::removed("gone", "2"),
                ChangeEvent::updated("edit", "4"),
                ChangeEvent::added("new-b", "9"),
                ChangeEvent::added("new-a", "8"),
            ]
        );
        assert_eq!(result.count(ChangeKind::Added), 2);
    }

    fn apply(base: &Snapshot, events: &[ChangeEvent]) -> Snapshot {
        let mut map: std::collections::HashMap<String, String> = base
            .iter()
            .map(|(n, h)| (n.to_string(), h.to_string()))
            .collect();
        for event in events {
            match event.kind {
                ChangeKind::Removed => {
                    map.remove(&event.object_name);
                }
                ChangeKind::Added | ChangeKind::Updated => {
                    map.insert(event.object_name.clone(), event.content_hash.clone());
                }
            }
        }
        map.into_iter().collect()
    }

    fn arb_snapshot() -> impl Strategy<Value = Snapshot> {
        prop::collection::vec(("[a-e]{1,2}", "[xyz]"), 0..12)
            .prop_map(|pairs| pairs.into_iter().collect())
    }

    proptest! {
        #[test]
        fn prop_same_snapshot_has_no_events(s in arb_snapshot()) {
            let result = calculate_diff(&s, s.clone());
            prop_assert!(result.events.is_empty());
        }

        #[test]
        fn prop_events_transform_old_into_new(old in arb_snapshot(), new in arb_snapshot()) {
            let result = calculate_diff(&old, new.clone());
            prop_assert_eq!(apply(&old, &result.events), new.clone());
            prop_assert_eq!(result.snapshot, new);
        }

        #[test]
        fn prop_at_most_one_event_per_object(old in arb_snapshot(), new in arb_snapshot()) {
            let result = calculate_diff(&old, new);
            let mut names = std::collections::HashSet::new();
            for event in &result.events {
                prop_assert!(names.insert(event.object_name.clone()));
            }
        }
    }
}
