//! Unique identifiers for remote temp files and scheduled task names.

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Produces unique tokens for remote file names and task names.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Time-ordered UUIDs (version 7), so remote temp files sort by creation time.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeOrderedIds;

impl IdGenerator for TimeOrderedIds {
    fn next_id(&self) -> String {
        Uuid::now_v7().to_string()
    }
}

/// Deterministic ids (`<prefix>1`, `<prefix>2`, ...) for tests and dry runs.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}{}", self.prefix, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn time_ordered_ids_are_unique() {
        let ids = TimeOrderedIds;
        let seen: HashSet<String> = (0..1000).map(|_| ids.next_id()).collect();
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn time_ordered_ids_sort_by_creation() {
        let ids = TimeOrderedIds;
        let first = ids.next_id();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = ids.next_id();
        assert!(first < second);
    }

    #[test]
    fn sequential_ids_count_up() {
        let ids = SequentialIds::new("id-");
        assert_eq!(ids.next_id(), "id-1");
        assert_eq!(ids.next_id(), "id-2");
    }
}
