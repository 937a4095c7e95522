//! Process-lifetime memo of resolved dataset counts.

use std::sync::Arc;

use dashmap::DashMap;

/// Shared name-to-count memo handed to each resolver at construction.
///
/// Cloning is cheap (the map is behind an `Arc`), lookups are exact and
/// case-sensitive, and concurrent inserts for the same name are benign
/// last-write-wins. Entries are never evicted.
#[derive(Debug, Clone, Default)]
pub struct CountCache {
    entries: Arc<DashMap<String, u64>>,
}

impl CountCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.entries.get(name).map(|entry| *entry.value())
    }

    pub fn insert(&self, name: &str, count: u64) {
        self.entries.insert(name.to_owned(), count);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
