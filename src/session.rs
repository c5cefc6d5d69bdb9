//! Session registry: identifiers surfaced by searches in this session.
//!
//! Bookkeeping for the host ("what has this session looked at"). It is never
//! read when building queries. Backed by a `DashSet`, so concurrent searches
//! can record without losing insertions.

use dashmap::DashSet;

/// Set of entity identifiers seen since the last [`clear`](Self::clear).
#[derive(Debug, Default)]
pub struct SessionRegistry {
    ids: DashSet<String>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one identifier. Returns `true` if it was not seen before.
    pub fn record(&self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }

    /// Record every identifier in `ids`.
    pub fn record_all<'a>(&self, ids: impl IntoIterator<Item = &'a str>) {
        for id in ids {
            self.ids.insert(id.to_string());
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Forget everything recorded so far.
    ///
    /// A search racing with this call may have its ids dropped; the registry
    /// is best-effort and makes no promise either way.
    pub fn clear(&self) {
        self.ids.clear();
    }

    /// Sorted copy of the recorded identifiers.
    pub fn snapshot(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.ids.iter().map(|id| id.key().clone()).collect();
        ids.sort();
        ids
    }
}
