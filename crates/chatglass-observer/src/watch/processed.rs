//! Already-processed element membership.
//!
//! Element ids are only meaningful while the element is reachable, so the
//! set is pruned against every fresh snapshot instead of being manually
//! evicted: entries whose element left the tree disappear on the next scan.
//! This keeps growth bounded without lifecycle bookkeeping.

use std::collections::HashSet;

use crate::dom::{NodeId, PageSnapshot};

#[derive(Debug, Default)]
pub struct ProcessedSet {
    seen: HashSet<NodeId>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an element processed. Returns `true` if it was not already.
    pub fn mark(&mut self, id: NodeId) -> bool {
        self.seen.insert(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.seen.contains(&id)
    }

    /// Drop entries whose element is no longer in the page tree. Returns
    /// how many were pruned.
    pub fn retain_present(&mut self, page: &PageSnapshot) -> usize {
        let before = self.seen.len();
        self.seen.retain(|&id| page.contains(id));
        before - self.seen.len()
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
