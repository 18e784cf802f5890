//! Immutable published views of the routing table.

use std::ops::Deref;
use std::sync::Arc;

use super::entry::{NodeId, RouteEntry};

/// The table's complete state at one instant. Never mutated after publication.
#[derive(Debug, Default)]
pub struct Snapshot {
    entries: Vec<Arc<RouteEntry>>,
    generation: u64,
}

impl Snapshot {
    pub(crate) fn new(entries: Vec<Arc<RouteEntry>>, generation: u64) -> Self {
        Self { entries, generation }
    }

    pub fn entries(&self) -> &[Arc<RouteEntry>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of publications that preceded this snapshot.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn position(&self, node_id: NodeId) -> Option<usize> {
        self.entries.iter().position(|e| e.node_id == node_id)
    }

    pub fn get(&self, node_id: NodeId) -> Option<&Arc<RouteEntry>> {
        self.entries.iter().find(|e| e.node_id == node_id)
    }

    /// Recover the backing buffer once no reader remains.
    pub(crate) fn into_entries(self) -> Vec<Arc<RouteEntry>> {
        self.entries
    }
}

/// A reader's hold on one snapshot.
///
/// The snapshot's `Arc` strong count is its live-reader counter: acquiring a
/// guard increments it and dropping the guard decrements it. A retired
/// snapshot is recycled only once that count drains back to one.
#[derive(Debug)]
pub struct SnapshotGuard {
    snapshot: Arc<Snapshot>,
}

impl SnapshotGuard {
    pub(crate) fn new(snapshot: Arc<Snapshot>) -> Self {
        Self { snapshot }
    }
}

impl Deref for SnapshotGuard {
    type Target = Snapshot;

    fn deref(&self) -> &Snapshot {
        &self.snapshot
    }
}
