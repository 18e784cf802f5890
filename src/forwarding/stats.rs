//! Forwarding statistics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time copy of the forwarding counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardingStats {
    pub forwarded: u64,
    pub dropped: u64,
    pub resolved: u64,
    pub resolve_failures: u64,
}

/// Independently atomic counters; no ordering relative to table writes.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub forwarded: AtomicU64,
    pub dropped: AtomicU64,
    pub resolved: AtomicU64,
    pub resolve_failures: AtomicU64,
}

impl Counters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ForwardingStats {
        ForwardingStats {
            forwarded: self.forwarded.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            resolved: self.resolved.load(Ordering::Relaxed),
            resolve_failures: self.resolve_failures.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.forwarded.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
        self.resolved.store(0, Ordering::Relaxed);
        self.resolve_failures.store(0, Ordering::Relaxed);
    }
}
