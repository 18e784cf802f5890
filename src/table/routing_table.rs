//! Double-buffered, copy-on-write routing table.
//!
//! Readers load the current snapshot through an [`ArcSwap`] and never block.
//! Writers serialize on a single mutex, build the next snapshot in a
//! recycled buffer, publish it with one atomic swap, then wait for the
//! retired snapshot's readers to drain so its storage can back the next
//! write.

use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::entry::{validate_load, NodeId, RouteEntry};
use super::error::TableError;
use super::snapshot::{Snapshot, SnapshotGuard};
use crate::descriptor::Descriptor;
use crate::resolver::{insert_ranked, ResolveResult};
use crate::scoring::{self, ScoringWeights};
use crate::telemetry;

/// Ceiling on `TableConfig::initial_capacity`; larger tables still grow by doubling.
pub const MAX_INITIAL_CAPACITY: usize = 1 << 20;

/// Configuration for the routing table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Slots reserved for the first write buffer; doubled on demand.
    pub initial_capacity: usize,
    /// Yields a writer spends waiting for a retired snapshot's readers
    /// before abandoning it to the last reader instead of recycling it.
    pub drain_spin_limit: u32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            drain_spin_limit: 100_000,
        }
    }
}

/// Writer-side state, only touched under the write lock.
struct WriterState {
    /// Storage recovered from the last retired snapshot.
    spare: Option<Vec<Arc<RouteEntry>>>,
    capacity: usize,
    generation: u64,
}

impl WriterState {
    /// Take an empty buffer able to hold `needed` entries, doubling capacity as required.
    fn take_buffer(&mut self, needed: usize) -> Vec<Arc<RouteEntry>> {
        self.capacity = grown_capacity(self.capacity, needed);
        let mut buf = self.spare.take().unwrap_or_default();
        buf.clear();
        if buf.capacity() < self.capacity {
            buf.reserve_exact(self.capacity);
        }
        buf
    }
}

/// Double `capacity` until it holds `needed`, stopping at `needed` rather than overflowing.
fn grown_capacity(mut capacity: usize, needed: usize) -> usize {
    capacity = capacity.max(1);
    while capacity < needed {
        capacity = capacity.checked_mul(2).unwrap_or(needed);
    }
    capacity
}

/// Outcome of a write closure.
enum Commit<T> {
    /// Publish the built buffer as the new snapshot.
    Publish(T),
    /// Nothing changed; keep the current snapshot.
    Skip(T),
}

/// Concurrent store of route entries keyed by [`NodeId`].
pub struct RoutingTable {
    current: ArcSwap<Snapshot>,
    writer: Mutex<WriterState>,
    config: TableConfig,
}

impl RoutingTable {
    pub fn new(config: TableConfig) -> Self {
        let capacity = config.initial_capacity.clamp(1, MAX_INITIAL_CAPACITY);
        Self {
            current: ArcSwap::from_pointee(Snapshot::default()),
            writer: Mutex::new(WriterState {
                spare: Some(Vec::with_capacity(capacity)),
                capacity,
                generation: 0,
            }),
            config,
        }
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Acquire the current snapshot. Wait-free; hold the guard briefly.
    pub fn pin(&self) -> SnapshotGuard {
        SnapshotGuard::new(self.current.load_full())
    }

    /// Number of live entries.
    pub fn size(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Publication counter of the current snapshot.
    pub fn generation(&self) -> u64 {
        self.current.load().generation()
    }

    /// Logical capacity of the write buffers.
    pub fn capacity(&self) -> usize {
        self.writer.lock().capacity
    }

    /// Look up one entry by id.
    pub fn get(&self, node_id: NodeId) -> Option<Arc<RouteEntry>> {
        self.current.load().get(node_id).cloned()
    }

    /// Insert an entry, replacing any entry with the same `node_id` in place.
    pub fn insert(&self, entry: RouteEntry) -> Result<(), TableError> {
        entry.validate()?;
        let node_id = entry.node_id;
        let entry = Arc::new(entry);

        let replaced = self.commit(1, |current, buf| {
            buf.extend(current.entries().iter().cloned());
            let replaced = match current.position(node_id) {
                Some(index) => {
                    buf[index] = entry;
                    true
                }
                None => {
                    buf.push(entry);
                    false
                }
            };
            Ok(Commit::Publish(replaced))
        })?;

        debug!(node_id = %node_id, replaced, "route entry inserted");
        Ok(())
    }

    /// Refresh latency and load for an entry, stamping it with the current time.
    pub fn update_metrics(
        &self,
        node_id: NodeId,
        latency_us: u32,
        load_factor: f32,
    ) -> Result<(), TableError> {
        self.update_metrics_at(node_id, latency_us, load_factor, Instant::now())
    }

    /// As [`update_metrics`](Self::update_metrics) with an explicit timestamp.
    pub fn update_metrics_at(
        &self,
        node_id: NodeId,
        latency_us: u32,
        load_factor: f32,
        now: Instant,
    ) -> Result<(), TableError> {
        validate_load(load_factor)?;

        self.commit(0, |current, buf| {
            let index = current
                .position(node_id)
                .ok_or(TableError::NotFound(node_id))?;
            let mut updated = RouteEntry::clone(&current.entries()[index]);
            updated.latency_us = latency_us;
            updated.load_factor = load_factor;
            updated.last_updated = now;

            buf.extend(current.entries().iter().cloned());
            buf[index] = Arc::new(updated);
            Ok(Commit::Publish(()))
        })?;

        debug!(node_id = %node_id, latency_us, load_factor, "route metrics updated");
        Ok(())
    }

    /// Remove an entry. Swaps the last entry into its slot, so order is not preserved.
    pub fn remove(&self, node_id: NodeId) -> Result<(), TableError> {
        self.commit(0, |current, buf| {
            let index = current
                .position(node_id)
                .ok_or(TableError::NotFound(node_id))?;
            buf.extend(current.entries().iter().cloned());
            buf.swap_remove(index);
            Ok(Commit::Publish(()))
        })?;

        debug!(node_id = %node_id, "route entry removed");
        Ok(())
    }

    /// Drop every entry whose TTL has elapsed at `now`. Returns the number removed.
    ///
    /// Publishes nothing when no entry has expired.
    pub fn gc(&self, now: Instant) -> Result<usize, TableError> {
        let removed = self.commit(0, |current, buf| {
            let entries = current.entries();
            let expired = entries.iter().filter(|e| e.is_expired(now)).count();
            if expired == 0 {
                return Ok(Commit::Skip(0));
            }
            buf.extend(entries.iter().filter(|e| !e.is_expired(now)).cloned());
            Ok(Commit::Publish(expired))
        })?;

        if removed > 0 {
            info!(removed, remaining = self.size(), "expired route entries collected");
            telemetry::record_gc_expired(removed);
        }
        Ok(removed)
    }

    /// Copy up to `max` entries out of the current snapshot.
    pub fn snapshot(&self, max: usize) -> Vec<Arc<RouteEntry>> {
        let snapshot = self.pin();
        snapshot.entries().iter().take(max).cloned().collect()
    }

    /// Rank entries for `query` under the default weights.
    pub fn lookup(
        &self,
        query: &Descriptor,
        max_results: usize,
    ) -> Result<Vec<ResolveResult>, TableError> {
        let mut out = Vec::new();
        self.lookup_with(query, &ScoringWeights::default(), max_results, &mut out)?;
        Ok(out)
    }

    /// Rank entries for `query` into `out`, best first. Returns the result count.
    ///
    /// `out` is cleared and its allocation reused; ranking itself allocates
    /// nothing per candidate.
    pub fn lookup_with(
        &self,
        query: &Descriptor,
        weights: &ScoringWeights,
        max_results: usize,
        out: &mut Vec<ResolveResult>,
    ) -> Result<usize, TableError> {
        if max_results == 0 {
            return Err(TableError::InvalidArgument(
                "max_results must be positive".into(),
            ));
        }
        weights.validate()?;

        out.clear();
        let snapshot = self.pin();
        out.reserve(max_results.min(snapshot.len()));
        for entry in snapshot.entries() {
            let score = scoring::score(query, entry, weights);
            if scoring::is_disqualified(score) {
                continue;
            }
            insert_ranked(out, entry, score, max_results);
        }
        Ok(out.len())
    }

    /// Run one serialized write: build the next snapshot from the current one and publish it.
    fn commit<F, T>(&self, extra: usize, build: F) -> Result<T, TableError>
    where
        F: FnOnce(&Snapshot, &mut Vec<Arc<RouteEntry>>) -> Result<Commit<T>, TableError>,
    {
        let mut writer = self.writer.lock();
        // Writers hold the lock, so this stays current until our swap.
        let current = self.current.load_full();
        let mut buf = writer.take_buffer(current.len() + extra);

        let outcome = match build(current.as_ref(), &mut buf) {
            Ok(outcome) => outcome,
            Err(e) => {
                buf.clear();
                writer.spare = Some(buf);
                return Err(e);
            }
        };

        let value = match outcome {
            Commit::Skip(value) => {
                buf.clear();
                writer.spare = Some(buf);
                return Ok(value);
            }
            Commit::Publish(value) => value,
        };

        drop(current);
        writer.generation += 1;
        let len = buf.len();
        let retired = self
            .current
            .swap(Arc::new(Snapshot::new(buf, writer.generation)));
        writer.spare = self.reclaim(retired);
        telemetry::record_table_size(len);
        Ok(value)
    }

    /// Wait for a retired snapshot's readers to drain and recover its storage.
    fn reclaim(&self, mut retired: Arc<Snapshot>) -> Option<Vec<Arc<RouteEntry>>> {
        let mut spins = 0u32;
        loop {
            match Arc::try_unwrap(retired) {
                Ok(snapshot) => {
                    let mut buf = snapshot.into_entries();
                    buf.clear();
                    return Some(buf);
                }
                Err(shared) => {
                    if spins >= self.config.drain_spin_limit {
                        warn!(
                            generation = shared.generation(),
                            readers = Arc::strong_count(&shared) - 1,
                            "retired snapshot still pinned; abandoning to last reader"
                        );
                        return None;
                    }
                    spins += 1;
                    retired = shared;
                    std::thread::yield_now();
                }
            }
        }
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::new(TableConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn entry(id: u128) -> RouteEntry {
        RouteEntry::new(NodeId::from_u128(id))
    }

    #[test]
    fn capacity_doubles_when_exceeded() {
        let table = RoutingTable::new(TableConfig {
            initial_capacity: 2,
            ..Default::default()
        });
        assert_eq!(table.capacity(), 2);
        for id in 0..3 {
            table.insert(entry(id)).unwrap();
        }
        assert_eq!(table.capacity(), 4);
        for id in 3..5 {
            table.insert(entry(id)).unwrap();
        }
        assert_eq!(table.capacity(), 8);
        assert_eq!(table.size(), 5);
    }

    #[test]
    fn oversized_initial_capacity_is_clamped() {
        let table = RoutingTable::new(TableConfig {
            initial_capacity: usize::MAX,
            ..Default::default()
        });
        assert_eq!(table.capacity(), MAX_INITIAL_CAPACITY);
        table.insert(entry(1)).unwrap();
        assert_eq!(table.size(), 1);
    }

    #[test]
    fn capacity_growth_never_overflows() {
        assert_eq!(grown_capacity(64, 65), 128);
        assert_eq!(grown_capacity(64, 10), 64);
        let needed = usize::MAX / 2 + 2;
        assert_eq!(grown_capacity(usize::MAX / 2 + 1, needed), needed);
        assert_eq!(grown_capacity(3, usize::MAX), usize::MAX);
    }

    #[test]
    fn every_write_bumps_generation() {
        let table = RoutingTable::default();
        assert_eq!(table.generation(), 0);
        table.insert(entry(1)).unwrap();
        table.update_metrics(NodeId::from_u128(1), 10, 0.5).unwrap();
        table.remove(NodeId::from_u128(1)).unwrap();
        assert_eq!(table.generation(), 3);
    }

    #[test]
    fn failed_write_publishes_nothing() {
        let table = RoutingTable::default();
        table.insert(entry(1)).unwrap();
        assert!(table.remove(NodeId::from_u128(2)).is_err());
        assert_eq!(table.generation(), 1);
    }

    #[test]
    fn gc_without_expiry_keeps_snapshot() {
        let table = RoutingTable::default();
        table.insert(entry(1)).unwrap();
        let before = table.generation();
        assert_eq!(table.gc(Instant::now() + Duration::from_secs(3600)).unwrap(), 0);
        assert_eq!(table.generation(), before);
    }

    #[test]
    fn pinned_reader_keeps_old_view() {
        let table = RoutingTable::new(TableConfig {
            drain_spin_limit: 10,
            ..Default::default()
        });
        table.insert(entry(1)).unwrap();
        let pinned = table.pin();

        // The writer gives up waiting on the pinned snapshot and moves on.
        table.insert(entry(2)).unwrap();
        assert_eq!(pinned.len(), 1);
        assert_eq!(table.size(), 2);
        drop(pinned);

        table.insert(entry(3)).unwrap();
        assert_eq!(table.size(), 3);
    }

    #[test]
    fn invalid_load_rejected() {
        let table = RoutingTable::default();
        let bad = entry(1).with_load_factor(2.0);
        assert!(matches!(table.insert(bad), Err(TableError::InvalidArgument(_))));
        table.insert(entry(1)).unwrap();
        assert!(matches!(
            table.update_metrics(NodeId::from_u128(1), 5, -0.1),
            Err(TableError::InvalidArgument(_))
        ));
    }

    #[test]
    fn zero_max_results_rejected() {
        let table = RoutingTable::default();
        assert!(matches!(
            table.lookup(&Descriptor::wildcard(), 0),
            Err(TableError::InvalidArgument(_))
        ));
    }
}
