//! Metrics facade recording.
//!
//! Emits through the `metrics` crate; with no recorder installed every
//! call is a no-op. Hosts install whatever exporter they run.

use metrics::{counter, describe_counter, describe_gauge, gauge};

pub const FRAMES_FORWARDED: &str = "semroute_frames_forwarded_total";
pub const FRAMES_DROPPED: &str = "semroute_frames_dropped_total";
pub const RESOLVE_FAILURES: &str = "semroute_resolve_failures_total";
pub const TABLE_ENTRIES: &str = "semroute_table_entries";
pub const GC_EXPIRED: &str = "semroute_gc_expired_total";

/// Register metric descriptions with the installed recorder.
pub fn init_metrics() {
    describe_counter!(FRAMES_FORWARDED, "Units handed to the transmit callback");
    describe_counter!(FRAMES_DROPPED, "Units dropped, labelled by reason");
    describe_counter!(RESOLVE_FAILURES, "Queries with no eligible candidate");
    describe_gauge!(TABLE_ENTRIES, "Entries in the current routing snapshot");
    describe_counter!(GC_EXPIRED, "Route entries removed by TTL collection");
}

pub fn record_forwarded() {
    counter!(FRAMES_FORWARDED).increment(1);
}

pub fn record_dropped(reason: &'static str) {
    counter!(FRAMES_DROPPED, "reason" => reason).increment(1);
}

pub fn record_resolve_failure() {
    counter!(RESOLVE_FAILURES).increment(1);
}

pub fn record_table_size(entries: usize) {
    gauge!(TABLE_ENTRIES).set(entries as f64);
}

pub fn record_gc_expired(removed: usize) {
    counter!(GC_EXPIRED).increment(removed as u64);
}
