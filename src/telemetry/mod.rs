//! Telemetry module.
//!
//! Provides structured logging, dataplane spans, and metrics recording.

mod logging;
mod recording;
mod spans;

pub use logging::{init_logging, LogConfig, LogError, LogFormat};
pub use recording::{
    init_metrics, record_dropped, record_forwarded, record_gc_expired, record_resolve_failure,
    record_table_size, FRAMES_DROPPED, FRAMES_FORWARDED, GC_EXPIRED, RESOLVE_FAILURES,
    TABLE_ENTRIES,
};
pub use spans::{ForwardSpan, SpanExt};
