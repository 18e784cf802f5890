//! Span utilities for dataplane tracing.

use std::fmt::Display;

use tracing::{debug_span, Span};

/// Extension trait for adding context to spans.
pub trait SpanExt {
    /// Record the result of an operation into the span.
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display;
}

impl SpanExt for Span {
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display,
    {
        match result {
            Ok(_) => {
                self.record("status", "ok");
            }
            Err(e) => {
                self.record("status", "dropped");
                self.record("reason", e.to_string().as_str());
            }
        }
    }
}

/// Factory for the span wrapping one `process` call.
pub struct ForwardSpan;

impl ForwardSpan {
    /// Fields filled in later: `status`, `reason`, `next_hop`, `score`.
    pub fn new(destination: impl Display, ingress: u32) -> Span {
        debug_span!(
            "forward",
            destination = %destination,
            ingress,
            status = tracing::field::Empty,
            reason = tracing::field::Empty,
            next_hop = tracing::field::Empty,
            score = tracing::field::Empty,
        )
    }
}
