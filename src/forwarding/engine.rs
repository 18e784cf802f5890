//! Dataplane forwarding engine.
//!
//! For each unit: decrement the hop limit, extract and validate the
//! embedded Descriptor, resolve the top candidates, pick one with
//! probability proportional to its score, rewrite the destination and
//! hand the unit to the transmitter. Every failure is a counted drop; the
//! engine never panics on malformed input.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, field, warn};

use super::select::{select_weighted, XorShift64, DEFAULT_SEED};
use super::stats::{Counters, ForwardingStats};
use super::unit::{ForwardUnit, PortId};
use crate::descriptor::{self, DescriptorError};
use crate::resolver::{Resolver, ResolverConfig};
use crate::scoring::ScoringWeights;
use crate::table::{NodeId, RoutingTable, TableError};
use crate::telemetry::{self, ForwardSpan, SpanExt};

/// Errors reported by a [`Transmitter`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransmitError {
    #[error("Link down: {0}")]
    LinkDown(String),

    #[error("Egress queue full")]
    QueueFull,

    #[error("Transmit failed: {0}")]
    Other(String),
}

/// Physical transmission, supplied by the dataplane host.
pub trait Transmitter: Send + Sync {
    fn transmit(
        &self,
        unit: &ForwardUnit,
        next_hop: NodeId,
        ingress: PortId,
    ) -> Result<(), TransmitError>;
}

impl<F> Transmitter for F
where
    F: Fn(&ForwardUnit, NodeId, PortId) -> Result<(), TransmitError> + Send + Sync,
{
    fn transmit(
        &self,
        unit: &ForwardUnit,
        next_hop: NodeId,
        ingress: PortId,
    ) -> Result<(), TransmitError> {
        self(unit, next_hop, ingress)
    }
}

/// Why a unit was not forwarded. Always recoverable at the unit level.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Dropped {
    #[error("Hop limit exhausted")]
    HopLimitExceeded,

    #[error("No descriptor in unit options")]
    NoDescriptor,

    #[error("Malformed descriptor: {0}")]
    MalformedDescriptor(#[from] DescriptorError),

    #[error("No eligible route")]
    NoRoute,

    #[error("Resolve failed: {0}")]
    Resolve(#[from] TableError),

    #[error("Transmit failed: {0}")]
    Transmit(#[from] TransmitError),
}

impl Dropped {
    /// Stable label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::HopLimitExceeded => "hop_limit",
            Self::NoDescriptor => "no_descriptor",
            Self::MalformedDescriptor(_) => "malformed_descriptor",
            Self::NoRoute => "no_route",
            Self::Resolve(_) => "resolve_error",
            Self::Transmit(_) => "transmit",
        }
    }

    /// Returns true if the drop points at hostile or corrupt input.
    pub fn is_adversarial(&self) -> bool {
        matches!(self, Self::MalformedDescriptor(_))
    }
}

/// What happened to a unit that was not dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Disposition {
    /// Addressed to this node; nothing to forward.
    Local,
    /// Handed to the transmitter toward `next_hop`.
    Forwarded { next_hop: NodeId, score: f32 },
}

/// Configuration for the forwarding engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Candidates considered for weighted selection.
    pub max_multipath: usize,
    /// Seed for the selection generator; zero means the default seed.
    pub rng_seed: u64,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            max_multipath: 3,
            rng_seed: DEFAULT_SEED,
        }
    }
}

/// Dataplane entry point.
pub struct ForwardingEngine {
    self_id: NodeId,
    table: Arc<RoutingTable>,
    resolver: Resolver,
    transmitter: Box<dyn Transmitter>,
    max_multipath: usize,
    rng: Mutex<Box<dyn RngCore + Send>>,
    counters: Counters,
}

impl ForwardingEngine {
    pub fn new<T>(
        self_id: NodeId,
        table: Arc<RoutingTable>,
        transmitter: T,
        config: ForwardingConfig,
    ) -> Self
    where
        T: Transmitter + 'static,
    {
        let max_multipath = config.max_multipath.max(1);
        let resolver = Resolver::new(ResolverConfig {
            top_k: max_multipath,
            ..Default::default()
        });
        Self {
            self_id,
            table,
            resolver,
            transmitter: Box::new(transmitter),
            max_multipath,
            rng: Mutex::new(Box::new(XorShift64::new(config.rng_seed))),
            counters: Counters::default(),
        }
    }

    /// Score candidates with `weights` instead of the defaults.
    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.resolver = Resolver::with_weights(self.resolver.config().clone(), weights);
        self
    }

    /// Replace the selection generator.
    pub fn with_rng<R>(self, rng: R) -> Self
    where
        R: RngCore + Send + 'static,
    {
        *self.rng.lock() = Box::new(rng);
        self
    }

    pub fn self_id(&self) -> NodeId {
        self.self_id
    }

    pub fn table(&self) -> &Arc<RoutingTable> {
        &self.table
    }

    pub fn max_multipath(&self) -> usize {
        self.max_multipath
    }

    /// Route one unit. Drops are counted and returned, never raised.
    pub fn process(&self, unit: &mut ForwardUnit, ingress: PortId) -> Result<Disposition, Dropped> {
        if unit.destination == self.self_id {
            return Ok(Disposition::Local);
        }

        let span = ForwardSpan::new(unit.destination, ingress);
        let _enter = span.enter();
        let result = self.forward(unit, ingress);
        span.record_result(&result);

        match &result {
            Ok(Disposition::Forwarded { next_hop, score }) => {
                span.record("next_hop", field::display(next_hop));
                span.record("score", *score);
                Counters::bump(&self.counters.forwarded);
                telemetry::record_forwarded();
            }
            Ok(Disposition::Local) => {}
            Err(dropped) => {
                Counters::bump(&self.counters.dropped);
                telemetry::record_dropped(dropped.reason());
                if dropped.is_adversarial() {
                    warn!(reason = dropped.reason(), error = %dropped, ingress, "unit dropped");
                } else {
                    debug!(reason = dropped.reason(), error = %dropped, ingress, "unit dropped");
                }
            }
        }
        result
    }

    fn forward(&self, unit: &mut ForwardUnit, ingress: PortId) -> Result<Disposition, Dropped> {
        if unit.hop_limit == 0 {
            return Err(Dropped::HopLimitExceeded);
        }
        unit.hop_limit -= 1;

        // TODO: fall back to exact node-id forwarding once a route-by-id
        // table exists; units without a Descriptor are unroutable today.
        let bytes = unit.descriptor_bytes().ok_or(Dropped::NoDescriptor)??;
        let query = descriptor::decode(bytes).map_err(|e| {
            debug!(
                prefix = %hex::encode(&bytes[..bytes.len().min(16)]),
                error = %e,
                "rejected descriptor"
            );
            e
        })?;

        let mut candidates = Vec::with_capacity(self.max_multipath);
        self.resolver
            .resolve_into(&self.table, &query, self.max_multipath, &mut candidates)?;
        if candidates.is_empty() {
            Counters::bump(&self.counters.resolve_failures);
            telemetry::record_resolve_failure();
            return Err(Dropped::NoRoute);
        }
        Counters::bump(&self.counters.resolved);

        let index = {
            let mut rng = self.rng.lock();
            select_weighted(&candidates, &mut **rng)
        }
        .ok_or(Dropped::NoRoute)?;
        let chosen = &candidates[index];
        let next_hop = chosen.node_id();

        unit.destination = next_hop;
        self.transmitter.transmit(unit, next_hop, ingress)?;

        Ok(Disposition::Forwarded {
            next_hop,
            score: chosen.score,
        })
    }

    pub fn frames_forwarded(&self) -> u64 {
        self.counters.forwarded.load(Ordering::Relaxed)
    }

    pub fn frames_dropped(&self) -> u64 {
        self.counters.dropped.load(Ordering::Relaxed)
    }

    pub fn resolved(&self) -> u64 {
        self.counters.resolved.load(Ordering::Relaxed)
    }

    pub fn resolve_failures(&self) -> u64 {
        self.counters.resolve_failures.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> ForwardingStats {
        self.counters.snapshot()
    }

    pub fn reset_stats(&self) {
        self.counters.reset();
    }
}

impl std::fmt::Debug for ForwardingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardingEngine")
            .field("self_id", &self.self_id)
            .field("max_multipath", &self.max_multipath)
            .field("stats", &self.stats())
            .finish()
    }
}
