//! Semroute: semantic routing for AI inference traffic.
//!
//! Units of work carry a compact binary Descriptor of what they need
//! (capabilities, context window, latency and cost bounds, trust floor,
//! region constraints) instead of a fixed destination. Each node keeps a
//! routing table of candidate inference nodes and forwards every unit to a
//! node chosen with probability proportional to how well it matches.
//!
//! # Layers
//!
//! - [`descriptor`]: bounded, validating wire codec
//! - [`scoring`]: hard constraints plus weighted soft terms in `[0, 1]`
//! - [`table`]: lock-free snapshot reads, serialized copy-on-write updates
//! - [`resolver`]: top-K ranking over one consistent snapshot
//! - [`forwarding`]: per-unit dataplane decision and transmission
//!
//! # Concurrency
//!
//! Any number of threads may resolve and forward concurrently while one
//! writer at a time mutates the table. Readers never block and never see a
//! partially applied update.

pub mod config;
pub mod descriptor;
pub mod forwarding;
pub mod resolver;
pub mod scoring;
pub mod table;
pub mod telemetry;

use std::sync::Arc;

use config::EngineConfig;
use forwarding::{ForwardingEngine, Transmitter};
use resolver::Resolver;
use table::{NodeId, RoutingTable};

/// A fully assembled routing node.
pub struct RoutingEngine {
    pub table: Arc<RoutingTable>,
    pub resolver: Resolver,
    pub forwarding: ForwardingEngine,
    config: EngineConfig,
}

impl RoutingEngine {
    /// Assemble table, resolver, and forwarding engine from one configuration.
    pub fn new<T>(self_id: NodeId, config: EngineConfig, transmitter: T) -> Self
    where
        T: Transmitter + 'static,
    {
        let table = Arc::new(RoutingTable::new(config.table.clone()));
        let resolver = Resolver::with_weights(config.resolver.clone(), config.weights);
        let forwarding = ForwardingEngine::new(
            self_id,
            table.clone(),
            transmitter,
            config.forwarding.clone(),
        )
        .with_weights(config.weights);

        tracing::info!(
            node = %self_id,
            top_k = config.resolver.top_k,
            max_multipath = config.forwarding.max_multipath,
            "routing engine assembled"
        );
        if let Ok(effective) = config.effective_config().to_json() {
            tracing::debug!(config = %effective, "effective configuration");
        }

        Self {
            table,
            resolver,
            forwarding,
            config,
        }
    }

    pub fn self_id(&self) -> NodeId {
        self.forwarding.self_id()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl std::fmt::Debug for RoutingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingEngine")
            .field("self_id", &self.self_id())
            .field("entries", &self.table.size())
            .field("forwarding", &self.forwarding)
            .finish()
    }
}
