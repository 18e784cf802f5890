//! Top-K resolution of semantic queries against the routing table.
//!
//! Results are ranked by score, highest first. Equal scores are ordered by
//! ascending [`NodeId`], so a ranking never depends on insertion order.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::descriptor::Descriptor;
use crate::scoring::{self, ScoringWeights};
use crate::table::{NodeId, RouteEntry, RoutingTable, TableError};

/// An eligible candidate and its match score.
#[derive(Debug, Clone)]
pub struct ResolveResult {
    pub entry: Arc<RouteEntry>,
    pub score: f32,
}

impl ResolveResult {
    pub fn node_id(&self) -> NodeId {
        self.entry.node_id
    }
}

/// Ranking order: score descending, then node id ascending.
pub fn rank_order(a: &ResolveResult, b: &ResolveResult) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.entry.node_id.cmp(&b.entry.node_id))
}

fn ranks_before(score: f32, node_id: NodeId, other: &ResolveResult) -> bool {
    match score.total_cmp(&other.score) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => node_id < other.entry.node_id,
    }
}

/// Insert a candidate into a ranked list holding at most `max` results.
///
/// The entry is only cloned (an `Arc` bump) when it makes the cut.
pub(crate) fn insert_ranked(
    out: &mut Vec<ResolveResult>,
    entry: &Arc<RouteEntry>,
    score: f32,
    max: usize,
) {
    let pos = out
        .iter()
        .position(|r| ranks_before(score, entry.node_id, r))
        .unwrap_or(out.len());
    if pos >= max {
        return;
    }
    if out.len() == max {
        out.pop();
    }
    out.insert(
        pos,
        ResolveResult {
            entry: Arc::clone(entry),
            score,
        },
    );
}

/// Configuration for the resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Ceiling on results returned by [`Resolver::resolve`].
    pub top_k: usize,
    /// Upper bound on entries copied by [`Resolver::resolve_with_weights`].
    pub scratch_limit: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            scratch_limit: 1024,
        }
    }
}

/// Resolves queries to ranked candidates.
#[derive(Debug, Clone)]
pub struct Resolver {
    config: ResolverConfig,
    weights: ScoringWeights,
}

impl Resolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self::with_weights(config, ScoringWeights::default())
    }

    pub fn with_weights(config: ResolverConfig, weights: ScoringWeights) -> Self {
        Self { config, weights }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Resolve up to `min(max_results, top_k)` candidates.
    pub fn resolve(
        &self,
        table: &RoutingTable,
        query: &Descriptor,
        max_results: usize,
    ) -> Result<Vec<ResolveResult>, TableError> {
        let mut out = Vec::new();
        self.resolve_into(table, query, max_results, &mut out)?;
        Ok(out)
    }

    /// As [`resolve`](Self::resolve), reusing `out`'s allocation.
    pub fn resolve_into(
        &self,
        table: &RoutingTable,
        query: &Descriptor,
        max_results: usize,
        out: &mut Vec<ResolveResult>,
    ) -> Result<usize, TableError> {
        if max_results == 0 {
            return Err(TableError::InvalidArgument(
                "max_results must be positive".into(),
            ));
        }
        let k = max_results.min(self.config.top_k.max(1));
        let found = table.lookup_with(query, &self.weights, k, out)?;
        trace!(requested = max_results, k, found, "query resolved");
        Ok(found)
    }

    /// Resolve over an explicit copy of the table with caller-chosen weights.
    ///
    /// Not clamped to `top_k`. Copies at most `scratch_limit` entries.
    pub fn resolve_with_weights(
        &self,
        table: &RoutingTable,
        query: &Descriptor,
        weights: &ScoringWeights,
        max_results: usize,
    ) -> Result<Vec<ResolveResult>, TableError> {
        if max_results == 0 {
            return Err(TableError::InvalidArgument(
                "max_results must be positive".into(),
            ));
        }
        weights.validate()?;

        let limit = table.size().min(self.config.scratch_limit);
        let mut ranked: Vec<ResolveResult> = table
            .snapshot(limit)
            .into_iter()
            .filter_map(|entry| {
                let score = scoring::score(query, &entry, weights);
                (!scoring::is_disqualified(score)).then_some(ResolveResult { entry, score })
            })
            .collect();
        ranked.sort_by(rank_order);
        ranked.truncate(max_results);
        Ok(ranked)
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}
