//! Multi-attribute match scoring.
//!
//! A query is scored against one candidate in two phases:
//!
//! 1. Hard constraints (context-window floor, trust floor, excluded
//!    regions). Any failure returns [`DISQUALIFIED`].
//! 2. Soft terms, each normalized to `[0, 1]` and combined as a weighted
//!    sum. Terms for fields the query does not carry contribute nothing and
//!    the remaining weights are not renormalized.
//!
//! Scoring is a pure function of its inputs.

mod weights;

pub use weights::ScoringWeights;

use crate::descriptor::Descriptor;
use crate::table::RouteEntry;

/// Sentinel score for a candidate that failed a hard constraint.
pub const DISQUALIFIED: f32 = -1.0;

/// Returns true if `score` marks a disqualified candidate.
pub fn is_disqualified(score: f32) -> bool {
    score < 0.0
}

/// Per-term weighted contributions, before the load penalty.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreBreakdown {
    pub capability: f32,
    pub latency: f32,
    pub cost: f32,
    pub context_window: f32,
    pub trust: f32,
    pub region: f32,
    /// Multiplier applied to the sum, `1 - load_weight * load_factor`.
    pub load_multiplier: f32,
}

impl ScoreBreakdown {
    pub fn sum(&self) -> f32 {
        self.capability + self.latency + self.cost + self.context_window + self.trust + self.region
    }

    /// Final score, clamped into `[0, 1]`.
    pub fn total(&self) -> f32 {
        (self.sum() * self.load_multiplier).clamp(0.0, 1.0)
    }
}

/// Score `candidate` against `query`. Returns [`DISQUALIFIED`] or a value in `[0, 1]`.
pub fn score(query: &Descriptor, candidate: &RouteEntry, weights: &ScoringWeights) -> f32 {
    match score_breakdown(query, candidate, weights) {
        Some(_) if query.is_wildcard() => 1.0,
        Some(breakdown) => breakdown.total(),
        None => DISQUALIFIED,
    }
}

/// Per-term breakdown, or `None` when a hard constraint fails.
///
/// A wildcard query yields an all-zero breakdown; [`score`] maps it to 1.0.
pub fn score_breakdown(
    query: &Descriptor,
    candidate: &RouteEntry,
    weights: &ScoringWeights,
) -> Option<ScoreBreakdown> {
    if !passes_hard_constraints(query, candidate) {
        return None;
    }
    if query.is_wildcard() {
        return Some(ScoreBreakdown {
            load_multiplier: 1.0,
            ..Default::default()
        });
    }

    let advertised = &candidate.capabilities;
    let mut breakdown = ScoreBreakdown {
        load_multiplier: 1.0 - weights.load * candidate.load_factor.clamp(0.0, 1.0),
        ..Default::default()
    };

    if let Some(requested) = query.capabilities() {
        breakdown.capability =
            weights.capability * capability_overlap(requested, advertised.capabilities().unwrap_or(0));
    }
    if let Some(bound) = query.max_latency_us() {
        breakdown.latency = weights.latency * budget_term(candidate.latency_us, bound);
    }
    if let Some(bound) = query.max_cost_milli() {
        breakdown.cost = weights.cost * budget_term(candidate.cost_milli, bound);
    }
    if let Some(floor) = query.context_window() {
        let window = advertised.context_window().unwrap_or(0);
        breakdown.context_window = weights.context_window * context_surplus(window, floor);
    }
    if let Some(floor) = query.trust_floor() {
        breakdown.trust = weights.trust * trust_term(candidate.trust_level, floor);
    }
    if let Some(preferred) = query.region_prefer() {
        if preferred.contains(&candidate.region_code) {
            breakdown.region = weights.region;
        }
    }

    Some(breakdown)
}

fn passes_hard_constraints(query: &Descriptor, candidate: &RouteEntry) -> bool {
    if let Some(floor) = query.context_window() {
        if candidate.capabilities.context_window().unwrap_or(0) < floor {
            return false;
        }
    }
    if let Some(floor) = query.trust_floor() {
        if candidate.trust_level < floor {
            return false;
        }
    }
    if let Some(excluded) = query.region_exclude() {
        if excluded.contains(&candidate.region_code) {
            return false;
        }
    }
    true
}

/// Shared-bit ratio: `popcount(q & c) / popcount(q | c)`.
fn capability_overlap(requested: u64, advertised: u64) -> f32 {
    if requested == 0 {
        return 1.0;
    }
    let union = (requested | advertised).count_ones();
    (requested & advertised).count_ones() as f32 / union as f32
}

/// `max(0, 1 - value / bound)`; a zero bound only credits a zero value.
fn budget_term(value: u32, bound: u32) -> f32 {
    if bound == 0 {
        return if value == 0 { 1.0 } else { 0.0 };
    }
    (1.0 - value as f32 / bound as f32).max(0.0)
}

/// 0.5 for an exact fit, rising to 1.0 at twice the floor.
fn context_surplus(window: u32, floor: u32) -> f32 {
    if floor == 0 {
        return 1.0;
    }
    let surplus = window.saturating_sub(floor) as f32 / floor as f32;
    (0.5 + 0.5 * surplus).min(1.0)
}

/// Strictly increasing in `trust`, 1.0 at the maximum level.
fn trust_term(trust: u8, floor: u8) -> f32 {
    let above = trust.saturating_sub(floor) as f32 + 1.0;
    above / (256.0 - floor as f32)
}
