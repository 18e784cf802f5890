//! Route entries and node identifiers.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::TableError;
use crate::descriptor::Descriptor;

/// 128-bit opaque node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Generate a random identifier.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    pub fn as_u128(&self) -> u128 {
        self.0.as_u128()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One registered forwarding candidate and its current metrics.
///
/// Entries are immutable once published; writers replace them wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteEntry {
    pub node_id: NodeId,
    /// Advertised profile of the endpoint.
    pub capabilities: Descriptor,
    pub latency_us: u32,
    pub cost_milli: u32,
    pub trust_level: u8,
    pub region_code: u16,
    /// Utilization in `[0, 1]`.
    pub load_factor: f32,
    pub last_updated: Instant,
    /// Maximum age since `last_updated`; `Duration::ZERO` means permanent.
    pub ttl: Duration,
}

impl RouteEntry {
    /// A permanent entry with a wildcard profile and zeroed metrics.
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            capabilities: Descriptor::wildcard(),
            latency_us: 0,
            cost_milli: 0,
            trust_level: 0,
            region_code: 0,
            load_factor: 0.0,
            last_updated: Instant::now(),
            ttl: Duration::ZERO,
        }
    }

    pub fn with_capabilities(mut self, capabilities: Descriptor) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_latency_us(mut self, latency_us: u32) -> Self {
        self.latency_us = latency_us;
        self
    }

    pub fn with_cost_milli(mut self, cost_milli: u32) -> Self {
        self.cost_milli = cost_milli;
        self
    }

    pub fn with_trust_level(mut self, trust_level: u8) -> Self {
        self.trust_level = trust_level;
        self
    }

    pub fn with_region(mut self, region_code: u16) -> Self {
        self.region_code = region_code;
        self
    }

    pub fn with_load_factor(mut self, load_factor: f32) -> Self {
        self.load_factor = load_factor;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn updated_at(mut self, last_updated: Instant) -> Self {
        self.last_updated = last_updated;
        self
    }

    pub fn is_permanent(&self) -> bool {
        self.ttl.is_zero()
    }

    /// True once more than `ttl` has elapsed since the last update.
    pub fn is_expired(&self, now: Instant) -> bool {
        !self.is_permanent() && now.saturating_duration_since(self.last_updated) > self.ttl
    }

    pub(crate) fn validate(&self) -> Result<(), TableError> {
        validate_load(self.load_factor)
    }
}

pub(crate) fn validate_load(load_factor: f32) -> Result<(), TableError> {
    if load_factor.is_finite() && (0.0..=1.0).contains(&load_factor) {
        Ok(())
    } else {
        Err(TableError::InvalidArgument(format!(
            "load_factor must be within [0, 1], got {}",
            load_factor
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanent_entries_never_expire() {
        let t0 = Instant::now();
        let entry = RouteEntry::new(NodeId::from_u128(1)).updated_at(t0);
        assert!(!entry.is_expired(t0 + Duration::from_secs(86_400)));
    }

    #[test]
    fn expiry_is_strictly_after_ttl() {
        let t0 = Instant::now();
        let entry = RouteEntry::new(NodeId::from_u128(1))
            .with_ttl(Duration::from_secs(5))
            .updated_at(t0);
        assert!(!entry.is_expired(t0 + Duration::from_secs(5)));
        assert!(entry.is_expired(t0 + Duration::from_secs(6)));
    }

    #[test]
    fn load_factor_bounds() {
        assert!(validate_load(0.0).is_ok());
        assert!(validate_load(1.0).is_ok());
        assert!(validate_load(1.5).is_err());
        assert!(validate_load(f32::NAN).is_err());
    }

    #[test]
    fn node_id_orders_by_value() {
        assert!(NodeId::from_u128(1) < NodeId::from_u128(2));
        assert_eq!(NodeId::from_u128(7).as_u128(), 7);
    }
}
