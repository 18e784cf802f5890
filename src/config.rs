//! Engine configuration from TOML files and environment variables.
//!
//! Environment values override file values, which override defaults.
//! Invalid environment values fall back to the current value without
//! crashing; out-of-range values are clamped.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `SEMROUTE_TOP_K` | 3 | Resolver result ceiling |
//! | `SEMROUTE_MAX_MULTIPATH` | 3 | Candidates considered per forwarded unit |
//! | `SEMROUTE_TABLE_CAPACITY` | 64 | Initial routing table buffer capacity, at most 2^20 |
//! | `SEMROUTE_DRAIN_SPIN_LIMIT` | 100000 | Writer yields before abandoning a pinned snapshot |
//! | `SEMROUTE_SCRATCH_LIMIT` | 1024 | Max entries copied by weighted resolves |
//! | `SEMROUTE_RNG_SEED` | 0x9E3779B97F4A7C15 | Selection generator seed |
//! | `SEMROUTE_LOG_LEVEL` | info | Tracing filter directive |
//! | `SEMROUTE_LOG_FORMAT` | json | `json` or `pretty` |

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::forwarding::ForwardingConfig;
use crate::resolver::ResolverConfig;
use crate::scoring::ScoringWeights;
use crate::table::{TableConfig, MAX_INITIAL_CAPACITY};
use crate::telemetry::{LogConfig, LogFormat};

/// Upper bound for `top_k` and `max_multipath`.
const MAX_FANOUT: usize = 64;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub table: TableConfig,
    pub resolver: ResolverConfig,
    pub forwarding: ForwardingConfig,
    pub weights: ScoringWeights,
    pub log: LogConfig,
}

/// Flattened summary of effective values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveConfig {
    pub top_k: usize,
    pub max_multipath: usize,
    pub table_capacity: usize,
    pub drain_spin_limit: u32,
    pub scratch_limit: usize,
    pub rng_seed: u64,
    pub log_level: String,
    pub log_format: LogFormat,
    pub weights: ScoringWeights,
}

/// Parse a `usize` env var, returning `current` on missing or invalid.
fn parse_usize(key: &str, current: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<usize>().unwrap_or(current),
        Err(_) => current,
    }
}

/// Parse a `u32` env var, returning `current` on missing or invalid.
fn parse_u32(key: &str, current: u32) -> u32 {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<u32>().unwrap_or(current),
        Err(_) => current,
    }
}

/// Parse a `u64` env var (decimal or `0x` hex), returning `current` on missing or invalid.
fn parse_u64(key: &str, current: u64) -> u64 {
    let Ok(val) = std::env::var(key) else {
        return current;
    };
    let val = val.trim();
    let parsed = match val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => val.parse::<u64>(),
    };
    parsed.unwrap_or(current)
}

impl EngineConfig {
    /// Parse a TOML document. Missing sections keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let mut config: EngineConfig = toml::from_str(text)?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Apply `SEMROUTE_*` overrides on top of the current values.
    pub fn apply_env(&mut self) {
        self.resolver.top_k = parse_usize("SEMROUTE_TOP_K", self.resolver.top_k);
        self.forwarding.max_multipath =
            parse_usize("SEMROUTE_MAX_MULTIPATH", self.forwarding.max_multipath);
        self.table.initial_capacity =
            parse_usize("SEMROUTE_TABLE_CAPACITY", self.table.initial_capacity);
        self.table.drain_spin_limit =
            parse_u32("SEMROUTE_DRAIN_SPIN_LIMIT", self.table.drain_spin_limit);
        self.resolver.scratch_limit =
            parse_usize("SEMROUTE_SCRATCH_LIMIT", self.resolver.scratch_limit);
        self.forwarding.rng_seed = parse_u64("SEMROUTE_RNG_SEED", self.forwarding.rng_seed);
        if let Ok(level) = std::env::var("SEMROUTE_LOG_LEVEL") {
            if !level.trim().is_empty() {
                self.log.level = level.trim().to_string();
            }
        }
        if let Some(format) = std::env::var("SEMROUTE_LOG_FORMAT")
            .ok()
            .and_then(|f| LogFormat::parse(&f))
        {
            self.log.format = format;
        }
        self.normalize();
    }

    /// Clamp sizes into their working ranges.
    fn normalize(&mut self) {
        self.resolver.top_k = self.resolver.top_k.clamp(1, MAX_FANOUT);
        self.forwarding.max_multipath = self.forwarding.max_multipath.clamp(1, MAX_FANOUT);
        self.table.initial_capacity = self
            .table
            .initial_capacity
            .clamp(1, MAX_INITIAL_CAPACITY);
        self.resolver.scratch_limit = self.resolver.scratch_limit.max(1);
    }

    /// Reject values that cannot be clamped into something sensible.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Return a serializable summary of all effective values.
    pub fn effective_config(&self) -> EffectiveConfig {
        EffectiveConfig {
            top_k: self.resolver.top_k,
            max_multipath: self.forwarding.max_multipath,
            table_capacity: self.table.initial_capacity,
            drain_spin_limit: self.table.drain_spin_limit,
            scratch_limit: self.resolver.scratch_limit,
            rng_seed: self.forwarding.rng_seed,
            log_level: self.log.level.clone(),
            log_format: self.log.format,
            weights: self.weights,
        }
    }
}

impl EffectiveConfig {
    /// Convert to JSON for logging.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Load defaults with environment overrides.
pub fn load() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.apply_env();
    config
}

/// Load a TOML file, then apply environment overrides.
pub fn load_file(path: &Path) -> Result<EngineConfig, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    let mut config = EngineConfig::from_toml_str(&text)?;
    config.apply_env();
    Ok(config)
}
