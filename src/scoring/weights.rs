//! Scoring coefficients.

use serde::{Deserialize, Serialize};

use crate::table::TableError;

/// Coefficients combining per-field partial scores into one value.
///
/// The six additive weights of the default set sum to 1.0. `load` is a
/// multiplicative penalty applied to the weighted sum, not an additive term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub capability: f32,
    pub latency: f32,
    pub cost: f32,
    pub context_window: f32,
    pub trust: f32,
    pub region: f32,
    pub load: f32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            capability: 0.30,
            latency: 0.25,
            cost: 0.15,
            context_window: 0.15,
            trust: 0.10,
            region: 0.05,
            load: 0.2,
        }
    }
}

impl ScoringWeights {
    /// Sum of the additive coefficients.
    pub fn additive_sum(&self) -> f32 {
        self.capability + self.latency + self.cost + self.context_window + self.trust + self.region
    }

    /// Reject negative or non-finite coefficients, and a load penalty above 1.
    pub fn validate(&self) -> Result<(), TableError> {
        let named = [
            ("capability", self.capability),
            ("latency", self.latency),
            ("cost", self.cost),
            ("context_window", self.context_window),
            ("trust", self.trust),
            ("region", self.region),
            ("load", self.load),
        ];
        for (name, value) in named {
            if !value.is_finite() || value < 0.0 {
                return Err(TableError::InvalidArgument(format!(
                    "weight {} must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }
        if self.load > 1.0 {
            return Err(TableError::InvalidArgument(format!(
                "load penalty must be at most 1.0, got {}",
                self.load
            )));
        }
        Ok(())
    }
}
