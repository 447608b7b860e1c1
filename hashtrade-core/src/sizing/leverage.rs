//! Leverage selection from stop distance and volatility.
//!
//! # Tiers
//! ```text
//! stop distance   base
//! <= 0.5 %        30x
//! <= 1.0 %        25x
//! <= 1.5 %        20x
//! <= 2.0 %        15x
//! wider           10x
//! ```
//! The base is scaled by the volatility multiplier (low 1.2, normal 1.0,
//! high 0.7), truncated, then clamped to 5x-30x and to the caller's bounds.
//! Leverage never increases as stop distance or volatility increases.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

pub const MIN_LEVERAGE: u32 = 5;
pub const MAX_LEVERAGE: u32 = 30;

const TIERS: [(f64, u32); 4] = [(0.5, 30), (1.0, 25), (1.5, 20), (2.0, 15)];
const WIDE_STOP_LEVERAGE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Volatility {
    Low,
    Normal,
    High,
}

impl Volatility {
    pub fn multiplier(self) -> f64 {
        match self {
            Volatility::Low => 1.2,
            Volatility::Normal => 1.0,
            Volatility::High => 0.7,
        }
    }

    /// Classify ATR as a percent of price against the two thresholds.
    pub fn from_atr_pct(atr_pct: f64, low_below: f64, high_above: f64) -> Self {
        if atr_pct < low_below {
            Volatility::Low
        } else if atr_pct > high_above {
            Volatility::High
        } else {
            Volatility::Normal
        }
    }
}

/// Exchange-imposed leverage limits for an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeverageBounds {
    pub min: u32,
    pub max: u32,
}

impl Default for LeverageBounds {
    fn default() -> Self {
        Self { min: 1, max: 100 }
    }
}

impl LeverageBounds {
    /// Overlap of two bounds, `None` when disjoint.
    pub fn intersect(self, other: LeverageBounds) -> Option<LeverageBounds> {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        (min <= max).then_some(LeverageBounds { min, max })
    }
}

fn base_leverage(sl_distance_pct: f64) -> u32 {
    TIERS
        .iter()
        .find(|(limit, _)| sl_distance_pct <= *limit)
        .map_or(WIDE_STOP_LEVERAGE, |(_, lev)| *lev)
}

/// Leverage for a stop `sl_distance_pct` percent away (1.0 == 1 %).
pub fn select_leverage(
    sl_distance_pct: f64,
    volatility: Volatility,
    bounds: LeverageBounds,
) -> Result<u32> {
    if !sl_distance_pct.is_finite() || sl_distance_pct <= 0.0 {
        return Err(EngineError::InvalidInput(format!(
            "stop distance must be positive, got {sl_distance_pct}"
        )));
    }
    let allowed = bounds
        .intersect(LeverageBounds {
            min: MIN_LEVERAGE,
            max: MAX_LEVERAGE,
        })
        .ok_or_else(|| {
            EngineError::InvalidInput(format!(
                "leverage bounds {}..={} do not overlap {MIN_LEVERAGE}..={MAX_LEVERAGE}",
                bounds.min, bounds.max
            ))
        })?;

    let scaled = (f64::from(base_leverage(sl_distance_pct)) * volatility.multiplier()) as u32;
    Ok(scaled.clamp(allowed.min, allowed.max))
}
