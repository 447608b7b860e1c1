//! Entry signals produced by the three signal sources.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Direction;
use crate::error::{EngineError, Result};

/// Which component produced a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    Structure,
    Sweep,
    RangeBreakout,
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalSource::Structure => f.write_str("structure"),
            SignalSource::Sweep => f.write_str("sweep"),
            SignalSource::RangeBreakout => f.write_str("range_breakout"),
        }
    }
}

/// Candidate entry. Ephemeral: produced fresh each cycle, never persisted.
///
/// All sources share this shape so the orchestrator can treat them
/// uniformly; `source` tells them apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrySignal {
    pub symbol: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    /// 0-10 quality score.
    pub score: u8,
    pub source: SignalSource,
}

impl EntrySignal {
    /// Build a signal, rejecting stops or targets on the wrong side of entry.
    pub fn new(
        symbol: impl Into<String>,
        direction: Direction,
        entry_price: f64,
        stop_loss: f64,
        take_profit: f64,
        score: u8,
        source: SignalSource,
    ) -> Result<Self> {
        let risk = -direction.favorable_move(entry_price, stop_loss);
        if risk <= 0.0 || !risk.is_finite() {
            return Err(EngineError::InvalidStopDistance {
                entry: entry_price,
                stop: stop_loss,
            });
        }
        let reward = direction.favorable_move(entry_price, take_profit);
        if reward <= 0.0 || reward.is_nan() {
            return Err(EngineError::UnfavorableRR {
                realized: reward / risk,
                minimum: 0.0,
            });
        }
        Ok(Self {
            symbol: symbol.into(),
            direction,
            entry_price,
            stop_loss,
            take_profit,
            score: score.min(10),
            source,
        })
    }

    pub fn risk(&self) -> f64 {
        (self.entry_price - self.stop_loss).abs()
    }

    pub fn reward(&self) -> f64 {
        (self.take_profit - self.entry_price).abs()
    }

    /// Distance-to-target over distance-to-stop.
    pub fn risk_reward(&self) -> f64 {
        self.reward() / self.risk()
    }

    /// Stop distance as a percentage of entry (1.0 == 1 %).
    pub fn stop_distance_pct(&self) -> f64 {
        self.risk() / self.entry_price * 100.0
    }
}
