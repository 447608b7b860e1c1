//! Live position and account snapshots supplied by the exchange collaborator.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{normalize_symbol, Direction};

/// Identity of an open position: symbol plus direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionKey {
    pub symbol: String,
    pub direction: Direction,
}

impl PositionKey {
    pub fn new(symbol: impl Into<String>, direction: Direction) -> Self {
        Self {
            symbol: symbol.into(),
            direction,
        }
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.symbol, self.direction)
    }
}

/// Fresh view of one open position, taken each cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub symbol: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub current_price: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    /// Remaining quantity in base-asset units. Zero means closed.
    pub quantity: f64,
    pub unrealized_pnl: f64,
}

impl PositionSnapshot {
    /// Keyed by the normalized symbol, so `ETH/USDT:USDT` and `ETHUSDT`
    /// share one record.
    pub fn key(&self) -> PositionKey {
        PositionKey::new(normalize_symbol(&self.symbol), self.direction)
    }

    pub fn is_open(&self) -> bool {
        self.quantity > 0.0
    }

    /// Unrealized move in percent of entry (1.0 == +1 %).
    pub fn pnl_pct(&self) -> f64 {
        let gained = self
            .direction
            .favorable_move(self.entry_price, self.current_price);
        gained / self.entry_price * 100.0
    }
}

/// Account state supplied each cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub balance: f64,
    pub positions: Vec<PositionSnapshot>,
}

impl AccountSnapshot {
    pub fn open_keys(&self) -> Vec<PositionKey> {
        self.positions
            .iter()
            .filter(|p| p.is_open())
            .map(PositionSnapshot::key)
            .collect()
    }
}
