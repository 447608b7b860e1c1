//! Swing-point extraction.
//!
//! Candle i is a swing high when its high is >= the highs of the `window`
//! candles on each side, and a swing low when its low is <= the lows on each
//! side. Only indices with a full window on both sides are considered, so
//! the first and last `window` candles are never flagged. A candle can be
//! both (an outside bar).

use serde::{Deserialize, Serialize};

use super::check_period;
use crate::domain::Candle;
use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwingKind {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub index: usize,
    pub price: f64,
    pub kind: SwingKind,
}

/// Extract swing points in index order. Requires `2 * window + 1` candles.
pub fn swing_points(candles: &[Candle], window: usize) -> Result<Vec<SwingPoint>> {
    check_period(window, "swing window")?;
    let required = 2 * window + 1;
    if candles.len() < required {
        return Err(EngineError::InsufficientData {
            required,
            actual: candles.len(),
        });
    }

    let mut points = Vec::new();
    for i in window..candles.len() - window {
        let neighbours = || (1..=window).flat_map(move |j| [&candles[i - j], &candles[i + j]]);
        let c = &candles[i];
        if neighbours().all(|n| c.high >= n.high) {
            points.push(SwingPoint {
                index: i,
                price: c.high,
                kind: SwingKind::High,
            });
        }
        if neighbours().all(|n| c.low <= n.low) {
            points.push(SwingPoint {
                index: i,
                price: c.low,
                kind: SwingKind::Low,
            });
        }
    }
    Ok(points)
}

/// Split swing points into (highs, lows), each in index order.
pub fn split_swings(points: &[SwingPoint]) -> (Vec<SwingPoint>, Vec<SwingPoint>) {
    points.iter().partition(|p| p.kind == SwingKind::High)
}
