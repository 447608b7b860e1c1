//! Additive entry score.
//!
//! Each satisfied criterion contributes a fixed, non-negative number of
//! points, so satisfying one more criterion can never lower the total.

use serde::{Deserialize, Serialize};

pub const TREND_POINTS: u8 = 2;
pub const EMA_POINTS: u8 = 1;
pub const RSI_POINTS: u8 = 1;
pub const SWEEP_POINTS: u8 = 3;
pub const ZONE_POINTS: u8 = 2;
pub const VOLUME_POINTS: u8 = 1;
pub const MAX_SCORE: u8 = 10;

/// Which scoring criteria held for the latest candle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Clear uptrend or downtrend.
    pub trend: bool,
    /// Price, fast EMA and slow EMA stacked in the trend direction.
    pub ema_alignment: bool,
    /// RSI not at the extreme that blocks the trade direction.
    pub rsi_ok: bool,
    /// Same-timeframe liquidity sweep in the trend direction.
    pub sweep: bool,
    /// Unfilled zone near price.
    pub zone: bool,
    /// Volume above its recent average.
    pub volume: bool,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u8 {
        let points = [
            (self.trend, TREND_POINTS),
            (self.ema_alignment, EMA_POINTS),
            (self.rsi_ok, RSI_POINTS),
            (self.sweep, SWEEP_POINTS),
            (self.zone, ZONE_POINTS),
            (self.volume, VOLUME_POINTS),
        ];
        let sum: u8 = points.iter().filter(|(hit, _)| *hit).map(|(_, p)| p).sum();
        sum.min(MAX_SCORE)
    }

    pub fn satisfied(&self) -> usize {
        [
            self.trend,
            self.ema_alignment,
            self.rsi_ok,
            self.sweep,
            self.zone,
            self.volume,
        ]
        .iter()
        .filter(|hit| **hit)
        .count()
    }
}
