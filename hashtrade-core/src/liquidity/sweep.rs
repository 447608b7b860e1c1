//! Sweep and confirmation detection on the medium timeframe.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::pools::{LiquidityPool, PoolSide};
use crate::domain::{Candle, Direction};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEvent {
    pub pool: LiquidityPool,
    /// Reversal direction: long after a sell-side sweep, short after buy-side.
    pub direction: Direction,
    pub sweep_index: usize,
    /// Wick extreme of the sweep candle.
    pub wick: f64,
    pub confirmation_index: Option<usize>,
}

impl SweepEvent {
    pub fn is_confirmed(&self) -> bool {
        self.confirmation_index.is_some()
    }
}

/// Sweeps among the last `scan` medium candles, oldest first.
///
/// A candle sweeps a sell-side pool when its low trades below the level and
/// it closes back above; buy-side mirrors this. Only pools still resting when
/// the candle opened are eligible (`htf_period` is the pool timeframe's
/// candle length). Each sweep looks up to `confirmation_window` candles ahead
/// for a close beyond the prior candle's extreme in the reversal direction.
pub fn detect_sweeps(
    medium: &[Candle],
    pools: &[LiquidityPool],
    htf_period: Duration,
    scan: usize,
    confirmation_window: usize,
) -> Vec<SweepEvent> {
    let start = medium.len().saturating_sub(scan).max(1);
    let mut events = Vec::new();

    for j in start..medium.len() {
        let candle = &medium[j];
        let swept = pools
            .iter()
            .filter(|p| p.unswept_at(candle.open_time, htf_period))
            .filter(|p| match p.side {
                PoolSide::SellSide => candle.low < p.price && candle.close > p.price,
                PoolSide::BuySide => candle.high > p.price && candle.close < p.price,
            })
            // Deepest level taken out by this candle.
            .max_by(|a, b| match a.side {
                PoolSide::SellSide => b.price.total_cmp(&a.price),
                PoolSide::BuySide => a.price.total_cmp(&b.price),
            });

        if let Some(pool) = swept {
            let (direction, wick) = match pool.side {
                PoolSide::SellSide => (Direction::Long, candle.low),
                PoolSide::BuySide => (Direction::Short, candle.high),
            };
            events.push(SweepEvent {
                pool: pool.clone(),
                direction,
                sweep_index: j,
                wick,
                confirmation_index: find_confirmation(medium, j, direction, confirmation_window),
            });
        }
    }
    events
}

fn find_confirmation(
    candles: &[Candle],
    sweep_index: usize,
    direction: Direction,
    window: usize,
) -> Option<usize> {
    let end = (sweep_index + window).min(candles.len().saturating_sub(1));
    (sweep_index + 1..=end).find(|&k| {
        let prev = &candles[k - 1];
        let close = candles[k].close;
        match direction {
            Direction::Long => close > prev.high,
            Direction::Short => close < prev.low,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{SwingKind, SwingPoint};
    use chrono::{TimeZone, Utc};

    fn candles(data: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        data.iter()
            .enumerate()
            .map(|(i, &(o, h, l, c))| {
                Candle::new(base + Duration::minutes(15 * i as i64), o, h, l, c, 1.0)
            })
            .collect()
    }

    fn sell_side(price: f64) -> LiquidityPool {
        LiquidityPool {
            price,
            side: PoolSide::SellSide,
            source: SwingPoint {
                index: 0,
                price,
                kind: SwingKind::Low,
            },
            swept: false,
            swept_at: None,
        }
    }

    #[test]
    fn confirmed_bullish_sweep() {
        let medium = candles(&[
            (101.0, 101.5, 100.5, 101.0),
            (101.0, 101.2, 99.0, 100.6), // sweeps 100, closes back above
            (100.6, 101.0, 100.2, 100.8),
            (100.8, 101.8, 100.7, 101.6), // closes above prior high 101.0
        ]);
        let events = detect_sweeps(&medium, &[sell_side(100.0)], Duration::hours(1), 10, 5);
        assert_eq!(events.len(), 1);
        let e = &events[0];
        assert_eq!(e.direction, Direction::Long);
        assert_eq!(e.sweep_index, 1);
        assert_eq!(e.wick, 99.0);
        assert_eq!(e.confirmation_index, Some(3));
    }

    #[test]
    fn close_through_level_is_not_a_sweep() {
        let medium = candles(&[(101.0, 101.5, 100.5, 101.0), (101.0, 101.2, 98.0, 99.0)]);
        assert!(detect_sweeps(&medium, &[sell_side(100.0)], Duration::hours(1), 10, 5).is_empty());
    }

    #[test]
    fn confirmation_outside_window_is_unconfirmed() {
        let medium = candles(&[
            (101.0, 101.5, 100.5, 101.0),
            (101.0, 101.2, 99.0, 100.6),
            (100.6, 101.0, 100.2, 100.8),
            (100.8, 101.0, 100.3, 100.9),
            (100.9, 101.8, 100.7, 101.6),
        ]);
        let events = detect_sweeps(&medium, &[sell_side(100.0)], Duration::hours(1), 10, 2);
        assert_eq!(events.len(), 1);
        assert!(!events[0].is_confirmed());
    }

    #[test]
    fn pool_swept_before_candle_is_ineligible() {
        let medium = candles(&[(101.0, 101.5, 100.5, 101.0), (101.0, 101.2, 99.0, 100.6)]);
        let mut pool = sell_side(100.0);
        pool.swept = true;
        pool.swept_at = Some(medium[0].open_time - Duration::hours(3));
        assert!(detect_sweeps(&medium, &[pool], Duration::hours(1), 10, 5).is_empty());
    }
}
