//! Liquidity pools from higher-timeframe swing points.
//!
//! Swing highs mark buy-side liquidity (stops of short sellers rest above
//! them), swing lows mark sell-side liquidity. A pool is swept once a later
//! higher-timeframe candle trades through its level.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Candle, Direction};
use crate::error::Result;
use crate::indicators::{swing_points, SwingKind, SwingPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolSide {
    BuySide,
    SellSide,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityPool {
    pub price: f64,
    pub side: PoolSide,
    /// Swing point the pool sits on, indexed into the full input sequence.
    pub source: SwingPoint,
    pub swept: bool,
    /// Open time of the first candle that traded through the level.
    pub swept_at: Option<DateTime<Utc>>,
}

impl LiquidityPool {
    /// Whether the pool was still resting when `at` began, given the
    /// higher-timeframe candle length `period`.
    pub fn unswept_at(&self, at: DateTime<Utc>, period: chrono::Duration) -> bool {
        match self.swept_at {
            None => true,
            Some(t) => t + period > at,
        }
    }
}

/// Pools over the last `lookback` candles, in swing-index order.
///
/// Requires `2 * window + 1` candles inside the lookback.
pub fn find_pools(
    candles: &[Candle],
    window: usize,
    lookback: usize,
) -> Result<Vec<LiquidityPool>> {
    let offset = candles.len().saturating_sub(lookback);
    let recent = &candles[offset..];
    let swings = swing_points(recent, window)?;

    Ok(swings
        .into_iter()
        .map(|point| {
            let side = match point.kind {
                SwingKind::High => PoolSide::BuySide,
                SwingKind::Low => PoolSide::SellSide,
            };
            let swept_by = recent[point.index + 1..].iter().find(|c| match side {
                PoolSide::BuySide => c.high > point.price,
                PoolSide::SellSide => c.low < point.price,
            });
            LiquidityPool {
                price: point.price,
                side,
                source: SwingPoint {
                    index: point.index + offset,
                    ..point
                },
                swept: swept_by.is_some(),
                swept_at: swept_by.map(|c| c.open_time),
            }
        })
        .collect())
}

/// A pool and its distance from the reference price in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolDistance {
    pub pool: LiquidityPool,
    pub distance_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NearestPools {
    /// Closest unswept buy-side pool above price.
    pub above: Option<PoolDistance>,
    /// Closest unswept sell-side pool below price.
    pub below: Option<PoolDistance>,
}

pub fn nearest_pools(pools: &[LiquidityPool], price: f64) -> NearestPools {
    let with_distance = |pool: &LiquidityPool| PoolDistance {
        pool: pool.clone(),
        distance_pct: (pool.price - price).abs() / price * 100.0,
    };
    NearestPools {
        above: opposing_liquidity(pools, Direction::Long, price).map(with_distance),
        below: opposing_liquidity(pools, Direction::Short, price).map(with_distance),
    }
}

/// Take-profit pool for a trade in `direction` entered at `entry`: the
/// nearest unswept buy-side pool above a long, or sell-side pool below a short.
pub fn opposing_liquidity(
    pools: &[LiquidityPool],
    direction: Direction,
    entry: f64,
) -> Option<&LiquidityPool> {
    let wanted = match direction {
        Direction::Long => PoolSide::BuySide,
        Direction::Short => PoolSide::SellSide,
    };
    pools
        .iter()
        .filter(|p| p.side == wanted && !p.swept)
        .filter(|p| direction.favorable_move(entry, p.price) > 0.0)
        .min_by(|a, b| (a.price - entry).abs().total_cmp(&(b.price - entry).abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn hl(data: &[(f64, f64)]) -> Vec<Candle> {
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        data.iter()
            .enumerate()
            .map(|(i, &(high, low))| {
                let mid = (high + low) / 2.0;
                Candle::new(base + Duration::hours(i as i64), mid, high, low, mid, 1.0)
            })
            .collect()
    }

    fn pool(price: f64, side: PoolSide, swept: bool) -> LiquidityPool {
        LiquidityPool {
            price,
            side,
            source: SwingPoint {
                index: 0,
                price,
                kind: match side {
                    PoolSide::BuySide => SwingKind::High,
                    PoolSide::SellSide => SwingKind::Low,
                },
            },
            swept,
            swept_at: None,
        }
    }

    #[test]
    fn pools_from_swings_with_swept_flag() {
        let candles = hl(&[
            (10.0, 9.0),
            (12.0, 10.0), // swing high 12
            (11.0, 8.0),  // swing low 8
            (11.5, 9.0),
            (12.5, 10.5), // trades above 12
        ]);
        let pools = find_pools(&candles, 1, 100).unwrap();
        let buy = pools.iter().find(|p| p.side == PoolSide::BuySide).unwrap();
        let sell = pools.iter().find(|p| p.side == PoolSide::SellSide).unwrap();
        assert_eq!(buy.price, 12.0);
        assert!(buy.swept);
        assert_eq!(buy.swept_at, Some(candles[4].open_time));
        assert_eq!(sell.price, 8.0);
        assert!(!sell.swept);
    }

    #[test]
    fn lookback_offsets_source_index() {
        let mut data = vec![(50.0, 1.0); 3];
        data.extend([(10.0, 9.0), (12.0, 10.0), (11.0, 9.5)]);
        let pools = find_pools(&hl(&data), 1, 3).unwrap();
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].source.index, 4);
    }

    #[test]
    fn opposing_liquidity_picks_nearest_unswept_beyond_entry() {
        let pools = vec![
            pool(110.0, PoolSide::BuySide, false),
            pool(105.0, PoolSide::BuySide, true),
            pool(108.0, PoolSide::BuySide, false),
            pool(99.0, PoolSide::BuySide, false),
            pool(95.0, PoolSide::SellSide, false),
        ];
        assert_eq!(opposing_liquidity(&pools, Direction::Long, 100.0).unwrap().price, 108.0);
        assert_eq!(opposing_liquidity(&pools, Direction::Short, 100.0).unwrap().price, 95.0);
        assert!(opposing_liquidity(&pools, Direction::Long, 120.0).is_none());
    }

    #[test]
    fn nearest_pools_reports_distances() {
        let pools = vec![
            pool(102.0, PoolSide::BuySide, false),
            pool(97.0, PoolSide::SellSide, false),
        ];
        let near = nearest_pools(&pools, 100.0);
        assert!((near.above.unwrap().distance_pct - 2.0).abs() < 1e-9);
        assert!((near.below.unwrap().distance_pct - 3.0).abs() < 1e-9);
    }
}
