//! Order blocks and fair-value gaps.
//!
//! A bullish order block is a bearish candle whose successor closes at least
//! `order_block_min_move_pct` higher and above the block's high (the
//! structural break). The zone is the block candle's body. Bearish blocks
//! mirror this.
//!
//! A bullish fair-value gap is three candles where candle 3's low sits above
//! candle 1's high by at least `fvg_min_gap_pct`; the zone is that gap.
//!
//! Zones are dropped once a later close goes beyond the invalidation price
//! (the far edge), and gaps are also dropped once a later wick spans them.

use serde::{Deserialize, Serialize};

use crate::config::StructureConfig;
use crate::domain::{Bias, Candle, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    OrderBlock,
    FairValueGap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub kind: ZoneKind,
    /// `Bullish` or `Bearish`; never `Neutral`.
    pub bias: Bias,
    pub low: f64,
    pub high: f64,
    /// Order block: the block candle. Gap: the middle candle.
    pub origin_index: usize,
    /// Index of the candle that completed the pattern.
    pub formed_index: usize,
    pub invalidation_price: f64,
}

impl Zone {
    fn new(kind: ZoneKind, bias: Bias, low: f64, high: f64, origin: usize, formed: usize) -> Self {
        let invalidation_price = if bias == Bias::Bullish { low } else { high };
        Self {
            kind,
            bias,
            low,
            high,
            origin_index: origin,
            formed_index: formed,
            invalidation_price,
        }
    }

    /// Edge price reaches first when returning to the zone.
    pub fn entry_price(&self) -> f64 {
        match self.bias {
            Bias::Bearish => self.low,
            _ => self.high,
        }
    }

    pub fn direction(&self) -> Direction {
        match self.bias {
            Bias::Bearish => Direction::Short,
            _ => Direction::Long,
        }
    }

    /// True once `candle` invalidates or (for gaps) fills the zone.
    fn is_spent_by(&self, candle: &Candle) -> bool {
        let closed_through = match self.bias {
            Bias::Bearish => candle.close > self.invalidation_price,
            _ => candle.close < self.invalidation_price,
        };
        let filled = self.kind == ZoneKind::FairValueGap
            && match self.bias {
                Bias::Bearish => candle.high >= self.high,
                _ => candle.low <= self.low,
            };
        closed_through || filled
    }
}

/// A zone near the current price, with its distance in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyZone {
    pub zone: Zone,
    pub distance_pct: f64,
}

fn scan_start(candles: &[Candle], lookback: usize) -> usize {
    candles.len().saturating_sub(lookback)
}

pub fn find_order_blocks(candles: &[Candle], config: &StructureConfig) -> Vec<Zone> {
    let start = scan_start(candles, config.zone_lookback).max(1);
    let min_move = config.order_block_min_move_pct;
    let mut zones = Vec::new();
    for i in start..candles.len() {
        let block = &candles[i - 1];
        let next = &candles[i];
        let move_pct = (next.close - block.close) / block.close * 100.0;

        if block.is_bearish() && move_pct > min_move && next.close > block.high {
            zones.push(Zone::new(
                ZoneKind::OrderBlock,
                Bias::Bullish,
                block.close,
                block.open,
                i - 1,
                i,
            ));
        }
        if block.is_bullish() && -move_pct > min_move && next.close < block.low {
            zones.push(Zone::new(
                ZoneKind::OrderBlock,
                Bias::Bearish,
                block.open,
                block.close,
                i - 1,
                i,
            ));
        }
    }
    zones
}

pub fn find_fair_value_gaps(candles: &[Candle], config: &StructureConfig) -> Vec<Zone> {
    let start = scan_start(candles, config.zone_lookback).max(2);
    let mut zones = Vec::new();
    for i in start..candles.len() {
        let first = &candles[i - 2];
        let third = &candles[i];

        if third.low > first.high {
            let gap_pct = (third.low - first.high) / first.high * 100.0;
            if gap_pct > config.fvg_min_gap_pct {
                zones.push(Zone::new(
                    ZoneKind::FairValueGap,
                    Bias::Bullish,
                    first.high,
                    third.low,
                    i - 1,
                    i,
                ));
            }
        }
        if third.high < first.low {
            let gap_pct = (first.low - third.high) / first.low * 100.0;
            if gap_pct > config.fvg_min_gap_pct {
                zones.push(Zone::new(
                    ZoneKind::FairValueGap,
                    Bias::Bearish,
                    third.high,
                    first.low,
                    i - 1,
                    i,
                ));
            }
        }
    }
    zones
}

/// Zones still live at the end of `candles`, newest `max_zones` per kind.
pub fn active_zones(candles: &[Candle], config: &StructureConfig) -> Vec<Zone> {
    let keep = |zones: Vec<Zone>| -> Vec<Zone> {
        let live: Vec<Zone> = zones
            .into_iter()
            .filter(|z| !candles[z.formed_index + 1..].iter().any(|c| z.is_spent_by(c)))
            .collect();
        let skip = live.len().saturating_sub(config.max_zones);
        live.into_iter().skip(skip).collect()
    };

    let mut zones = keep(find_order_blocks(candles, config));
    zones.extend(keep(find_fair_value_gaps(candles, config)));
    zones
}

/// Closest zone on the correct side of `price` for a trade in `direction`.
///
/// Long entries look for bullish zones below price, shorts for bearish zones
/// above. Only zones within `proximity_pct` qualify.
pub fn nearest_zone(
    zones: &[Zone],
    price: f64,
    direction: Direction,
    proximity_pct: f64,
) -> Option<NearbyZone> {
    zones
        .iter()
        .filter(|z| z.direction() == direction)
        .filter_map(|z| {
            let distance = direction.favorable_move(z.entry_price(), price);
            (distance > 0.0).then(|| NearbyZone {
                zone: z.clone(),
                distance_pct: distance / price * 100.0,
            })
        })
        .filter(|n| n.distance_pct < proximity_pct)
        .min_by(|a, b| a.distance_pct.total_cmp(&b.distance_pct))
}
