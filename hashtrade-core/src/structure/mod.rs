//! Structure analyzer: trend, zones and entry score for one timeframe.
//!
//! The analyzer consumes the indicator library over a single closed candle
//! sequence and produces a [`StructureAnalysis`]. An [`EntrySignal`] is
//! attached only when the trend is directional and the score clears
//! `min_score`.

pub mod scoring;
pub mod trend;
pub mod zones;

pub use scoring::ScoreBreakdown;
pub use trend::{classify_trend, Trend};
pub use zones::{active_zones, nearest_zone, NearbyZone, Zone, ZoneKind};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::StructureConfig;
use crate::domain::candle::{closes, require_len};
use crate::domain::{validate_candles, Bias, Candle, Direction, EntrySignal, SignalSource};
use crate::error::Result;
use crate::indicators::swing::split_swings;
use crate::indicators::{atr, ema, rsi, swing_points, SwingPoint};

/// Latest indicator readings used for scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub price: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    /// Bullish when price > fast > slow, bearish when price < fast < slow.
    pub ema_trend: Bias,
    pub rsi: f64,
    pub atr: f64,
    pub atr_pct: f64,
    /// Latest volume over the average of the volume window.
    pub volume_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureAnalysis {
    pub symbol: String,
    pub trend: Trend,
    pub last_swing_high: Option<SwingPoint>,
    pub last_swing_low: Option<SwingPoint>,
    pub zones: Vec<Zone>,
    /// Direction of a sweep made by the latest candle, if any.
    pub sweep: Option<Direction>,
    pub indicators: IndicatorSnapshot,
    pub breakdown: ScoreBreakdown,
    pub score: u8,
    pub signal: Option<EntrySignal>,
}

#[derive(Debug, Clone, Default)]
pub struct StructureAnalyzer {
    config: StructureConfig,
}

impl StructureAnalyzer {
    pub fn new(config: StructureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StructureConfig {
        &self.config
    }

    /// Analyze a closed candle sequence.
    ///
    /// Fails with `InsufficientData` below [`StructureConfig::min_candles`]
    /// and with `DataIntegrity` on malformed candles.
    pub fn analyze(&self, symbol: &str, candles: &[Candle]) -> Result<StructureAnalysis> {
        let cfg = &self.config;
        require_len(candles, cfg.min_candles())?;
        validate_candles(candles)?;

        let swings = swing_points(candles, cfg.swing_window)?;
        let trend = classify_trend(&swings);
        let (highs, lows) = split_swings(&swings);
        let indicators = self.indicators(candles)?;
        let zones = active_zones(candles, cfg);
        let sweep = detect_sweep(candles, &highs, &lows, cfg.sweep_swings);

        let direction = trend.direction();
        let near = direction
            .and_then(|d| nearest_zone(&zones, indicators.price, d, cfg.zone_proximity_pct));

        let breakdown = ScoreBreakdown {
            trend: direction.is_some(),
            ema_alignment: direction.is_some() && indicators.ema_trend == trend.bias(),
            rsi_ok: match direction {
                Some(Direction::Long) => indicators.rsi < cfg.rsi_overbought,
                Some(Direction::Short) => indicators.rsi > cfg.rsi_oversold,
                None => false,
            },
            sweep: direction.is_some() && sweep == direction,
            zone: near.is_some(),
            volume: indicators.volume_ratio > cfg.volume_ratio_threshold,
        };
        let score = breakdown.total();

        let signal = match direction {
            Some(d) if score >= cfg.min_score => {
                self.build_signal(symbol, d, score, &indicators, near.as_ref())
            }
            _ => {
                debug!(symbol, %trend, score, "no structure signal");
                None
            }
        };

        Ok(StructureAnalysis {
            symbol: symbol.to_string(),
            trend,
            last_swing_high: highs.last().copied(),
            last_swing_low: lows.last().copied(),
            zones,
            sweep,
            indicators,
            breakdown,
            score,
            signal,
        })
    }

    fn indicators(&self, candles: &[Candle]) -> Result<IndicatorSnapshot> {
        let cfg = &self.config;
        let closes = closes(candles);
        let last = |series: Vec<f64>| series.last().copied().unwrap_or(f64::NAN);

        let price = closes.last().copied().unwrap_or(f64::NAN);
        let ema_fast = last(ema(&closes, cfg.ema_fast)?);
        let ema_slow = last(ema(&closes, cfg.ema_slow)?);
        let rsi = last(rsi(&closes, cfg.rsi_period)?);
        let atr = last(atr(candles, cfg.atr_period)?);

        let ema_trend = if price > ema_fast && ema_fast > ema_slow {
            Bias::Bullish
        } else if price < ema_fast && ema_fast < ema_slow {
            Bias::Bearish
        } else {
            Bias::Neutral
        };

        let window = &candles[candles.len().saturating_sub(cfg.volume_window)..];
        let avg_volume = window.iter().map(|c| c.volume).sum::<f64>() / window.len().max(1) as f64;
        let current_volume = candles.last().map_or(0.0, |c| c.volume);
        let volume_ratio = if avg_volume > 0.0 {
            current_volume / avg_volume
        } else {
            1.0
        };

        Ok(IndicatorSnapshot {
            price,
            ema_fast,
            ema_slow,
            ema_trend,
            rsi,
            atr,
            atr_pct: atr / price * 100.0,
            volume_ratio,
        })
    }

    fn build_signal(
        &self,
        symbol: &str,
        direction: Direction,
        score: u8,
        indicators: &IndicatorSnapshot,
        near: Option<&NearbyZone>,
    ) -> Option<EntrySignal> {
        let cfg = &self.config;
        let (entry, stop) = match near {
            Some(n) => (n.zone.entry_price(), n.zone.invalidation_price),
            None => {
                if indicators.atr <= 0.0 || !indicators.atr.is_finite() {
                    debug!(symbol, atr = indicators.atr, "degenerate ATR, no fallback stop");
                    return None;
                }
                let distance = indicators.atr * cfg.atr_stop_multiplier;
                (indicators.price, indicators.price - direction.sign() * distance)
            }
        };
        let risk = (entry - stop).abs();
        let target = entry + direction.sign() * risk * cfg.reward_multiple;

        let source = SignalSource::Structure;
        match EntrySignal::new(symbol, direction, entry, stop, target, score, source) {
            Ok(signal) => {
                info!(
                    symbol,
                    %direction,
                    score,
                    entry,
                    stop,
                    target,
                    "structure entry signal"
                );
                Some(signal)
            }
            Err(e) => {
                debug!(symbol, error = %e, "structure candidate rejected");
                None
            }
        }
    }
}

/// Sweep by the latest candle of one of the most recent `recent` swings.
///
/// A bearish sweep trades above a swing high and closes back below it; a
/// bullish sweep trades below a swing low and closes back above. Returns the
/// reversal direction.
fn detect_sweep(
    candles: &[Candle],
    highs: &[SwingPoint],
    lows: &[SwingPoint],
    recent: usize,
) -> Option<Direction> {
    let last = candles.last()?;
    let recent_of = |points: &[SwingPoint]| points.len().saturating_sub(recent);

    if highs[recent_of(highs)..]
        .iter()
        .any(|sh| last.high > sh.price && last.close < sh.price)
    {
        return Some(Direction::Short);
    }
    if lows[recent_of(lows)..]
        .iter()
        .any(|sl| last.low < sl.price && last.close > sl.price)
    {
        return Some(Direction::Long);
    }
    None
}
