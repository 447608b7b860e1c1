//! Liquidity engine: multi-timeframe sweep-and-reversal setups.
//!
//! 1. Higher timeframe: liquidity pools from swing points, plus a coarse
//!    bias from the same swing structure the structure analyzer uses.
//! 2. Medium timeframe: the most recent sweep of a resting pool that is
//!    confirmed within the confirmation window.
//! 3. Gate on bias, on the stop still being intact, and on risk:reward
//!    against the nearest opposing pool.
//! 4. Lower timeframe (optional): refine entry to the first better close
//!    after confirmation that stays clear of the stop.
//!
//! A missing setup is reported as [`NoSignalReason`], never as an error.

pub mod pools;
pub mod sweep;

pub use pools::{
    find_pools, nearest_pools, opposing_liquidity, LiquidityPool, NearestPools, PoolSide,
};
pub use sweep::{detect_sweeps, SweepEvent};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::config::LiquidityConfig;
use crate::domain::candle::require_len;
use crate::domain::{
    infer_period, validate_candles, Bias, Candle, Direction, EntrySignal, SignalSource,
};
use crate::error::Result;
use crate::structure::classify_trend;

/// Why a liquidity scan produced no signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoSignalReason {
    NoSweep,
    Unconfirmed,
    AgainstBias,
    NoOpposingPool,
    RiskRewardTooLow,
    StopBreached,
}

impl fmt::Display for NoSignalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            NoSignalReason::NoSweep => "no sweep of a resting pool",
            NoSignalReason::Unconfirmed => "sweep not confirmed in time",
            NoSignalReason::AgainstBias => "sweep reversal against higher-timeframe bias",
            NoSignalReason::NoOpposingPool => "no opposing pool beyond entry",
            NoSignalReason::RiskRewardTooLow => "risk:reward below minimum",
            NoSignalReason::StopBreached => "stop already traded through",
        };
        f.write_str(text)
    }
}

/// Timeframes fed to one scan. `lower` is optional.
#[derive(Debug, Clone, Copy)]
pub struct LiquidityInput<'a> {
    pub higher: &'a [Candle],
    pub medium: &'a [Candle],
    pub lower: Option<&'a [Candle]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityScan {
    pub symbol: String,
    pub bias: Bias,
    pub pools: Vec<LiquidityPool>,
    /// The sweep the verdict is based on, if one was found.
    pub sweep: Option<SweepEvent>,
    pub signal: Option<EntrySignal>,
    pub reason: Option<NoSignalReason>,
}

#[derive(Debug, Clone, Default)]
pub struct LiquidityEngine {
    config: LiquidityConfig,
}

impl LiquidityEngine {
    pub fn new(config: LiquidityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LiquidityConfig {
        &self.config
    }

    pub fn scan(&self, symbol: &str, input: LiquidityInput<'_>) -> Result<LiquidityScan> {
        let cfg = &self.config;
        require_len(input.higher, 2 * cfg.swing_window + 1)?;
        require_len(input.medium, cfg.min_medium_candles.max(2))?;
        validate_candles(input.higher)?;
        validate_candles(input.medium)?;
        if let Some(lower) = input.lower {
            validate_candles(lower)?;
        }

        let pools = find_pools(input.higher, cfg.swing_window, cfg.pool_lookback)?;
        let swings: Vec<_> = pools.iter().map(|p| p.source).collect();
        let bias = classify_trend(&swings).bias();
        let htf_period = infer_period(input.higher).unwrap_or_else(Duration::zero);

        let sweeps = detect_sweeps(
            input.medium,
            &pools,
            htf_period,
            cfg.sweep_scan,
            cfg.confirmation_window,
        );

        let mut scan = LiquidityScan {
            symbol: symbol.to_string(),
            bias,
            pools,
            sweep: None,
            signal: None,
            reason: None,
        };

        let Some(sweep) = sweeps.iter().rev().find(|e| e.is_confirmed()).cloned() else {
            scan.reason = Some(if sweeps.is_empty() {
                NoSignalReason::NoSweep
            } else {
                NoSignalReason::Unconfirmed
            });
            scan.sweep = sweeps.last().cloned();
            debug!(symbol, reason = ?scan.reason, "no liquidity signal");
            return Ok(scan);
        };

        let outcome = self.evaluate(symbol, &sweep, &scan.pools, bias, input);
        scan.sweep = Some(sweep);
        match outcome {
            Ok(signal) => {
                info!(
                    symbol,
                    direction = %signal.direction,
                    entry = signal.entry_price,
                    stop = signal.stop_loss,
                    target = signal.take_profit,
                    rr = signal.risk_reward(),
                    "liquidity sweep signal"
                );
                scan.signal = Some(signal);
            }
            Err(reason) => {
                debug!(symbol, %reason, "liquidity setup rejected");
                scan.reason = Some(reason);
            }
        }
        Ok(scan)
    }

    fn evaluate(
        &self,
        symbol: &str,
        sweep: &SweepEvent,
        pools: &[LiquidityPool],
        bias: Bias,
        input: LiquidityInput<'_>,
    ) -> std::result::Result<EntrySignal, NoSignalReason> {
        let cfg = &self.config;
        let direction = sweep.direction;
        if !bias.permits(direction) {
            return Err(NoSignalReason::AgainstBias);
        }

        let Some(confirm) = sweep.confirmation_index else {
            return Err(NoSignalReason::Unconfirmed);
        };
        let mut entry = input.medium[confirm].close;
        let stop = sweep.wick * (1.0 - direction.sign() * cfg.stop_buffer_pct / 100.0);

        let breached = |c: &Candle| match direction {
            Direction::Long => c.low <= stop,
            Direction::Short => c.high >= stop,
        };
        if input.medium[sweep.sweep_index + 1..].iter().any(breached) {
            return Err(NoSignalReason::StopBreached);
        }

        let target = opposing_liquidity(pools, direction, entry)
            .ok_or(NoSignalReason::NoOpposingPool)?
            .price;

        if let Some(lower) = input.lower {
            let medium_period = infer_period(input.medium).unwrap_or_else(Duration::zero);
            let confirmed_at = input.medium[confirm].close_time(medium_period);
            if let Some(better) = refine_entry(lower, confirmed_at, direction, entry, stop) {
                debug!(symbol, from = entry, to = better, "entry refined on lower timeframe");
                entry = better;
            }
        }

        let risk = direction.favorable_move(stop, entry);
        let reward = direction.favorable_move(entry, target);
        let rr = reward / risk;
        if rr.is_nan() || rr < cfg.min_rr {
            return Err(NoSignalReason::RiskRewardTooLow);
        }

        let alignment_points: u8 = if bias == Bias::Neutral { 0 } else { 3 };
        let rr_points: u8 = if rr >= 2.0 * cfg.min_rr { 2 } else { 0 };
        let score = 5 + alignment_points + rr_points;
        EntrySignal::new(symbol, direction, entry, stop, target, score, SignalSource::Sweep)
            .map_err(|_| NoSignalReason::RiskRewardTooLow)
    }
}

/// First lower-timeframe close after `after` that improves on `entry`
/// without the candle touching `stop`.
fn refine_entry(
    lower: &[Candle],
    after: chrono::DateTime<chrono::Utc>,
    direction: Direction,
    entry: f64,
    stop: f64,
) -> Option<f64> {
    lower
        .iter()
        .filter(|c| c.open_time >= after)
        .find(|c| {
            let better = direction.favorable_move(c.close, entry) > 0.0;
            let clear = match direction {
                Direction::Long => c.low > stop,
                Direction::Short => c.high < stop,
            };
            better && clear
        })
        .map(|c| c.close)
}
