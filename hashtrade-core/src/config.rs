//! Serializable engine configuration.
//!
//! Every threshold the analyzers use lives here with its documented default,
//! so a TOML file only needs the values it overrides:
//!
//! ```toml
//! [structure]
//! min_score = 6
//!
//! [lifecycle.trigger]
//! type = "PROFIT_PCT"
//! pct = 1.0
//! ```

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{EngineError, Result};
use crate::lifecycle::PartialTrigger;

/// Top-level configuration: one section per component.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub structure: StructureConfig,
    pub liquidity: LiquidityConfig,
    pub range: RangeConfig,
    pub sizing: SizingConfig,
    pub lifecycle: LifecycleConfig,
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| EngineError::Config(format!("toml parse: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Config(format!("toml encode: {e}")))
    }

    /// Deterministic BLAKE3 digest of the canonical JSON form.
    ///
    /// Two configs with identical values produce identical fingerprints, so
    /// log lines and persisted state can be tied to the parameters that made them.
    pub fn fingerprint(&self) -> Result<String> {
        let json = serde_json::to_string(self)
            .map_err(|e| EngineError::Config(format!("fingerprint serialization: {e}")))?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    pub fn validate(&self) -> Result<()> {
        self.structure.validate()?;
        self.liquidity.validate()?;
        self.range.validate()?;
        self.sizing.validate()?;
        self.lifecycle.validate()
    }
}

fn ensure(cond: bool, msg: impl Into<String>) -> Result<()> {
    if cond {
        Ok(())
    } else {
        Err(EngineError::Config(msg.into()))
    }
}

/// Structure analyzer thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StructureConfig {
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub rsi_period: usize,
    pub atr_period: usize,
    pub swing_window: usize,
    /// Candles scanned for order blocks and fair-value gaps.
    pub zone_lookback: usize,
    /// Minimum displacement (percent) for the candle after an order block.
    pub order_block_min_move_pct: f64,
    /// Minimum gap (percent) for a fair-value gap.
    pub fvg_min_gap_pct: f64,
    /// Most-recent zones kept per kind.
    pub max_zones: usize,
    /// A zone counts as "near" when its entry edge is within this percent of price.
    pub zone_proximity_pct: f64,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    pub volume_window: usize,
    pub volume_ratio_threshold: f64,
    /// Stop distance in ATRs when no zone is available.
    pub atr_stop_multiplier: f64,
    /// Take-profit distance in multiples of risk.
    pub reward_multiple: f64,
    /// Recent swing points checked for a same-timeframe sweep.
    pub sweep_swings: usize,
    pub min_score: u8,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            ema_fast: 20,
            ema_slow: 50,
            rsi_period: 14,
            atr_period: 14,
            swing_window: 3,
            zone_lookback: 50,
            order_block_min_move_pct: 0.3,
            fvg_min_gap_pct: 0.1,
            max_zones: 5,
            zone_proximity_pct: 2.0,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            volume_window: 20,
            volume_ratio_threshold: 1.2,
            atr_stop_multiplier: 1.5,
            reward_multiple: 2.0,
            sweep_swings: 3,
            min_score: 5,
        }
    }
}

impl StructureConfig {
    /// Shortest series the analyzer accepts: longest indicator warmup plus the swing window.
    pub fn min_candles(&self) -> usize {
        self.ema_slow
            .max(self.ema_fast)
            .max(self.rsi_period + 1)
            .max(self.atr_period + 1)
            + self.swing_window
    }

    fn validate(&self) -> Result<()> {
        ensure(
            self.ema_fast > 0 && self.ema_slow > 0 && self.rsi_period > 0 && self.atr_period > 0,
            "structure: indicator periods must be >= 1",
        )?;
        ensure(self.ema_fast < self.ema_slow, "structure: ema_fast must be < ema_slow")?;
        ensure(self.swing_window > 0, "structure: swing_window must be >= 1")?;
        ensure(
            self.rsi_oversold < self.rsi_overbought,
            "structure: rsi_oversold must be < rsi_overbought",
        )?;
        ensure(
            self.atr_stop_multiplier > 0.0 && self.reward_multiple > 0.0,
            "structure: stop and reward multiples must be positive",
        )?;
        ensure(self.min_score <= 10, "structure: min_score must be <= 10")
    }
}

/// Liquidity engine thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LiquidityConfig {
    /// Higher-timeframe candles scanned for pools.
    pub pool_lookback: usize,
    pub swing_window: usize,
    /// Most recent medium-timeframe candles checked for a sweep.
    pub sweep_scan: usize,
    /// Candles after a sweep within which confirmation must close.
    pub confirmation_window: usize,
    /// Stop buffer beyond the sweep wick, percent.
    pub stop_buffer_pct: f64,
    pub min_rr: f64,
    pub min_medium_candles: usize,
}

impl Default for LiquidityConfig {
    fn default() -> Self {
        Self {
            pool_lookback: 100,
            swing_window: 3,
            sweep_scan: 10,
            confirmation_window: 5,
            stop_buffer_pct: 0.2,
            min_rr: 1.5,
            min_medium_candles: 20,
        }
    }
}

impl LiquidityConfig {
    fn validate(&self) -> Result<()> {
        ensure(self.swing_window > 0, "liquidity: swing_window must be >= 1")?;
        ensure(
            self.sweep_scan > 0 && self.confirmation_window > 0,
            "liquidity: sweep_scan and confirmation_window must be >= 1",
        )?;
        ensure(
            (0.0..10.0).contains(&self.stop_buffer_pct),
            "liquidity: stop_buffer_pct must be in [0, 10)",
        )?;
        ensure(self.min_rr > 0.0, "liquidity: min_rr must be positive")
    }
}

/// Range-breakout window and scan settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RangeConfig {
    /// Reference timezone for the daily window (IANA name).
    pub timezone: Tz,
    /// Local wall-clock hour the window opens.
    pub window_start_hour: u32,
    pub window_hours: u32,
    /// Most recent finer-timeframe candles scanned after the window closes.
    pub breakout_scan: usize,
    pub reward_multiple: f64,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::New_York,
            window_start_hour: 0,
            window_hours: 4,
            breakout_scan: 50,
            reward_multiple: 2.0,
        }
    }
}

impl RangeConfig {
    fn validate(&self) -> Result<()> {
        ensure(self.window_start_hour < 24, "range: window_start_hour must be < 24")?;
        ensure(
            (1..=24).contains(&self.window_hours),
            "range: window_hours must be in 1..=24",
        )?;
        ensure(self.breakout_scan >= 2, "range: breakout_scan must be >= 2")?;
        ensure(self.reward_multiple > 0.0, "range: reward_multiple must be positive")
    }
}

/// Sizing and leverage settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SizingConfig {
    /// Fraction of balance risked per trade (0.05 == 5 %).
    pub risk_pct: f64,
    pub min_rr: f64,
    pub min_leverage: u32,
    pub max_leverage: u32,
    /// Margin below this (quote units) is flagged.
    pub min_margin: f64,
    /// Margin above this fraction of balance is flagged.
    pub max_margin_fraction: f64,
    pub wide_stop_pct: f64,
    pub tight_stop_pct: f64,
    /// ATR % below which volatility is "low".
    pub low_volatility_atr_pct: f64,
    /// ATR % above which volatility is "high".
    pub high_volatility_atr_pct: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            risk_pct: 0.05,
            min_rr: 1.5,
            min_leverage: 5,
            max_leverage: 30,
            min_margin: 5.0,
            max_margin_fraction: 0.5,
            wide_stop_pct: 5.0,
            tight_stop_pct: 0.2,
            low_volatility_atr_pct: 0.5,
            high_volatility_atr_pct: 1.5,
        }
    }
}

impl SizingConfig {
    fn validate(&self) -> Result<()> {
        ensure(
            self.risk_pct > 0.0 && self.risk_pct <= 1.0,
            "sizing: risk_pct must be in (0, 1]",
        )?;
        ensure(
            self.min_leverage >= 1 && self.min_leverage <= self.max_leverage,
            "sizing: leverage bounds must satisfy 1 <= min <= max",
        )?;
        ensure(
            self.low_volatility_atr_pct < self.high_volatility_atr_pct,
            "sizing: low volatility threshold must be below high",
        )
    }
}

/// Position lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LifecycleConfig {
    pub trigger: PartialTrigger,
    /// Fraction of the position closed at the partial trigger.
    pub partial_fraction: f64,
    /// Trailing distance after breakeven (0.01 == 1 %). `None` disables trailing.
    pub trail_pct: Option<f64>,
    /// Quantity ratio band (current / previous) recognized as an external partial close.
    pub external_partial_band: (f64, f64),
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            trigger: PartialTrigger::default(),
            partial_fraction: 0.5,
            trail_pct: None,
            external_partial_band: (0.4, 0.6),
        }
    }
}

impl LifecycleConfig {
    fn validate(&self) -> Result<()> {
        ensure(
            self.partial_fraction > 0.0 && self.partial_fraction < 1.0,
            "lifecycle: partial_fraction must be in (0, 1)",
        )?;
        ensure(self.trigger.threshold() > 0.0, "lifecycle: trigger threshold must be positive")?;
        if let Some(trail) = self.trail_pct {
            ensure(trail > 0.0 && trail < 1.0, "lifecycle: trail_pct must be in (0, 1)")?;
        }
        let (lo, hi) = self.external_partial_band;
        ensure(
            0.0 < lo && lo < hi && hi < 1.0,
            "lifecycle: external_partial_band must satisfy 0 < lo < hi < 1",
        )
    }
}
