//! Position sizing.
//!
//! # Formula
//! ```text
//! risk_amount = balance * risk_pct
//! quantity    = risk_amount / |entry - stop| / entry      (base units)
//! margin      = quantity * entry / leverage
//! ```
//!
//! # Example
//! - Balance: $10,000, risk 2 % ($200)
//! - Entry $100, stop $95 ($5 away)
//! - Quantity: 200 / 5 / 100 = 0.4

pub mod leverage;

pub use leverage::{select_leverage, LeverageBounds, Volatility, MAX_LEVERAGE, MIN_LEVERAGE};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SizingConfig;
use crate::domain::EntrySignal;
use crate::error::{EngineError, Result};

/// Entry and stop closer than this are treated as equal.
pub const MIN_STOP_DISTANCE: f64 = 1e-9;

/// Quantity in base-asset units for a given risk budget.
///
/// `leverage` does not change the quantity, only the margin it ties up; it
/// must still be at least 1.
pub fn size(balance: f64, entry: f64, stop: f64, risk_pct: f64, leverage: u32) -> Result<f64> {
    if !(balance.is_finite() && balance > 0.0) {
        return Err(EngineError::InvalidInput(format!("balance must be positive, got {balance}")));
    }
    if !(entry.is_finite() && entry > 0.0) {
        return Err(EngineError::InvalidInput(format!("entry must be positive, got {entry}")));
    }
    if !(risk_pct > 0.0 && risk_pct <= 1.0) {
        return Err(EngineError::InvalidInput(format!(
            "risk_pct must be in (0, 1], got {risk_pct}"
        )));
    }
    if leverage == 0 {
        return Err(EngineError::InvalidInput("leverage must be >= 1".into()));
    }
    let distance = (entry - stop).abs();
    if !distance.is_finite() || distance <= MIN_STOP_DISTANCE {
        return Err(EngineError::InvalidStopDistance { entry, stop });
    }
    Ok(balance * risk_pct / distance / entry)
}

/// Exchange quantity rules for an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstrumentRules {
    pub qty_step: f64,
    pub min_qty: f64,
}

impl InstrumentRules {
    /// Round down to a whole number of steps.
    pub fn round_down(&self, quantity: f64) -> f64 {
        if self.qty_step <= 0.0 {
            return quantity;
        }
        // Absorb float noise such as 0.3 / 0.1 = 2.9999999999999996.
        (quantity / self.qty_step + 1e-9).floor() * self.qty_step
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SizingWarning {
    MarginBelowMinimum { margin: f64, minimum: f64 },
    MarginAboveLimit { margin: f64, limit: f64 },
    StopTooWide { distance_pct: f64 },
    StopTooTight { distance_pct: f64 },
    /// Half the quantity rounds below the exchange minimum.
    CannotSplitForPartial { quantity: f64, min_qty: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionPlan {
    pub quantity: f64,
    pub leverage: u32,
    pub margin_required: f64,
    pub notional: f64,
    /// Quote-currency risk budget (`balance * risk_pct`).
    pub risk_amount: f64,
    pub stop_distance_pct: f64,
    /// Realized reward:risk when a take-profit was supplied.
    pub risk_reward: Option<f64>,
    pub warnings: Vec<SizingWarning>,
}

/// Market context for one plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanRequest {
    pub balance: f64,
    pub entry: f64,
    pub stop: f64,
    pub take_profit: Option<f64>,
    pub volatility: Volatility,
    pub bounds: LeverageBounds,
    pub rules: Option<InstrumentRules>,
}

#[derive(Debug, Clone, Default)]
pub struct PositionSizer {
    config: SizingConfig,
}

impl PositionSizer {
    pub fn new(config: SizingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SizingConfig {
        &self.config
    }

    /// Volatility class for an ATR percent reading.
    pub fn classify_volatility(&self, atr_pct: f64) -> Volatility {
        Volatility::from_atr_pct(
            atr_pct,
            self.config.low_volatility_atr_pct,
            self.config.high_volatility_atr_pct,
        )
    }

    /// Plan without a target check.
    pub fn plan(&self, request: &PlanRequest) -> Result<PositionPlan> {
        let cfg = &self.config;
        let distance = (request.entry - request.stop).abs();
        if !distance.is_finite() || distance <= MIN_STOP_DISTANCE {
            return Err(EngineError::InvalidStopDistance {
                entry: request.entry,
                stop: request.stop,
            });
        }
        let stop_distance_pct = distance / request.entry * 100.0;
        let bounds = request
            .bounds
            .intersect(LeverageBounds {
                min: cfg.min_leverage,
                max: cfg.max_leverage,
            })
            .ok_or_else(|| {
                EngineError::InvalidInput("leverage bounds do not overlap configured range".into())
            })?;

        let leverage = select_leverage(stop_distance_pct, request.volatility, bounds)?;
        let mut quantity = size(
            request.balance,
            request.entry,
            request.stop,
            cfg.risk_pct,
            leverage,
        )?;

        let mut warnings = Vec::new();
        if let Some(rules) = request.rules {
            quantity = rules.round_down(quantity);
            if quantity < rules.min_qty || quantity <= 0.0 {
                return Err(EngineError::InvalidInput(format!(
                    "quantity {quantity} below exchange minimum {}",
                    rules.min_qty
                )));
            }
            if rules.round_down(quantity * 0.5) < rules.min_qty {
                warnings.push(SizingWarning::CannotSplitForPartial {
                    quantity,
                    min_qty: rules.min_qty,
                });
            }
        }

        let notional = quantity * request.entry;
        let margin_required = notional / f64::from(leverage);
        let risk_amount = request.balance * cfg.risk_pct;

        if margin_required < cfg.min_margin {
            warnings.push(SizingWarning::MarginBelowMinimum {
                margin: margin_required,
                minimum: cfg.min_margin,
            });
        }
        let limit = request.balance * cfg.max_margin_fraction;
        if margin_required > limit {
            warnings.push(SizingWarning::MarginAboveLimit {
                margin: margin_required,
                limit,
            });
        }
        if stop_distance_pct > cfg.wide_stop_pct {
            warnings.push(SizingWarning::StopTooWide {
                distance_pct: stop_distance_pct,
            });
        }
        if stop_distance_pct < cfg.tight_stop_pct {
            warnings.push(SizingWarning::StopTooTight {
                distance_pct: stop_distance_pct,
            });
        }

        let risk_reward = request
            .take_profit
            .map(|tp| (tp - request.entry).abs() / distance);

        debug!(
            quantity,
            leverage,
            margin = margin_required,
            stop_pct = stop_distance_pct,
            warnings = warnings.len(),
            "position planned"
        );

        Ok(PositionPlan {
            quantity,
            leverage,
            margin_required,
            notional,
            risk_amount,
            stop_distance_pct,
            risk_reward,
            warnings,
        })
    }

    /// Plan that also checks the realized reward:risk against `min_rr`.
    ///
    /// A take-profit on the wrong side of entry counts as zero reward.
    pub fn plan_dynamic(
        &self,
        request: &PlanRequest,
        take_profit: f64,
        min_rr: f64,
    ) -> Result<PositionPlan> {
        let risk = (request.entry - request.stop).abs();
        if !risk.is_finite() || risk <= MIN_STOP_DISTANCE {
            return Err(EngineError::InvalidStopDistance {
                entry: request.entry,
                stop: request.stop,
            });
        }
        let long = request.entry > request.stop;
        let reward = if long {
            take_profit - request.entry
        } else {
            request.entry - take_profit
        };
        let realized = reward.max(0.0) / risk;
        if realized.is_nan() || realized < min_rr {
            return Err(EngineError::UnfavorableRR {
                realized,
                minimum: min_rr,
            });
        }
        self.plan(&PlanRequest {
            take_profit: Some(take_profit),
            ..*request
        })
    }

    /// Plan for an entry signal using the configured minimum R:R.
    pub fn plan_signal(
        &self,
        balance: f64,
        signal: &EntrySignal,
        volatility: Volatility,
        bounds: LeverageBounds,
        rules: Option<InstrumentRules>,
    ) -> Result<PositionPlan> {
        let request = PlanRequest {
            balance,
            entry: signal.entry_price,
            stop: signal.stop_loss,
            take_profit: Some(signal.take_profit),
            volatility,
            bounds,
            rules,
        };
        self.plan_dynamic(&request, signal.take_profit, self.config.min_rr)
    }
}
