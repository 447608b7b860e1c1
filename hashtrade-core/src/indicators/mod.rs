//! Indicator library: stateless numeric transforms over ordered candles.
//!
//! Every transform returns a series the same length as its input, with the
//! warmup prefix filled with `f64::NAN`. Inputs shorter than the transform's
//! minimum length fail with `InsufficientData` instead of yielding an all-NaN
//! series, and non-finite inputs fail with `DataIntegrity`.

pub mod atr;
pub mod ema;
pub mod rsi;
pub mod swing;

pub use atr::{atr, true_range, Atr};
pub use ema::{ema, Ema};
pub use rsi::{rsi, Rsi};
pub use swing::{swing_points, SwingKind, SwingPoint};

use crate::domain::Candle;
use crate::error::{EngineError, Result};

/// Trait for candle-driven indicators.
///
/// # Look-ahead contamination guard
/// No value at index t may depend on candles after t. Swing points are not
/// an `Indicator` for exactly this reason: they need `window` candles of
/// lookahead.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ema_20", "atr_14").
    fn name(&self) -> &str;

    /// Number of candles before the first valid output.
    fn lookback(&self) -> usize;

    /// Minimum input length accepted by `compute`.
    fn min_len(&self) -> usize {
        self.lookback() + 1
    }

    /// Compute the full series. The first `lookback()` values are NaN.
    fn compute(&self, candles: &[Candle]) -> Result<Vec<f64>>;

    /// Most recent value, if the series is long enough.
    fn latest(&self, candles: &[Candle]) -> Result<f64> {
        let series = self.compute(candles)?;
        series
            .last()
            .copied()
            .filter(|v| v.is_finite())
            .ok_or(EngineError::InsufficientData {
                required: self.min_len(),
                actual: candles.len(),
            })
    }
}

pub(crate) fn check_period(period: usize, what: &str) -> Result<()> {
    if period == 0 {
        return Err(EngineError::InvalidInput(format!("{what} period must be >= 1")));
    }
    Ok(())
}

pub(crate) fn check_finite(series: &[f64], what: &str) -> Result<()> {
    match series.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(EngineError::DataIntegrity(format!(
            "{what} input has non-finite value at index {i}"
        ))),
        None => Ok(()),
    }
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
