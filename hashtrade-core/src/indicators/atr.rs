//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! ATR uses Wilder smoothing (alpha = 1/period), seeded with the mean of the
//! first `period` true ranges that have a previous close (TR[1..=period]).
//! Lookback: period.

use super::{check_period, Indicator};
use crate::domain::Candle;
use crate::error::{EngineError, Result};

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Result<Self> {
        check_period(period, "ATR")?;
        Ok(Self {
            period,
            name: format!("atr_{period}"),
        })
    }
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, candles: &[Candle]) -> Result<Vec<f64>> {
        atr(candles, self.period)
    }
}

/// True Range series. TR[0] = high - low (no previous close).
pub fn true_range(candles: &[Candle]) -> Vec<f64> {
    candles
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let high_low = c.high - c.low;
            match i.checked_sub(1).map(|p| candles[p].close) {
                Some(pc) => high_low.max((c.high - pc).abs()).max((c.low - pc).abs()),
                None => high_low,
            }
        })
        .collect()
}

/// ATR over candles. Requires `candles.len() >= period + 1`.
///
/// A constant-price series yields an all-zero ATR after warmup; callers that
/// divide by ATR must treat zero explicitly.
pub fn atr(candles: &[Candle], period: usize) -> Result<Vec<f64>> {
    check_period(period, "ATR")?;
    let n = candles.len();
    if n < period + 1 {
        return Err(EngineError::InsufficientData {
            required: period + 1,
            actual: n,
        });
    }
    if let Some(i) = candles.iter().position(Candle::is_void) {
        return Err(EngineError::DataIntegrity(format!(
            "ATR input has NaN candle at index {i}"
        )));
    }

    let tr = true_range(candles);
    let mut result = vec![f64::NAN; n];

    let seed = tr[1..=period].iter().sum::<f64>() / period as f64;
    result[period] = seed;

    let alpha = 1.0 / period as f64;
    let mut prev = seed;
    for i in (period + 1)..n {
        let smoothed = alpha * tr[i] + (1.0 - alpha) * prev;
        result[i] = smoothed;
        prev = smoothed;
    }

    Ok(result)
}
