//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (period + 1)
//! Seed: EMA[period-1] = SMA of the first `period` values.
//! Lookback: period - 1.

use super::{check_finite, check_period, Indicator};
use crate::domain::candle::{closes, Candle};
use crate::error::{EngineError, Result};

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Result<Self> {
        check_period(period, "EMA")?;
        Ok(Self {
            period,
            name: format!("ema_{period}"),
        })
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, candles: &[Candle]) -> Result<Vec<f64>> {
        ema(&closes(candles), self.period)
    }
}

/// EMA of an arbitrary series. Requires `series.len() >= period`.
pub fn ema(series: &[f64], period: usize) -> Result<Vec<f64>> {
    check_period(period, "EMA")?;
    if series.len() < period {
        return Err(EngineError::InsufficientData {
            required: period,
            actual: series.len(),
        });
    }
    check_finite(series, "EMA")?;

    let n = series.len();
    let mut result = vec![f64::NAN; n];
    let alpha = 2.0 / (period as f64 + 1.0);

    let seed = series[..period].iter().sum::<f64>() / period as f64;
    result[period - 1] = seed;

    let mut prev = seed;
    for i in period..n {
        let value = alpha * series[i] + (1.0 - alpha) * prev;
        result[i] = value;
        prev = value;
    }

    Ok(result)
}
