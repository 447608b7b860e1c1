//! Candle: the fundamental market data unit.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::Timeframe;
use crate::error::{EngineError, Result};

/// OHLCV candle for one symbol on one timeframe.
///
/// Sequences are ordered by strictly increasing `open_time` and are immutable
/// once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(
        open_time: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Returns true if any OHLCV field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.volume.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, body inside the wicks, positive prices.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.low > 0.0
            && self.volume >= 0.0
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Instant the candle closes for a given period.
    pub fn close_time(&self, period: Duration) -> DateTime<Utc> {
        self.open_time + period
    }
}

/// Validate a candle sequence before analysis.
///
/// Fails with `DataIntegrity` on non-monotonic timestamps, NaN fields or
/// impossible OHLC relationships. An empty slice is valid.
pub fn validate_candles(candles: &[Candle]) -> Result<()> {
    for (i, candle) in candles.iter().enumerate() {
        if !candle.is_sane() {
            return Err(EngineError::DataIntegrity(format!(
                "candle {i} at {} fails OHLC sanity (o={}, h={}, l={}, c={})",
                candle.open_time, candle.open, candle.high, candle.low, candle.close
            )));
        }
        if i > 0 && candle.open_time <= candles[i - 1].open_time {
            return Err(EngineError::DataIntegrity(format!(
                "non-monotonic open time at index {i}: {} follows {}",
                candle.open_time,
                candles[i - 1].open_time
            )));
        }
    }
    Ok(())
}

/// Drop a trailing candle that is still forming at `now`.
///
/// Only the last candle can be forming; everything before it is complete by
/// construction of an ordered exchange feed.
pub fn closed_candles(candles: &[Candle], timeframe: Timeframe, now: DateTime<Utc>) -> &[Candle] {
    match candles.last() {
        Some(last) if last.close_time(timeframe.duration()) > now => &candles[..candles.len() - 1],
        _ => candles,
    }
}

/// Spacing between consecutive candles, taken as the smallest positive gap.
///
/// Returns `None` for fewer than two candles.
pub fn infer_period(candles: &[Candle]) -> Option<Duration> {
    candles
        .windows(2)
        .map(|w| w[1].open_time - w[0].open_time)
        .filter(|d| *d > Duration::zero())
        .min()
}

/// Fail with `InsufficientData` unless `candles` holds at least `required` entries.
pub fn require_len(candles: &[Candle], required: usize) -> Result<()> {
    if candles.len() < required {
        return Err(EngineError::InsufficientData {
            required,
            actual: candles.len(),
        });
    }
    Ok(())
}

pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// Build synthetic candles from close prices for testing.
///
/// open = previous close (or close for the first candle),
/// high = max(open, close) + 1.0, low = min(open, close) - 1.0, 15-minute spacing.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    use chrono::TimeZone;
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle {
                open_time: base + Duration::minutes(15 * i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_candle() -> Candle {
        Candle::new(
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            100.0,
            105.0,
            98.0,
            103.0,
            50_000.0,
        )
    }

    #[test]
    fn candle_is_sane() {
        assert!(sample_candle().is_sane());
        assert!(sample_candle().is_bullish());
    }

    #[test]
    fn candle_detects_void() {
        let mut candle = sample_candle();
        candle.open = f64::NAN;
        assert!(candle.is_void());
        assert!(!candle.is_sane());
    }

    #[test]
    fn candle_detects_insane_high_low() {
        let mut candle = sample_candle();
        candle.high = 97.0;
        assert!(!candle.is_sane());
    }

    #[test]
    fn validate_rejects_non_monotonic_times() {
        let mut candles = make_candles(&[100.0, 101.0, 102.0]);
        candles[2].open_time = candles[1].open_time;
        let err = validate_candles(&candles).unwrap_err();
        assert!(matches!(err, EngineError::DataIntegrity(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn validate_accepts_clean_series() {
        assert!(validate_candles(&make_candles(&[100.0, 101.0, 99.0])).is_ok());
        assert!(validate_candles(&[]).is_ok());
    }

    #[test]
    fn closed_candles_drops_forming_tail() {
        let candles = make_candles(&[100.0, 101.0, 102.0]);
        // Third candle opens at 00:30 and closes at 00:45.
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 40, 0).unwrap();
        assert_eq!(closed_candles(&candles, Timeframe::M15, now).len(), 2);
        let later = Utc.with_ymd_and_hms(2024, 1, 2, 0, 45, 0).unwrap();
        assert_eq!(closed_candles(&candles, Timeframe::M15, later).len(), 3);
    }

    #[test]
    fn infer_period_from_spacing() {
        let candles = make_candles(&[100.0, 101.0, 102.0]);
        assert_eq!(infer_period(&candles), Some(Duration::minutes(15)));
        assert_eq!(infer_period(&candles[..1]), None);
    }

    #[test]
    fn candle_serialization_roundtrip() {
        let candle = sample_candle();
        let json = serde_json::to_string(&candle).unwrap();
        let deser: Candle = serde_json::from_str(&json).unwrap();
        assert_eq!(candle, deser);
    }
}
