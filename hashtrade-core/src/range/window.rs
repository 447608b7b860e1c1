//! Daily reference window, anchored to local wall-clock time.
//!
//! Bounds are computed in the configured IANA timezone, so the window opens
//! at the same local hour on both sides of a daylight-saving change and its
//! UTC start moves by exactly the DST delta.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::config::RangeConfig;
use crate::domain::{Candle, Timeframe};
use crate::error::{EngineError, Result};

/// High/low of the daily window for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeWindow {
    pub symbol: String,
    /// Local session date in the reference timezone.
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub high: f64,
    pub low: f64,
    pub closed: bool,
}

impl RangeWindow {
    pub fn width(&self) -> f64 {
        self.high - self.low
    }
}

/// UTC bounds of the window on local `date`.
///
/// A start hour that falls in a spring-forward gap resolves to the first
/// valid local instant after it.
pub fn window_bounds(
    date: NaiveDate,
    config: &RangeConfig,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let tz: Tz = config.timezone;
    let time = NaiveTime::from_hms_opt(config.window_start_hour, 0, 0).ok_or_else(|| {
        EngineError::Config(format!("invalid window start hour {}", config.window_start_hour))
    })?;
    let local = date.and_time(time);

    let start = tz
        .from_local_datetime(&local)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(local + Duration::hours(1))).earliest())
        .ok_or_else(|| EngineError::Config(format!("no local instant for {local} in {tz}")))?
        .with_timezone(&Utc);

    Ok((start, start + Duration::hours(i64::from(config.window_hours))))
}

/// Session date that `now` belongs to: today's local date, or yesterday's
/// when `now` is before today's window opens.
pub fn session_date(now: DateTime<Utc>, config: &RangeConfig) -> Result<NaiveDate> {
    let today = now.with_timezone(&config.timezone).date_naive();
    let (start, _) = window_bounds(today, config)?;
    if now >= start {
        Ok(today)
    } else {
        today
            .pred_opt()
            .ok_or_else(|| EngineError::InvalidInput(format!("no date before {today}")))
    }
}

/// Aggregate the window from candles of `timeframe`.
///
/// Fails with `WindowNotClosed` before the window ends, `InsufficientData`
/// when the candles do not cover the whole window, and `DegenerateRange`
/// when high equals low.
pub fn build_window(
    symbol: &str,
    candles: &[Candle],
    timeframe: Timeframe,
    date: NaiveDate,
    now: DateTime<Utc>,
    config: &RangeConfig,
) -> Result<RangeWindow> {
    let (start, end) = window_bounds(date, config)?;
    if now < end {
        return Err(EngineError::WindowNotClosed { window_end: end });
    }

    let period = timeframe.duration();
    let span = end - start;
    if period > span || span.num_seconds() % period.num_seconds() != 0 {
        return Err(EngineError::InvalidInput(format!(
            "{timeframe} candles cannot tile a {}h window",
            config.window_hours
        )));
    }
    let required = (span.num_seconds() / period.num_seconds()) as usize;

    let inside: Vec<&Candle> = candles
        .iter()
        .filter(|c| c.open_time >= start && c.close_time(period) <= end)
        .collect();
    if inside.len() < required {
        return Err(EngineError::InsufficientData {
            required,
            actual: inside.len(),
        });
    }

    let high = inside.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    let low = inside.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    if high <= low {
        return Err(EngineError::DegenerateRange { high, low });
    }

    Ok(RangeWindow {
        symbol: symbol.to_string(),
        date,
        start,
        end,
        high,
        low,
        closed: true,
    })
}
