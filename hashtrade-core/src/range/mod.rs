//! Range-breakout detector.
//!
//! The daily window (local 00:00-04:00 by default) defines a high/low range.
//! After it closes, finer-timeframe closes are scanned for a breakout outside
//! the range followed by a close back inside. Stop is the excursion extreme
//! and take-profit a fixed reward multiple of risk.

pub mod breakout;
pub mod store;
pub mod window;

pub use breakout::{track_breakout, BreakoutState, BreakoutTrack, Retest};
pub use store::{JsonRangeStore, MemoryRangeStore, RangeWindowStore};
pub use window::{build_window, session_date, window_bounds, RangeWindow};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::RangeConfig;
use crate::domain::{closed_candles, validate_candles, Candle, EntrySignal, SignalSource, Timeframe};
use crate::error::{EngineError, Result};

/// Score attached to range-breakout signals.
pub const RANGE_SIGNAL_SCORE: u8 = 6;

/// Candles of one timeframe.
#[derive(Debug, Clone, Copy)]
pub struct Series<'a> {
    pub candles: &'a [Candle],
    pub timeframe: Timeframe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeScan {
    pub window: RangeWindow,
    pub state: BreakoutState,
    pub signal: Option<EntrySignal>,
}

#[derive(Debug, Clone, Default)]
pub struct RangeDetector {
    config: RangeConfig,
}

impl RangeDetector {
    pub fn new(config: RangeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RangeConfig {
        &self.config
    }

    /// Build today's window from `window_series`, then scan `finer`.
    pub fn detect(
        &self,
        symbol: &str,
        window_series: Series<'_>,
        finer: Series<'_>,
        now: DateTime<Utc>,
    ) -> Result<RangeScan> {
        let window = self.window(symbol, window_series, now)?;
        self.scan(&window, finer, now)
    }

    /// Today's closed window.
    pub fn window(
        &self,
        symbol: &str,
        series: Series<'_>,
        now: DateTime<Utc>,
    ) -> Result<RangeWindow> {
        validate_candles(series.candles)?;
        let date = session_date(now, &self.config)?;
        let closed = closed_candles(series.candles, series.timeframe, now);
        build_window(symbol, closed, series.timeframe, date, now, &self.config)
    }

    /// Scan closed `finer` candles at or after the window end.
    pub fn scan(
        &self,
        window: &RangeWindow,
        finer: Series<'_>,
        now: DateTime<Utc>,
    ) -> Result<RangeScan> {
        // Windows may come back from a store rather than `build_window`.
        if !(window.width() > 0.0) {
            return Err(EngineError::DegenerateRange {
                high: window.high,
                low: window.low,
            });
        }
        validate_candles(finer.candles)?;
        let closed = closed_candles(finer.candles, finer.timeframe, now);
        let after: Vec<Candle> = closed
            .iter()
            .filter(|c| c.open_time >= window.end)
            .cloned()
            .collect();
        let recent = &after[after.len().saturating_sub(self.config.breakout_scan)..];

        let track = track_breakout(window, recent);
        let signal = track.retest.and_then(|r| self.signal(window, &r));
        if signal.is_none() {
            debug!(symbol = %window.symbol, state = %track.state, "no range signal");
        }

        Ok(RangeScan {
            window: window.clone(),
            state: track.state,
            signal,
        })
    }

    fn signal(&self, window: &RangeWindow, retest: &Retest) -> Option<EntrySignal> {
        let direction = retest.direction;
        let risk = direction.favorable_move(retest.extreme, retest.entry);
        let target = retest.entry + direction.sign() * risk * self.config.reward_multiple;

        match EntrySignal::new(
            window.symbol.clone(),
            direction,
            retest.entry,
            retest.extreme,
            target,
            RANGE_SIGNAL_SCORE,
            SignalSource::RangeBreakout,
        ) {
            Ok(signal) => {
                info!(
                    symbol = %window.symbol,
                    %direction,
                    entry = retest.entry,
                    stop = retest.extreme,
                    target,
                    range_high = window.high,
                    range_low = window.low,
                    "range breakout retest signal"
                );
                Some(signal)
            }
            Err(e) => {
                debug!(symbol = %window.symbol, error = %e, "range candidate rejected");
                None
            }
        }
    }
}
