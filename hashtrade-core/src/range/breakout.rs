//! Breakout-then-retest state machine over finer-timeframe closes.
//!
//! Only closes move the state; wicks never trigger a breakout. A close below
//! the range low starts a low-side excursion and a later close back inside
//! completes a long retest (short mirrors this). A close through the
//! opposite side restarts the excursion from there.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::window::RangeWindow;
use crate::domain::{Candle, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakoutState {
    Inside,
    BreakingHigh,
    BreakingLow,
    RetestLong,
    RetestShort,
}

impl fmt::Display for BreakoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BreakoutState::Inside => "inside",
            BreakoutState::BreakingHigh => "breaking_high",
            BreakoutState::BreakingLow => "breaking_low",
            BreakoutState::RetestLong => "retest_long",
            BreakoutState::RetestShort => "retest_short",
        };
        f.write_str(text)
    }
}

/// A completed retest on the latest candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Retest {
    pub direction: Direction,
    /// Close of the retest candle.
    pub entry: f64,
    /// Extreme of the outside excursion, retest candle included.
    pub extreme: f64,
    pub breakout_index: usize,
    pub retest_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakoutTrack {
    pub state: BreakoutState,
    /// Set only when the state is a retest.
    pub retest: Option<Retest>,
}

/// Run the state machine over `candles` (window-relative indices).
pub fn track_breakout(window: &RangeWindow, candles: &[Candle]) -> BreakoutTrack {
    let mut state = BreakoutState::Inside;
    let mut extreme = f64::NAN;
    let mut breakout_index = 0;
    let mut retest = None;

    for (i, c) in candles.iter().enumerate() {
        retest = None;
        let above = c.close > window.high;
        let below = c.close < window.low;

        state = match state {
            BreakoutState::BreakingLow if !above => {
                extreme = extreme.min(c.low);
                if below {
                    BreakoutState::BreakingLow
                } else {
                    retest = Some(Retest {
                        direction: Direction::Long,
                        entry: c.close,
                        extreme,
                        breakout_index,
                        retest_index: i,
                    });
                    BreakoutState::RetestLong
                }
            }
            BreakoutState::BreakingHigh if !below => {
                extreme = extreme.max(c.high);
                if above {
                    BreakoutState::BreakingHigh
                } else {
                    retest = Some(Retest {
                        direction: Direction::Short,
                        entry: c.close,
                        extreme,
                        breakout_index,
                        retest_index: i,
                    });
                    BreakoutState::RetestShort
                }
            }
            _ if below => {
                extreme = c.low;
                breakout_index = i;
                BreakoutState::BreakingLow
            }
            _ if above => {
                extreme = c.high;
                breakout_index = i;
                BreakoutState::BreakingHigh
            }
            _ => BreakoutState::Inside,
        };
    }

    BreakoutTrack { state, retest }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    fn window() -> RangeWindow {
        RangeWindow {
            symbol: "BTCUSDT".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            start: Utc.with_ymd_and_hms(2024, 1, 5, 5, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap(),
            high: 110.0,
            low: 100.0,
            closed: true,
        }
    }

    /// (low, close, high) per 5-minute candle.
    fn bars(data: &[(f64, f64, f64)]) -> Vec<Candle> {
        let base = Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap();
        data.iter()
            .enumerate()
            .map(|(i, &(l, c, h))| {
                Candle::new(base + Duration::minutes(5 * i as i64), c, h, l, c, 1.0)
            })
            .collect()
    }

    #[test]
    fn low_breakout_then_close_inside_is_long_retest() {
        let track = track_breakout(
            &window(),
            &bars(&[
                (104.0, 105.0, 106.0),
                (98.0, 99.0, 101.0),
                (97.0, 98.5, 99.5),
                (98.0, 101.0, 101.5),
            ]),
        );
        assert_eq!(track.state, BreakoutState::RetestLong);
        let retest = track.retest.unwrap();
        assert_eq!(retest.direction, Direction::Long);
        assert_eq!(retest.entry, 101.0);
        assert_eq!(retest.extreme, 97.0);
        assert_eq!(retest.breakout_index, 1);
        assert_eq!(retest.retest_index, 3);
    }

    #[test]
    fn wick_outside_is_not_a_breakout() {
        let track = track_breakout(
            &window(),
            &bars(&[(95.0, 101.0, 105.0), (104.0, 106.0, 115.0)]),
        );
        assert_eq!(track.state, BreakoutState::Inside);
        assert!(track.retest.is_none());
    }

    #[test]
    fn breakout_without_retest_stays_breaking() {
        let track = track_breakout(
            &window(),
            &bars(&[(109.0, 111.0, 112.0), (110.5, 112.0, 113.0)]),
        );
        assert_eq!(track.state, BreakoutState::BreakingHigh);
        assert!(track.retest.is_none());
    }

    #[test]
    fn stale_retest_is_not_reported() {
        let track = track_breakout(
            &window(),
            &bars(&[(109.0, 111.0, 112.0), (107.0, 108.0, 111.5), (106.0, 107.0, 108.5)]),
        );
        assert_eq!(track.state, BreakoutState::Inside);
        assert!(track.retest.is_none());
    }

    #[test]
    fn close_through_far_side_restarts_excursion() {
        let track = track_breakout(&window(), &bars(&[(98.0, 99.0, 100.5), (99.0, 111.0, 112.0)]));
        assert_eq!(track.state, BreakoutState::BreakingHigh);
    }
}
