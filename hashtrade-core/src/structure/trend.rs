//! Trend classification from swing structure.
//!
//! The last two swing highs and last two swing lows are compared:
//! higher-high + higher-low is an uptrend, lower-high + lower-low a
//! downtrend, anything else (including equal prices) a range.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{Bias, Direction};
use crate::indicators::swing::{split_swings, SwingPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Uptrend,
    Downtrend,
    Range,
}

impl Trend {
    /// Trade direction that follows the trend. `None` for a range.
    pub fn direction(self) -> Option<Direction> {
        match self {
            Trend::Uptrend => Some(Direction::Long),
            Trend::Downtrend => Some(Direction::Short),
            Trend::Range => None,
        }
    }

    pub fn bias(self) -> Bias {
        match self {
            Trend::Uptrend => Bias::Bullish,
            Trend::Downtrend => Bias::Bearish,
            Trend::Range => Bias::Neutral,
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Uptrend => f.write_str("uptrend"),
            Trend::Downtrend => f.write_str("downtrend"),
            Trend::Range => f.write_str("range"),
        }
    }
}

/// Classify swing structure. Fewer than two highs or two lows is a range.
pub fn classify_trend(points: &[SwingPoint]) -> Trend {
    let (highs, lows) = split_swings(points);
    let (Some(h), Some(l)) = (last_two(&highs), last_two(&lows)) else {
        return Trend::Range;
    };

    let higher_high = h.1 > h.0;
    let lower_high = h.1 < h.0;
    let higher_low = l.1 > l.0;
    let lower_low = l.1 < l.0;

    if higher_high && higher_low {
        Trend::Uptrend
    } else if lower_high && lower_low {
        Trend::Downtrend
    } else {
        Trend::Range
    }
}

fn last_two(points: &[SwingPoint]) -> Option<(f64, f64)> {
    match points {
        [.., a, b] => Some((a.price, b.price)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::SwingKind;

    fn point(index: usize, price: f64, kind: SwingKind) -> SwingPoint {
        SwingPoint { index, price, kind }
    }

    fn structure(highs: [f64; 2], lows: [f64; 2]) -> Vec<SwingPoint> {
        vec![
            point(3, highs[0], SwingKind::High),
            point(6, lows[0], SwingKind::Low),
            point(9, highs[1], SwingKind::High),
            point(12, lows[1], SwingKind::Low),
        ]
    }

    #[test]
    fn higher_highs_and_lows_is_uptrend() {
        assert_eq!(classify_trend(&structure([110.0, 115.0], [100.0, 104.0])), Trend::Uptrend);
    }

    #[test]
    fn lower_highs_and_lows_is_downtrend() {
        assert_eq!(classify_trend(&structure([115.0, 110.0], [104.0, 100.0])), Trend::Downtrend);
    }

    #[test]
    fn mixed_or_equal_is_range() {
        assert_eq!(classify_trend(&structure([110.0, 115.0], [104.0, 100.0])), Trend::Range);
        assert_eq!(classify_trend(&structure([110.0, 110.0], [100.0, 104.0])), Trend::Range);
    }

    #[test]
    fn too_few_swings_is_range() {
        let points = vec![point(3, 110.0, SwingKind::High), point(6, 100.0, SwingKind::Low)];
        assert_eq!(classify_trend(&points), Trend::Range);
        assert_eq!(classify_trend(&[]).bias(), Bias::Neutral);
    }

    #[test]
    fn only_last_two_of_each_count() {
        let mut points = structure([110.0, 115.0], [100.0, 104.0]);
        points.insert(0, point(0, 200.0, SwingKind::High));
        assert_eq!(classify_trend(&points), Trend::Uptrend);
    }
}
