//! Trade direction and zone/pool sides.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a trade or position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1.0 for long, -1.0 for short. Multiplies a price move into signed profit.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    /// Signed favorable move from `entry` to `price` in price units.
    pub fn favorable_move(self, entry: f64, price: f64) -> f64 {
        (price - entry) * self.sign()
    }

    /// Direction implied by an entry/stop pair. `None` when they coincide.
    pub fn from_entry_stop(entry: f64, stop: f64) -> Option<Self> {
        if entry > stop {
            Some(Direction::Long)
        } else if entry < stop {
            Some(Direction::Short)
        } else {
            None
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => f.write_str("long"),
            Direction::Short => f.write_str("short"),
        }
    }
}

/// Directional bias of a zone or of market structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bias {
    Bullish,
    Bearish,
    Neutral,
}

impl Bias {
    /// True when the bias does not oppose a trade in `direction`.
    pub fn permits(self, direction: Direction) -> bool {
        matches!(
            (self, direction),
            (Bias::Neutral, _)
                | (Bias::Bullish, Direction::Long)
                | (Bias::Bearish, Direction::Short)
        )
    }
}

impl From<Direction> for Bias {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Long => Bias::Bullish,
            Direction::Short => Bias::Bearish,
        }
    }
}
