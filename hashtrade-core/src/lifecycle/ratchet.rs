//! Ratchet invariant enforcement
//!
//! **Core Rule:** Stops may tighten, never loosen.
//!
//! A trailing stop recomputed from a pullback would otherwise hand back
//! locked-in profit on the remaining quantity.

use crate::domain::Direction;

/// Stop level that only moves in the position's favor.
///
/// - Long positions: stop can only rise
/// - Short positions: stop can only fall
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ratchet {
    level: Option<f64>,
    direction: Direction,
}

impl Ratchet {
    pub fn new(direction: Direction) -> Self {
        Self {
            level: None,
            direction,
        }
    }

    pub fn with_level(direction: Direction, level: f64) -> Self {
        Self {
            level: Some(level),
            direction,
        }
    }

    /// Apply a proposed level and return the ratcheted one.
    ///
    /// # Example
    /// ```
    /// use hashtrade_core::domain::Direction;
    /// use hashtrade_core::lifecycle::Ratchet;
    ///
    /// let mut ratchet = Ratchet::with_level(Direction::Long, 95.0);
    /// assert_eq!(ratchet.apply(100.0), 100.0);
    /// // Loosening is blocked.
    /// assert_eq!(ratchet.apply(90.0), 100.0);
    /// ```
    pub fn apply(&mut self, proposed: f64) -> f64 {
        let next = match self.level {
            None => proposed,
            Some(current) => match self.direction {
                Direction::Long => current.max(proposed),
                Direction::Short => current.min(proposed),
            },
        };
        self.level = Some(next);
        next
    }

    /// True when `candidate` is strictly tighter than the current level.
    pub fn would_tighten(&self, candidate: f64) -> bool {
        match self.level {
            None => true,
            Some(current) => match self.direction {
                Direction::Long => candidate > current,
                Direction::Short => candidate < current,
            },
        }
    }

    pub fn level(&self) -> Option<f64> {
        self.level
    }
}
