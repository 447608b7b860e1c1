//! Engine error taxonomy.
//!
//! Every public operation returns either a value or one of these classified
//! errors. "No signal this cycle" is not an error: scanners return
//! `Option<EntrySignal>` for that. The variants split into two groups:
//!
//! - recoverable: skip the symbol, retry next cycle, discard the candidate or
//!   garbage-collect a record (`is_recoverable() == true`)
//! - integrity/infrastructure failures the orchestrator should log and alert on

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("insufficient data: need {required} candles, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("window not closed: closes at {window_end}")]
    WindowNotClosed { window_end: DateTime<Utc> },

    #[error("invalid stop distance: entry {entry}, stop {stop}")]
    InvalidStopDistance { entry: f64, stop: f64 },

    #[error("unfavorable risk:reward {realized:.2} < minimum {minimum:.2}")]
    UnfavorableRR { realized: f64, minimum: f64 },

    #[error("stale state: record for {key} has no open position")]
    StaleState { key: String },

    #[error("degenerate range: high {high} <= low {low}")]
    DegenerateRange { high: f64, low: f64 },

    #[error("data integrity error: {0}")]
    DataIntegrity(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(String),
}

impl EngineError {
    /// True for outcomes the caller handles locally (skip, retry, discard, GC).
    ///
    /// False for malformed data, bad configuration and persistence failures,
    /// which must be surfaced distinctly from "no signal".
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::InsufficientData { .. }
                | EngineError::WindowNotClosed { .. }
                | EngineError::InvalidStopDistance { .. }
                | EngineError::UnfavorableRR { .. }
                | EngineError::StaleState { .. }
                | EngineError::DegenerateRange { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
