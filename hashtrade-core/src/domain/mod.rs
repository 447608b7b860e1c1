//! Domain types for the analysis and risk engine.

pub mod candle;
pub mod position;
pub mod side;
pub mod signal;
pub mod symbol;
pub mod timeframe;

pub use candle::{closed_candles, infer_period, validate_candles, Candle};
pub use position::{AccountSnapshot, PositionKey, PositionSnapshot};
pub use side::{Bias, Direction};
pub use signal::{EntrySignal, SignalSource};
pub use symbol::normalize_symbol;
pub use timeframe::Timeframe;
