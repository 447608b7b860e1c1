//! HashTrade Core: market-structure and risk engine.
//!
//! Pure decision components for short-horizon futures trading:
//! - Candle domain model and indicators (EMA, RSI, ATR, swing points)
//! - Structure analysis: trend, order blocks, fair-value gaps, confluence score
//! - Liquidity pools and confirmed sweeps across timeframes
//! - Daily range windows and breakout-retest detection
//! - Position sizing and leverage selection
//! - Position lifecycle: partial close, breakeven, trailing, with persisted flags
//!
//! Exchange access, scheduling and decision making live outside this crate.
//! Persistent state goes through the `PartialCloseStore` and
//! `RangeWindowStore` traits.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod lifecycle;
pub mod liquidity;
pub mod persist;
pub mod range;
pub mod sizing;
pub mod structure;

pub use config::EngineConfig;
pub use engine::{Engine, PositionOutcome, RangeInput, SymbolOutcome};
pub use error::{EngineError, Result};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: engine types can be shared with worker threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Candle>();
        require_sync::<domain::Candle>();
        require_send::<domain::EntrySignal>();
        require_sync::<domain::EntrySignal>();
        require_send::<domain::PositionSnapshot>();
        require_sync::<domain::PositionSnapshot>();
        require_send::<domain::AccountSnapshot>();
        require_sync::<domain::AccountSnapshot>();

        // Analysis results
        require_send::<structure::StructureAnalysis>();
        require_sync::<structure::StructureAnalysis>();
        require_send::<liquidity::LiquidityScan>();
        require_sync::<liquidity::LiquidityScan>();
        require_send::<range::RangeScan>();
        require_sync::<range::RangeScan>();
        require_send::<sizing::PositionPlan>();
        require_sync::<sizing::PositionPlan>();
        require_send::<lifecycle::ManagementDecision>();
        require_sync::<lifecycle::ManagementDecision>();

        // Engine and stores
        require_send::<Engine>();
        require_sync::<Engine>();
        require_send::<EngineError>();
        require_sync::<EngineError>();
        require_send::<lifecycle::MemoryStore>();
        require_sync::<lifecycle::MemoryStore>();
        require_send::<lifecycle::JsonFileStore>();
        require_sync::<lifecycle::JsonFileStore>();
        require_send::<range::MemoryRangeStore>();
        require_sync::<range::MemoryRangeStore>();
        require_send::<range::JsonRangeStore>();
        require_sync::<range::JsonRangeStore>();
    }

    /// Architecture contract: lifecycle management reaches persisted state
    /// only through the store trait object it is handed.
    #[test]
    fn lifecycle_takes_store_as_trait_object() {
        fn _check_trait_object_builds(
            engine: &Engine,
            store: &dyn lifecycle::PartialCloseStore,
            position: &domain::PositionSnapshot,
        ) -> Result<lifecycle::ManagementDecision> {
            engine.manage(store, position)
        }
    }
}
