//! Engine facade.
//!
//! Owns one analyzer per concern, all built from a single validated
//! `EngineConfig`. Each call is a pure computation over the inputs plus, for
//! lifecycle management and range windows, an explicit store handle.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::domain::{AccountSnapshot, Candle, EntrySignal, PositionKey, PositionSnapshot};
use crate::error::{EngineError, Result};
use crate::lifecycle::{LifecycleManager, ManagementDecision, PartialCloseStore};
use crate::liquidity::{LiquidityEngine, LiquidityInput, LiquidityScan};
use crate::range::{session_date, RangeDetector, RangeScan, RangeWindow, RangeWindowStore, Series};
use crate::sizing::{InstrumentRules, LeverageBounds, PositionPlan, PositionSizer, Volatility};
use crate::structure::{StructureAnalysis, StructureAnalyzer};

/// Candles for one symbol in a multi-symbol range scan.
#[derive(Debug, Clone, Copy)]
pub struct RangeInput<'a> {
    pub symbol: &'a str,
    /// Series the daily window is aggregated from.
    pub window: Series<'a>,
    /// Finer series scanned for the breakout and retest.
    pub finer: Series<'a>,
}

/// Per-symbol result of a batch scan.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolOutcome {
    Scanned { scan: RangeScan },
    /// Nothing actionable this cycle (window still open, too little data, ...).
    Skipped { symbol: String, error: EngineError },
    /// Malformed data or a store failure; needs attention.
    Failed { symbol: String, error: EngineError },
}

impl SymbolOutcome {
    pub fn symbol(&self) -> &str {
        match self {
            SymbolOutcome::Scanned { scan } => &scan.window.symbol,
            SymbolOutcome::Skipped { symbol, .. } | SymbolOutcome::Failed { symbol, .. } => symbol,
        }
    }

    pub fn signal(&self) -> Option<&EntrySignal> {
        match self {
            SymbolOutcome::Scanned { scan } => scan.signal.as_ref(),
            _ => None,
        }
    }

    fn from_error(symbol: &str, error: EngineError) -> Self {
        if error.is_recoverable() {
            debug!(symbol, %error, "symbol skipped");
            SymbolOutcome::Skipped {
                symbol: symbol.to_string(),
                error,
            }
        } else {
            warn!(symbol, %error, "symbol failed");
            SymbolOutcome::Failed {
                symbol: symbol.to_string(),
                error,
            }
        }
    }
}

/// Per-position result of managing an account.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionOutcome {
    Managed { decision: ManagementDecision },
    Failed { key: PositionKey, error: EngineError },
}

impl PositionOutcome {
    pub fn key(&self) -> &PositionKey {
        match self {
            PositionOutcome::Managed { decision } => &decision.key,
            PositionOutcome::Failed { key, .. } => key,
        }
    }

    pub fn decision(&self) -> Option<&ManagementDecision> {
        match self {
            PositionOutcome::Managed { decision } => Some(decision),
            PositionOutcome::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    fingerprint: String,
    structure: StructureAnalyzer,
    liquidity: LiquidityEngine,
    range: RangeDetector,
    sizer: PositionSizer,
    lifecycle: LifecycleManager,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let fingerprint = config.fingerprint()?;
        debug!(config = %fingerprint, "engine configured");
        Ok(Self {
            structure: StructureAnalyzer::new(config.structure.clone()),
            liquidity: LiquidityEngine::new(config.liquidity.clone()),
            range: RangeDetector::new(config.range.clone()),
            sizer: PositionSizer::new(config.sizing.clone()),
            lifecycle: LifecycleManager::new(config.lifecycle.clone()),
            fingerprint,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// BLAKE3 digest of the configuration this engine was built from.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn analyze_structure(&self, symbol: &str, candles: &[Candle]) -> Result<StructureAnalysis> {
        self.structure.analyze(symbol, candles)
    }

    pub fn scan_liquidity(&self, symbol: &str, input: LiquidityInput<'_>) -> Result<LiquidityScan> {
        self.liquidity.scan(symbol, input)
    }

    pub fn scan_range(
        &self,
        symbol: &str,
        window: Series<'_>,
        finer: Series<'_>,
        now: DateTime<Utc>,
    ) -> Result<RangeScan> {
        self.range.detect(symbol, window, finer, now)
    }

    /// Range scan over several symbols.
    ///
    /// With a store, a closed window already recorded for today is reused
    /// instead of re-aggregated, new windows are recorded, and windows older
    /// than yesterday are pruned. Errors never abort the batch.
    pub fn scan_range_setups(
        &self,
        inputs: &[RangeInput<'_>],
        now: DateTime<Utc>,
        store: Option<&dyn RangeWindowStore>,
    ) -> Vec<SymbolOutcome> {
        let outcomes: Vec<SymbolOutcome> = inputs
            .iter()
            .map(|input| match self.scan_one(input, now, store) {
                Ok(scan) => SymbolOutcome::Scanned { scan },
                Err(e) => SymbolOutcome::from_error(input.symbol, e),
            })
            .collect();

        if let Some(store) = store {
            match session_date(now, &self.config.range).and_then(|today| store.prune(today)) {
                Ok(0) => {}
                Ok(pruned) => debug!(pruned, "pruned old range windows"),
                Err(error) => warn!(%error, "range window prune failed"),
            }
        }

        let signals = outcomes.iter().filter(|o| o.signal().is_some()).count();
        info!(symbols = inputs.len(), signals, config = %self.fingerprint, "range scan complete");
        outcomes
    }

    fn scan_one(
        &self,
        input: &RangeInput<'_>,
        now: DateTime<Utc>,
        store: Option<&dyn RangeWindowStore>,
    ) -> Result<RangeScan> {
        let window = match store {
            Some(store) => self.stored_window(input, now, store)?,
            None => self.range.window(input.symbol, input.window, now)?,
        };
        self.range.scan(&window, input.finer, now)
    }

    fn stored_window(
        &self,
        input: &RangeInput<'_>,
        now: DateTime<Utc>,
        store: &dyn RangeWindowStore,
    ) -> Result<RangeWindow> {
        let date = session_date(now, &self.config.range)?;
        if let Some(window) = store.get(input.symbol, date)?.filter(|w| w.closed) {
            debug!(symbol = input.symbol, %date, "reusing stored range window");
            return Ok(window);
        }
        let window = self.range.window(input.symbol, input.window, now)?;
        store.put(window.clone())?;
        Ok(window)
    }

    pub fn classify_volatility(&self, atr_pct: f64) -> Volatility {
        self.sizer.classify_volatility(atr_pct)
    }

    /// Position plan for an accepted signal, enforcing the configured
    /// minimum risk:reward.
    pub fn plan(
        &self,
        balance: f64,
        signal: &EntrySignal,
        volatility: Volatility,
        bounds: LeverageBounds,
        rules: Option<InstrumentRules>,
    ) -> Result<PositionPlan> {
        self.sizer.plan_signal(balance, signal, volatility, bounds, rules)
    }

    pub fn manage(
        &self,
        store: &dyn PartialCloseStore,
        position: &PositionSnapshot,
    ) -> Result<ManagementDecision> {
        self.lifecycle.manage(store, position)
    }

    /// Manage every open position in `account`, then garbage-collect records
    /// for positions that are gone.
    ///
    /// One outcome per open position, in account order. A failing position
    /// does not stop the others, and reconciliation runs regardless; a
    /// reconciliation failure is logged and retried next cycle.
    pub fn manage_account(
        &self,
        store: &dyn PartialCloseStore,
        account: &AccountSnapshot,
    ) -> Vec<PositionOutcome> {
        let outcomes: Vec<PositionOutcome> = account
            .positions
            .iter()
            .filter(|p| p.is_open())
            .map(|p| match self.lifecycle.manage(store, p) {
                Ok(decision) => PositionOutcome::Managed { decision },
                Err(error) => {
                    let key = p.key();
                    warn!(%key, %error, "position management failed");
                    PositionOutcome::Failed { key, error }
                }
            })
            .collect();

        match self.reconcile(store, account) {
            Ok(removed) if removed.is_empty() => {}
            Ok(removed) => debug!(removed = removed.len(), "stale partial-close records removed"),
            Err(error) => warn!(%error, "partial-close reconciliation failed"),
        }
        outcomes
    }

    pub fn reconcile(
        &self,
        store: &dyn PartialCloseStore,
        account: &AccountSnapshot,
    ) -> Result<Vec<PositionKey>> {
        self.lifecycle.reconcile(store, &account.open_keys())
    }

    pub fn mark_external_partial(
        &self,
        store: &dyn PartialCloseStore,
        key: &PositionKey,
        previous_qty: f64,
        current_qty: f64,
    ) -> Result<bool> {
        self.lifecycle.mark_external_partial(store, key, previous_qty, current_qty)
    }
}
