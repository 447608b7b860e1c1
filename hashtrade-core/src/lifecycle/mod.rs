//! Position lifecycle state machine.
//!
//! ```text
//! opened -> partial_closed -> breakeven_set -> (trailing) -> closed
//! ```
//!
//! Each cycle takes a fresh [`PositionSnapshot`] and the persisted
//! [`PartialCloseRecord`] and emits management actions. The partial close
//! and the breakeven move fire in the same cycle, so `partial_closed` is
//! never observed between cycles and has no [`LifecycleState`] of its own.
//! Flags already marked applied never fire again, so re-running a cycle
//! with unchanged inputs emits nothing new.
//!
//! The record also keeps the quantity seen last cycle. A drop into the
//! configured band (about half) with no partial recorded means someone
//! closed half outside the engine; the partial is marked applied without
//! emitting another close.

pub mod ratchet;
pub mod store;

pub use ratchet::Ratchet;
pub use store::{JsonFileStore, MemoryStore, PartialCloseRecord, PartialCloseStore};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::LifecycleConfig;
use crate::domain::{PositionKey, PositionSnapshot};
use crate::error::{EngineError, Result};

/// Attempts at a compare-and-swap before giving up on a contended key.
const MAX_CAS_ATTEMPTS: usize = 3;

/// When the partial close fires.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartialTrigger {
    /// Unrealized move reaches `multiple` times the initial risk.
    RiskMultiple { multiple: f64 },
    /// Unrealized move reaches `pct` percent of entry.
    ProfitPct { pct: f64 },
}

impl Default for PartialTrigger {
    fn default() -> Self {
        PartialTrigger::RiskMultiple { multiple: 1.0 }
    }
}

impl PartialTrigger {
    pub fn threshold(&self) -> f64 {
        match *self {
            PartialTrigger::RiskMultiple { multiple } => multiple,
            PartialTrigger::ProfitPct { pct } => pct,
        }
    }

    /// Whether `position` has reached the trigger. A risk-multiple trigger
    /// needs a stop on the losing side of entry.
    pub fn reached(&self, position: &PositionSnapshot) -> bool {
        let dir = position.direction;
        let gained = dir.favorable_move(position.entry_price, position.current_price);
        match *self {
            PartialTrigger::RiskMultiple { multiple } => {
                let Some(stop) = position.stop_loss else {
                    return false;
                };
                let risk = dir.favorable_move(stop, position.entry_price);
                risk > 0.0 && gained >= multiple * risk
            }
            PartialTrigger::ProfitPct { pct } => position.pnl_pct() >= pct,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Opened,
    BreakevenSet,
    Trailing,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Breakeven,
    Trail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ManagementAction {
    PartialClose { fraction: f64, quantity: f64 },
    MoveStop { price: f64, reason: StopReason },
    FullClose { price: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagementDecision {
    pub key: PositionKey,
    pub state: LifecycleState,
    /// Empty means hold.
    pub actions: Vec<ManagementAction>,
}

impl ManagementDecision {
    pub fn is_hold(&self) -> bool {
        self.actions.is_empty()
    }
}

/// True when a `previous -> current` quantity change falls inside `band`
/// (as a ratio of current to previous), i.e. someone closed roughly half.
pub fn detect_external_partial(previous_qty: f64, current_qty: f64, band: (f64, f64)) -> bool {
    if previous_qty <= 0.0 || current_qty <= 0.0 {
        return false;
    }
    let ratio = current_qty / previous_qty;
    ratio >= band.0 && ratio <= band.1
}

#[derive(Debug, Clone, Default)]
pub struct LifecycleManager {
    config: LifecycleConfig,
}

impl LifecycleManager {
    pub fn new(config: LifecycleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Decide this cycle's actions and persist the flags they set.
    pub fn manage(
        &self,
        store: &dyn PartialCloseStore,
        position: &PositionSnapshot,
    ) -> Result<ManagementDecision> {
        let key = position.key();
        if !position.is_open() {
            if store.delete(&key)? {
                info!(%key, "position closed, partial-close record removed");
            }
            return Ok(ManagementDecision {
                key,
                state: LifecycleState::Closed,
                actions: Vec::new(),
            });
        }
        if !(position.entry_price > 0.0 && position.current_price > 0.0) {
            return Err(EngineError::InvalidInput(format!(
                "{key}: entry and current price must be positive"
            )));
        }

        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let current = store.get(&key)?;
            let (next, decision) = self.step(position, current.as_ref());

            let committed = match &next {
                Some(record) => store.compare_and_swap(&key, current.as_ref(), record.clone())?,
                None => true,
            };
            if committed {
                if !decision.is_hold() {
                    info!(
                        %key,
                        state = ?decision.state,
                        actions = ?decision.actions,
                        "position management"
                    );
                }
                return Ok(decision);
            }
            debug!(%key, attempt, "partial-close record changed underneath, re-reading");
        }

        warn!(%key, "partial-close record contended, giving up this cycle");
        Err(contended(&key))
    }

    /// Pure transition: the record to write (if changed) and the decision.
    fn step(
        &self,
        position: &PositionSnapshot,
        record: Option<&PartialCloseRecord>,
    ) -> (Option<PartialCloseRecord>, ManagementDecision) {
        let key = position.key();
        let dir = position.direction;
        let price = position.current_price;
        let mut actions = Vec::new();

        let state_of = |r: Option<&PartialCloseRecord>| match r {
            None => LifecycleState::Opened,
            Some(r) if r.trail_stop.is_some() => LifecycleState::Trailing,
            Some(r) if r.breakeven_applied => LifecycleState::BreakevenSet,
            Some(_) => LifecycleState::Opened,
        };

        if let Some(tp) = position.take_profit {
            if dir.favorable_move(tp, price) >= 0.0 {
                actions.push(ManagementAction::FullClose { price });
                let decision = ManagementDecision {
                    key,
                    state: state_of(record),
                    actions,
                };
                return (None, decision);
            }
        }

        let mut next = record
            .cloned()
            .unwrap_or_else(|| PartialCloseRecord::new(key.clone()));

        if let Some(last) = next.last_quantity.filter(|_| !next.partial_applied) {
            let band = self.config.external_partial_band;
            if detect_external_partial(last, position.quantity, band) {
                info!(
                    %key,
                    last,
                    quantity = position.quantity,
                    "external partial close detected"
                );
                next.partial_applied = true;
            }
        }
        next.last_quantity = Some(position.quantity);

        if !next.partial_applied && self.config.trigger.reached(position) {
            let fraction = self.config.partial_fraction;
            actions.push(ManagementAction::PartialClose {
                fraction,
                quantity: position.quantity * fraction,
            });
            next.partial_applied = true;
        }

        if next.partial_applied && !next.breakeven_applied {
            actions.push(ManagementAction::MoveStop {
                price: position.entry_price,
                reason: StopReason::Breakeven,
            });
            next.breakeven_applied = true;
        }

        // Trailing starts the cycle after breakeven was recorded.
        if record.is_some_and(|r| r.breakeven_applied) {
            if let Some(trail) = self.config.trail_pct {
                let floor = [Some(position.entry_price), position.stop_loss, next.trail_stop]
                    .into_iter()
                    .flatten()
                    .fold(Ratchet::new(dir), |mut r, level| {
                        r.apply(level);
                        r
                    });
                let proposed = price * (1.0 - dir.sign() * trail);
                if floor.would_tighten(proposed) {
                    actions.push(ManagementAction::MoveStop {
                        price: proposed,
                        reason: StopReason::Trail,
                    });
                    next.trail_stop = Some(proposed);
                }
            }
        }

        let written = (record != Some(&next)).then(|| {
            next.version += 1;
            next
        });
        let state = state_of(written.as_ref().or(record));
        (written, ManagementDecision { key, state, actions })
    }

    /// Record `partial_applied` for a partial executed outside the engine,
    /// detected from the quantity change. Returns whether a flag was set.
    pub fn mark_external_partial(
        &self,
        store: &dyn PartialCloseStore,
        key: &PositionKey,
        previous_qty: f64,
        current_qty: f64,
    ) -> Result<bool> {
        if !detect_external_partial(previous_qty, current_qty, self.config.external_partial_band) {
            return Ok(false);
        }
        for _ in 0..MAX_CAS_ATTEMPTS {
            let current = store.get(key)?;
            if current.as_ref().is_some_and(|r| r.partial_applied) {
                return Ok(false);
            }
            let mut next = current
                .clone()
                .unwrap_or_else(|| PartialCloseRecord::new(key.clone()));
            next.partial_applied = true;
            next.last_quantity = Some(current_qty);
            next.version += 1;
            if store.compare_and_swap(key, current.as_ref(), next)? {
                info!(%key, previous_qty, current_qty, "external partial close recorded");
                return Ok(true);
            }
        }
        Err(contended(key))
    }

    /// Remove records whose position is no longer open. Returns the removed keys.
    pub fn reconcile(
        &self,
        store: &dyn PartialCloseStore,
        open_keys: &[PositionKey],
    ) -> Result<Vec<PositionKey>> {
        let mut removed = Vec::new();
        for key in store.keys()? {
            if !open_keys.contains(&key) && store.delete(&key)? {
                debug!(%key, "garbage-collected stale partial-close record");
                removed.push(key);
            }
        }
        Ok(removed)
    }

    /// `StaleState` when a record exists for a key with no open position.
    pub fn ensure_live(
        &self,
        store: &dyn PartialCloseStore,
        key: &PositionKey,
        open_keys: &[PositionKey],
    ) -> Result<()> {
        if !open_keys.contains(key) && store.get(key)?.is_some() {
            return Err(EngineError::StaleState {
                key: key.to_string(),
            });
        }
        Ok(())
    }
}

fn contended(key: &PositionKey) -> EngineError {
    EngineError::Store(format!("{key}: record contended after {MAX_CAS_ATTEMPTS} attempts"))
}
