//! Daily range windows, retained for the current and prior session day.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

use super::window::RangeWindow;
use crate::error::{EngineError, Result};
use crate::persist::{load_json_or_default, write_json_atomic};

pub trait RangeWindowStore: Send + Sync {
    fn get(&self, symbol: &str, date: NaiveDate) -> Result<Option<RangeWindow>>;

    /// Insert a window. A stored closed window is never overwritten.
    fn put(&self, window: RangeWindow) -> Result<()>;

    /// Drop windows older than the day before `today`. Returns how many went.
    fn prune(&self, today: NaiveDate) -> Result<usize>;
}

fn storage_key(symbol: &str, date: NaiveDate) -> String {
    format!("{symbol}:{date}")
}

fn retained(window: &RangeWindow, today: NaiveDate) -> bool {
    today.pred_opt().map_or(true, |yesterday| window.date >= yesterday)
}

fn insert(map: &mut BTreeMap<String, RangeWindow>, window: RangeWindow) -> bool {
    let key = storage_key(&window.symbol, window.date);
    if map.get(&key).is_some_and(|w| w.closed) {
        return false;
    }
    map.insert(key, window);
    true
}

fn lock_err<T>(_: T) -> EngineError {
    EngineError::Store("range store lock poisoned".into())
}

#[derive(Debug, Default)]
pub struct MemoryRangeStore {
    windows: Mutex<BTreeMap<String, RangeWindow>>,
}

impl MemoryRangeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RangeWindowStore for MemoryRangeStore {
    fn get(&self, symbol: &str, date: NaiveDate) -> Result<Option<RangeWindow>> {
        let windows = self.windows.lock().map_err(lock_err)?;
        Ok(windows.get(&storage_key(symbol, date)).cloned())
    }

    fn put(&self, window: RangeWindow) -> Result<()> {
        let mut windows = self.windows.lock().map_err(lock_err)?;
        insert(&mut windows, window);
        Ok(())
    }

    fn prune(&self, today: NaiveDate) -> Result<usize> {
        let mut windows = self.windows.lock().map_err(lock_err)?;
        let before = windows.len();
        windows.retain(|_, w| retained(w, today));
        Ok(before - windows.len())
    }
}

/// JSON file keyed by `SYMBOL:YYYY-MM-DD`.
#[derive(Debug)]
pub struct JsonRangeStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JsonRangeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<BTreeMap<String, RangeWindow>> {
        load_json_or_default(&self.path)
    }

    /// All stored windows grouped by symbol.
    pub fn by_symbol(&self) -> Result<HashMap<String, Vec<RangeWindow>>> {
        let _guard = self.guard.lock().map_err(lock_err)?;
        let mut grouped: HashMap<String, Vec<RangeWindow>> = HashMap::new();
        for window in self.load()?.into_values() {
            grouped.entry(window.symbol.clone()).or_default().push(window);
        }
        Ok(grouped)
    }
}

impl RangeWindowStore for JsonRangeStore {
    fn get(&self, symbol: &str, date: NaiveDate) -> Result<Option<RangeWindow>> {
        let _guard = self.guard.lock().map_err(lock_err)?;
        Ok(self.load()?.remove(&storage_key(symbol, date)))
    }

    fn put(&self, window: RangeWindow) -> Result<()> {
        let _guard = self.guard.lock().map_err(lock_err)?;
        let mut windows = self.load()?;
        if insert(&mut windows, window) {
            write_json_atomic(&self.path, &windows)?;
        }
        Ok(())
    }

    fn prune(&self, today: NaiveDate) -> Result<usize> {
        let _guard = self.guard.lock().map_err(lock_err)?;
        let mut windows = self.load()?;
        let before = windows.len();
        windows.retain(|_, w| retained(w, today));
        let removed = before - windows.len();
        if removed > 0 {
            debug!(removed, %today, "pruned range windows");
            write_json_atomic(&self.path, &windows)?;
        }
        Ok(removed)
    }
}
