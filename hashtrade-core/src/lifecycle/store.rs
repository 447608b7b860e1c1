//! Partial-close records, keyed by position.
//!
//! Writes go through `compare_and_swap` so two invocations racing on the
//! same key cannot both apply a partial close: the loser sees the winner's
//! record on re-read.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::domain::PositionKey;
use crate::error::{EngineError, Result};
use crate::persist::{load_json_strict, write_json_atomic};

/// Management flags persisted for one open position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialCloseRecord {
    pub key: PositionKey,
    pub partial_applied: bool,
    pub breakeven_applied: bool,
    /// Highest (long) or lowest (short) trailing stop issued so far.
    #[serde(default)]
    pub trail_stop: Option<f64>,
    /// Position size seen on the previous cycle.
    #[serde(default)]
    pub last_quantity: Option<f64>,
    /// Incremented on every write.
    #[serde(default)]
    pub version: u64,
}

impl PartialCloseRecord {
    pub fn new(key: PositionKey) -> Self {
        Self {
            key,
            partial_applied: false,
            breakeven_applied: false,
            trail_stop: None,
            last_quantity: None,
            version: 0,
        }
    }
}

pub trait PartialCloseStore: Send + Sync {
    fn get(&self, key: &PositionKey) -> Result<Option<PartialCloseRecord>>;

    fn put(&self, record: PartialCloseRecord) -> Result<()>;

    /// Returns whether a record was removed.
    fn delete(&self, key: &PositionKey) -> Result<bool>;

    fn keys(&self) -> Result<Vec<PositionKey>>;

    /// Store `new` only if the current record equals `expected`
    /// (`None` meaning absent). Returns whether the swap happened.
    fn compare_and_swap(
        &self,
        key: &PositionKey,
        expected: Option<&PartialCloseRecord>,
        new: PartialCloseRecord,
    ) -> Result<bool>;
}

fn lock_err<T>(_: T) -> EngineError {
    EngineError::Store("partial-close store lock poisoned".into())
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<PositionKey, PartialCloseRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PartialCloseStore for MemoryStore {
    fn get(&self, key: &PositionKey) -> Result<Option<PartialCloseRecord>> {
        Ok(self.records.lock().map_err(lock_err)?.get(key).cloned())
    }

    fn put(&self, record: PartialCloseRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(lock_err)?
            .insert(record.key.clone(), record);
        Ok(())
    }

    fn delete(&self, key: &PositionKey) -> Result<bool> {
        Ok(self.records.lock().map_err(lock_err)?.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<PositionKey>> {
        let mut keys: Vec<_> = self.records.lock().map_err(lock_err)?.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn compare_and_swap(
        &self,
        key: &PositionKey,
        expected: Option<&PartialCloseRecord>,
        new: PartialCloseRecord,
    ) -> Result<bool> {
        let mut records = self.records.lock().map_err(lock_err)?;
        if records.get(key) != expected {
            return Ok(false);
        }
        records.insert(key.clone(), new);
        Ok(true)
    }
}

/// JSON document keyed by `SYMBOL:direction`, rewritten atomically on every
/// change. A process-local mutex serializes read-modify-write cycles.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// A corrupt document is an error, never an empty map.
    fn load(&self) -> Result<BTreeMap<String, PartialCloseRecord>> {
        load_json_strict(&self.path)
    }

    fn save(&self, records: &BTreeMap<String, PartialCloseRecord>) -> Result<()> {
        write_json_atomic(&self.path, records)
    }
}

impl PartialCloseStore for JsonFileStore {
    fn get(&self, key: &PositionKey) -> Result<Option<PartialCloseRecord>> {
        let _guard = self.guard.lock().map_err(lock_err)?;
        Ok(self.load()?.remove(&key.to_string()))
    }

    fn put(&self, record: PartialCloseRecord) -> Result<()> {
        let _guard = self.guard.lock().map_err(lock_err)?;
        let mut records = self.load()?;
        records.insert(record.key.to_string(), record);
        self.save(&records)
    }

    fn delete(&self, key: &PositionKey) -> Result<bool> {
        let _guard = self.guard.lock().map_err(lock_err)?;
        let mut records = self.load()?;
        let removed = records.remove(&key.to_string()).is_some();
        if removed {
            self.save(&records)?;
        }
        Ok(removed)
    }

    fn keys(&self) -> Result<Vec<PositionKey>> {
        let _guard = self.guard.lock().map_err(lock_err)?;
        let mut keys: Vec<_> = self.load()?.into_values().map(|r| r.key).collect();
        keys.sort();
        Ok(keys)
    }

    fn compare_and_swap(
        &self,
        key: &PositionKey,
        expected: Option<&PartialCloseRecord>,
        new: PartialCloseRecord,
    ) -> Result<bool> {
        let _guard = self.guard.lock().map_err(lock_err)?;
        let mut records = self.load()?;
        let id = key.to_string();
        if records.get(&id) != expected {
            return Ok(false);
        }
        records.insert(id, new);
        self.save(&records)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;

    fn key() -> PositionKey {
        PositionKey::new("SOLUSDT", Direction::Short)
    }

    fn exercise(store: &dyn PartialCloseStore) {
        assert!(store.get(&key()).unwrap().is_none());

        let fresh = PartialCloseRecord::new(key());
        assert!(store.compare_and_swap(&key(), None, fresh.clone()).unwrap());
        // Second creator loses.
        assert!(!store.compare_and_swap(&key(), None, fresh.clone()).unwrap());

        let mut applied = fresh.clone();
        applied.partial_applied = true;
        applied.version = 1;
        assert!(store.compare_and_swap(&key(), Some(&fresh), applied.clone()).unwrap());
        assert!(!store.compare_and_swap(&key(), Some(&fresh), fresh.clone()).unwrap());
        assert_eq!(store.get(&key()).unwrap(), Some(applied));

        assert_eq!(store.keys().unwrap(), vec![key()]);
        assert!(store.delete(&key()).unwrap());
        assert!(!store.delete(&key()).unwrap());
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn memory_store_semantics() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn json_store_semantics() {
        let dir = tempfile::tempdir().unwrap();
        exercise(&JsonFileStore::new(dir.path().join("partials.json")));
    }

    #[test]
    fn json_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partials.json");
        let mut record = PartialCloseRecord::new(key());
        record.partial_applied = true;
        JsonFileStore::new(&path).put(record.clone()).unwrap();
        assert_eq!(JsonFileStore::new(&path).get(&key()).unwrap(), Some(record));
    }

    #[test]
    fn corrupt_json_store_refuses_reads_and_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partials.json");
        std::fs::write(&path, "{\"SOLUSDT:short\": {\"key\"").unwrap();
        let store = JsonFileStore::new(&path);

        assert!(matches!(store.get(&key()), Err(EngineError::Store(_))));
        assert!(dir.path().join("partials.json.quarantined").exists());
        assert!(!path.exists());

        let fresh = PartialCloseRecord::new(key());
        assert!(store.compare_and_swap(&key(), None, fresh).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn records_without_quantity_still_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partials.json");
        let json = r#"{"SOLUSDT:short": {"key": {"symbol": "SOLUSDT", "direction": "short"},
            "partial_applied": true, "breakeven_applied": false}}"#;
        std::fs::write(&path, json).unwrap();
        let record = JsonFileStore::new(&path).get(&key()).unwrap().unwrap();
        assert!(record.partial_applied);
        assert_eq!(record.last_quantity, None);
        assert_eq!(record.version, 0);
    }
}
