//! Durable JSON documents for engine-owned state.
//!
//! - Atomic writes (write to `<file>.tmp`, rename into place)
//! - A missing file is an empty document
//! - Corrupt files are moved aside to `<file>.quarantined`. Caches then start
//!   empty; state that guards side effects refuses to load instead.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

use crate::error::{EngineError, Result};

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Raw bytes, or `None` when the file does not exist.
fn read_existing(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(EngineError::Store(format!("read {}: {e}", path.display()))),
    }
}

fn quarantine(path: &Path) -> Result<PathBuf> {
    let target = sibling(path, ".quarantined");
    fs::rename(path, &target)
        .map_err(|e| EngineError::Store(format!("quarantine {}: {e}", path.display())))?;
    Ok(target)
}

/// Load a JSON document, falling back to `T::default()` when the file is
/// missing or unreadable as `T`. For rebuildable caches only.
pub fn load_json_or_default<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(bytes) = read_existing(path)? else {
        return Ok(T::default());
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "quarantining corrupt cache file"
            );
            if let Err(rename) = quarantine(path) {
                warn!(error = %rename, "corrupt cache file left in place");
            }
            Ok(T::default())
        }
    }
}

/// Load a JSON document that must not silently reset.
///
/// A missing file is `T::default()`. A corrupt one is quarantined and
/// reported as `EngineError::Store`, as is a failed quarantine. Loads keep
/// failing while the quarantined copy exists.
pub fn load_json_strict<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let quarantined = sibling(path, ".quarantined");
    if quarantined.exists() {
        return Err(EngineError::Store(format!(
            "{} awaits review; restore or remove it",
            quarantined.display()
        )));
    }
    let Some(bytes) = read_existing(path)? else {
        return Ok(T::default());
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(value),
        Err(e) => {
            let moved = quarantine(path)?;
            error!(
                path = %path.display(),
                quarantined = %moved.display(),
                error = %e,
                "corrupt state file quarantined"
            );
            Err(EngineError::Store(format!(
                "{} is corrupt ({e}); moved to {}",
                path.display(),
                moved.display()
            )))
        }
    }
}

/// Write a JSON document atomically: a reader sees either the old or the new
/// contents, never a torn file.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| EngineError::Store(format!("create {}: {e}", parent.display())))?;
    }

    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| EngineError::Store(format!("serialize {}: {e}", path.display())))?;
    let tmp_path = sibling(path, ".tmp");
    fs::write(&tmp_path, json)
        .map_err(|e| EngineError::Store(format!("write {}: {e}", tmp_path.display())))?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        EngineError::Store(format!("atomic rename failed: {e}"))
    })
}
