//! Durable key/value storage backing the session store.
//!
//! The interface mirrors browser local storage: string keys, string values,
//! last write wins. `FileStorage` keeps the whole map in one JSON object file
//! and rewrites it atomically on every mutation.

use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};
use tracing::debug;

pub trait DurableStorage: Send + Sync {
    /// # Errors
    /// Returns `Error::Storage` if the backing medium cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// # Errors
    /// Returns `Error::Storage` if the value cannot be persisted.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key is not an error.
    /// # Errors
    /// Returns `Error::Storage` if the backing medium cannot be updated.
    fn remove_item(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
        Ok(())
    }
}

#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    // serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<Map<String, Value>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => {
                return Err(Error::Storage(format!(
                    "failed to read {}: {err}",
                    self.path.display()
                )))
            }
        };

        if raw.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(Error::Storage(format!(
                "{} does not contain a JSON object",
                self.path.display()
            ))),
            Err(err) => Err(Error::Storage(format!(
                "failed to parse {}: {err}",
                self.path.display()
            ))),
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| {
                Error::Storage(format!("failed to create {}: {err}", parent.display()))
            })?;
        }

        let payload = serde_json::to_string_pretty(map)
            .map_err(|err| Error::Storage(format!("failed to encode session: {err}")))?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, payload)
            .map_err(|err| Error::Storage(format!("failed to write {}: {err}", tmp.display())))?;
        restrict_permissions(&tmp)?;
        fs::rename(&tmp, &self.path).map_err(|err| {
            Error::Storage(format!("failed to replace {}: {err}", self.path.display()))
        })?;

        debug!("session file updated: {}", self.path.display());

        Ok(())
    }
}

impl DurableStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let map = self.read_map()?;
        Ok(map.get(key).and_then(Value::as_str).map(str::to_string))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.read_map()?;
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.write_map(&map)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.read_map()?;
        if map.remove(key).is_none() {
            return Ok(());
        }
        self.write_map(&map)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|err| {
        Error::Storage(format!(
            "failed to set permissions on {}: {err}",
            path.display()
        ))
    })
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
