//! Persisted key-value slots
//!
//! Each slot holds one whole record: it is loaded, saved and cleared as a
//! unit so related fields (wallet address and bearer token) can never drift
//! apart. `JsonFileRepository` survives restarts; `MemoryRepository` is the
//! in-process fake.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub trait Repository<T>: Send + Sync {
    fn load(&self) -> Result<Option<T>>;
    fn save(&self, value: &T) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// In-memory slot
#[derive(Debug)]
pub struct MemoryRepository<T> {
    slot: Mutex<Option<T>>,
}

impl<T> MemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    pub fn with_value(value: T) -> Self {
        Self {
            slot: Mutex::new(Some(value)),
        }
    }
}

impl<T> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send> Repository<T> for MemoryRepository<T> {
    fn load(&self) -> Result<Option<T>> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| Error::Storage("memory slot poisoned".to_string()))?;
        Ok(slot.clone())
    }

    fn save(&self, value: &T) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| Error::Storage("memory slot poisoned".to_string()))?;
        *slot = Some(value.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| Error::Storage("memory slot poisoned".to_string()))?;
        *slot = None;
        Ok(())
    }
}

/// Slot stored as a pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T: Serialize + DeserializeOwned> Repository<T> for JsonFileRepository {
    fn load(&self) -> Result<Option<T>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| Error::Storage(format!("{}: {}", self.path.display(), e)))?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        let value = serde_json::from_str(&content).map_err(|e| {
            Error::Storage(format!("Corrupt slot {}: {}", self.path.display(), e))
        })?;
        Ok(Some(value))
    }

    fn save(&self, value: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::Storage(format!("{}: {}", parent.display(), e)))?;
            }
        }
        let content = serde_json::to_string_pretty(value)?;
        std::fs::write(&self.path, content)
            .map_err(|e| Error::Storage(format!("{}: {}", self.path.display(), e)))
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!("{}: {}", self.path.display(), e))),
        }
    }
}
