//! Durable key-value storage for table view preferences.
//!
//! Each table widget persists scalar preferences (page size, current page,
//! search text, sort key and direction) under string keys. This module
//! exposes the [`KeyValueStore`] abstraction together with a JSON-backed
//! implementation written to the standard configuration directory
//! (`~/.config/agtable/preferences.json` on most platforms) and an in-memory
//! implementation used for tests and ephemeral sessions.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use dirs_next::config_dir;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::expand_tilde;

/// Environment variable allowing callers to override the preferences file path.
pub const PREFERENCES_PATH_ENV: &str = "AGTABLE_PREFERENCES_PATH";

/// Default filename for the JSON payload.
pub const PREFERENCES_FILE_NAME: &str = "preferences.json";

/// Error surfaced when reading or writing preferences fails.
#[derive(Debug, Error)]
pub enum KeyValueStoreError {
    /// I/O failure (for example, permissions or missing directory).
    #[error("preferences I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization or deserialization failure.
    #[error("preferences serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Shared trait implemented by preference persistence backends.
///
/// Writes are synchronous: once `set` returns, a subsequent `get` for the same
/// key observes the new value.
pub trait KeyValueStore: Send + Sync {
    /// Retrieve the value stored under `key`, or `None` when it was never set.
    fn get(&self, key: &str) -> Result<Option<Value>, KeyValueStoreError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: Value) -> Result<(), KeyValueStoreError>;

    /// Remove the entry stored under `key`, if any.
    fn remove(&self, key: &str) -> Result<(), KeyValueStoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PreferencesFile {
    #[serde(default)]
    entries: BTreeMap<String, Value>,
}

/// JSON-backed preferences store persisted on disk.
#[derive(Debug)]
pub struct JsonKeyValueStore {
    path: PathBuf,
    file: Mutex<PreferencesFile>,
}

impl JsonKeyValueStore {
    /// Create a store at the provided path (or the default path when omitted).
    pub fn new<P: Into<Option<PathBuf>>>(path: P) -> Result<Self, KeyValueStoreError> {
        let resolved_path = match path.into() {
            Some(path) => expand_tilde(&path.to_string_lossy()),
            None => default_preferences_path(),
        };

        let file = load_preferences_file(&resolved_path)?;
        Ok(Self {
            path: resolved_path,
            file: Mutex::new(file),
        })
    }

    /// Initialize a store at the default location.
    pub fn with_defaults() -> Result<Self, KeyValueStoreError> {
        Self::new(None::<PathBuf>)
    }

    /// Path to the underlying JSON file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save_locked(&self, file: &PreferencesFile) -> Result<(), KeyValueStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(file)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl KeyValueStore for JsonKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Value>, KeyValueStoreError> {
        let file = self.file.lock().expect("preferences lock poisoned");
        Ok(file.entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), KeyValueStoreError> {
        let mut file = self.file.lock().expect("preferences lock poisoned");
        file.entries.insert(key.to_string(), value);
        self.save_locked(&file)
    }

    fn remove(&self, key: &str) -> Result<(), KeyValueStoreError> {
        let mut file = self.file.lock().expect("preferences lock poisoned");
        if file.entries.remove(key).is_some() {
            self.save_locked(&file)?;
        }
        Ok(())
    }
}

/// In-memory preferences store for tests and sessions without a config directory.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl InMemoryKeyValueStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("preferences lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Value>, KeyValueStoreError> {
        let entries = self.entries.lock().expect("preferences lock poisoned");
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), KeyValueStoreError> {
        let mut entries = self.entries.lock().expect("preferences lock poisoned");
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), KeyValueStoreError> {
        let mut entries = self.entries.lock().expect("preferences lock poisoned");
        entries.remove(key);
        Ok(())
    }
}

fn default_preferences_path() -> PathBuf {
    if let Ok(path) = env::var(PREFERENCES_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("agtable")
        .join(PREFERENCES_FILE_NAME)
}

fn load_preferences_file(path: &Path) -> Result<PreferencesFile, KeyValueStoreError> {
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<PreferencesFile>(&content) {
            Ok(file) => Ok(file),
            Err(error) => {
                warn!(
                    path = %path.display(),
                    error = %error,
                    "Failed to parse preferences file; using defaults"
                );
                Ok(PreferencesFile::default())
            }
        },
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(PreferencesFile::default()),
        Err(error) => Err(KeyValueStoreError::Io(error)),
    }
}
