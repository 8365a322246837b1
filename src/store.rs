//! Key-value document stores backing the app state.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use dirs_next as dirs;

use crate::error::StoreError;

/// Every persisted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DataKey {
    Exercises,
    Routines,
    History,
    Metrics,
    Chats,
    Unit,
    Profile,
    ActiveSession,
    Theme,
}

impl DataKey {
    pub const ALL: [DataKey; 9] = [
        DataKey::Exercises,
        DataKey::Routines,
        DataKey::History,
        DataKey::Metrics,
        DataKey::Chats,
        DataKey::Unit,
        DataKey::Profile,
        DataKey::ActiveSession,
        DataKey::Theme,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DataKey::Exercises => "titan_exercises",
            DataKey::Routines => "titan_routines",
            DataKey::History => "titan_history",
            DataKey::Metrics => "titan_metrics",
            DataKey::Chats => "titan_chats",
            DataKey::Unit => "titan_unit",
            DataKey::Profile => "titan_profile",
            DataKey::ActiveSession => "titan_active_session",
            DataKey::Theme => "titan_theme",
        }
    }

    pub fn from_name(name: &str) -> Option<DataKey> {
        DataKey::ALL.into_iter().find(|k| k.as_str() == name)
    }

    /// Whether the key is mirrored to the remote store.
    pub fn is_synced(self) -> bool {
        self != DataKey::Theme
    }
}

impl fmt::Display for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw documents as loaded from a store. Absent keys were never saved.
pub type Snapshot = BTreeMap<DataKey, Value>;

pub trait Store {
    /// Short label used in log output.
    fn name(&self) -> &'static str;
    fn load(&self) -> Result<Snapshot, StoreError>;
    fn save(&self, key: DataKey, value: &Value) -> Result<(), StoreError>;
    fn remove(&self, key: DataKey) -> Result<(), StoreError>;

    /// Forget every key.
    fn clear(&self) -> Result<(), StoreError> {
        for key in DataKey::ALL {
            self.remove(key)?;
        }
        Ok(())
    }
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    const DIR: &'static str = "titan_fit";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store in the platform data directory.
    pub fn in_data_dir() -> Result<Self, StoreError> {
        dirs::data_dir()
            .map(|p| Self::new(p.join(Self::DIR)))
            .ok_or(StoreError::NoDataDir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: DataKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_str()))
    }

    fn io_error(path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

impl Store for LocalStore {
    fn name(&self) -> &'static str {
        "local"
    }

    fn load(&self) -> Result<Snapshot, StoreError> {
        let mut snapshot = Snapshot::new();
        for key in DataKey::ALL {
            let path = self.path(key);
            let data = match std::fs::read_to_string(&path) {
                Ok(d) => d,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(Self::io_error(&path, e)),
            };
            match serde_json::from_str::<Value>(&data) {
                Ok(Value::Null) => {}
                Ok(value) => {
                    snapshot.insert(key, value);
                }
                Err(e) => log::warn!("Ignoring unreadable {key}: {e}"),
            }
        }
        Ok(snapshot)
    }

    fn save(&self, key: DataKey, value: &Value) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| Self::io_error(&self.dir, e))?;
        let data =
            serde_json::to_string_pretty(value).map_err(|source| StoreError::Json { key, source })?;
        let path = self.path(key);
        std::fs::write(&path, data).map_err(|e| Self::io_error(&path, e))
    }

    fn remove(&self, key: DataKey) -> Result<(), StoreError> {
        let path = self.path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(&path, e)),
        }
    }
}
