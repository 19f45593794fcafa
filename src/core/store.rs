use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::error::{CoachError, Result};

/// Storage keys shared by the coach, tracker and settings.
pub const PROFILE_KEY: &str = "ecoCoachProfile";
pub const SETTINGS_KEY: &str = "ecoHabitSettings";
pub const HABIT_DATA_KEY: &str = "habitData";
pub const CONSENT_KEY: &str = "ecoHabitConsent";
pub const CHECKIN_KEY: &str = "ecoCoachCheckin";

/// Device-local string key/value storage
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Volatile storage, lost when dropped
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// JSON-file backed storage. The whole file is one object of string values
/// and is rewritten on every change.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: RefCell<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) the storage file at `path`
    pub fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                match serde_json::from_str::<BTreeMap<String, String>>(&content) {
                    Ok(entries) => entries,
                    Err(e) => {
                        // Same as a cleared browser store: start over
                        tracing::warn!(path = %path.display(), error = %e, "unreadable storage file, starting empty");
                        BTreeMap::new()
                    }
                }
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: RefCell::new(entries),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&*self.entries.borrow())?;
        std::fs::write(&self.path, content).map_err(|e| {
            CoachError::Storage(format!("failed to write {}: {}", self.path.display(), e))
        })
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&self, key: &str) -> Result<()> {
        let removed = self.entries.borrow_mut().remove(key);
        if removed.is_some() {
            self.flush()?;
        }
        Ok(())
    }
}
