use std::fs;
use std::io;
use std::path::PathBuf;

use crate::error::StoreError;
use crate::models::Db;

/// Whole-blob storage for the reminder state.
///
/// Reads and writes always move the full [`Db`]; there is no partial update.
/// Serializing concurrent read-modify-write cycles is the caller's job
/// (see `AppState::update`).
pub trait Repository: Send + Sync {
    fn load(&self) -> Result<Db, StoreError>;
    fn save(&self, db: &Db) -> Result<(), StoreError>;
}

// JSON file on disk, written through a temp file + rename
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Repository for JsonFileStore {
    // A missing file is a fresh install, not an error.
    fn load(&self) -> Result<Db, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Db::default()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&text)?)
    }

    fn save(&self, db: &Db) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(db)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut tmp_path = self.path.clone().into_os_string();
        tmp_path.push(".tmp");
        fs::write(&tmp_path, text)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

// In-process store, used by tests
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    db: std::sync::Mutex<Db>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new(db: Db) -> Self {
        Self { db: std::sync::Mutex::new(db) }
    }
}

#[cfg(test)]
impl Repository for MemoryStore {
    fn load(&self) -> Result<Db, StoreError> {
        let guard = self
            .db
            .lock()
            .map_err(|_| io::Error::other("memory store lock poisoned"))?;
        Ok(guard.clone())
    }

    fn save(&self, db: &Db) -> Result<(), StoreError> {
        let mut guard = self
            .db
            .lock()
            .map_err(|_| io::Error::other("memory store lock poisoned"))?;
        *guard = db.clone();
        Ok(())
    }
}
