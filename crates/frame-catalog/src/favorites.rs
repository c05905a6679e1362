//! Favorited frames, persisted through an explicitly passed key-value store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Key under which the favorite ids are stored.
pub const FAVORITES_KEY: &str = "favorite_frames";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Store data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}

/// Minimal string key-value persistence.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Volatile store, mainly for tests and one-shot runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// Store persisted as a single JSON object on disk.
///
/// The file is rewritten on every change; a missing file reads as empty.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(json) if json.trim().is_empty() => BTreeMap::new(),
            Ok(json) => serde_json::from_str(&json)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(io_error(&path, source)),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json).map_err(|e| io_error(&self.path, e))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

/// Favorite frame ids, in the order they were added.
#[derive(Debug)]
pub struct Favorites<S> {
    store: S,
}

impl<S: KeyValueStore> Favorites<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        match self.store.get(FAVORITES_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn is_favorite(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.list()?.iter().any(|f| f == id))
    }

    /// Add `id`. Returns false when it was already a favorite.
    pub fn add(&self, id: &str) -> Result<bool, StoreError> {
        let mut ids = self.list()?;
        if ids.iter().any(|f| f == id) {
            return Ok(false);
        }
        ids.push(id.to_string());
        self.save(&ids)?;
        Ok(true)
    }

    /// Remove `id`. Returns false when it was not a favorite.
    pub fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let mut ids = self.list()?;
        let before = ids.len();
        ids.retain(|f| f != id);
        if ids.len() == before {
            return Ok(false);
        }
        self.save(&ids)?;
        Ok(true)
    }

    /// Flip the favorite state of `id` and return the new state.
    pub fn toggle(&self, id: &str) -> Result<bool, StoreError> {
        if self.remove(id)? {
            Ok(false)
        } else {
            self.add(id)
        }
    }

    fn save(&self, ids: &[String]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return self.store.remove(FAVORITES_KEY);
        }
        self.store.set(FAVORITES_KEY, &serde_json::to_string(ids)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_round_trip() {
        let favorites = Favorites::new(MemoryStore::new());
        assert!(favorites.list().unwrap().is_empty());

        assert!(favorites.toggle("a").unwrap());
        assert!(favorites.toggle("b").unwrap());
        assert!(favorites.is_favorite("a").unwrap());
        assert_eq!(favorites.list().unwrap(), vec!["a", "b"]);

        assert!(!favorites.toggle("a").unwrap());
        assert!(!favorites.is_favorite("a").unwrap());
        assert_eq!(favorites.list().unwrap(), vec!["b"]);
    }

    #[test]
    fn test_add_and_remove_report_changes() {
        let favorites = Favorites::new(MemoryStore::new());
        assert!(favorites.add("x").unwrap());
        assert!(!favorites.add("x").unwrap());
        assert!(favorites.remove("x").unwrap());
        assert!(!favorites.remove("x").unwrap());
        assert_eq!(favorites.store().get(FAVORITES_KEY).unwrap(), None);
    }

    #[test]
    fn test_json_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let favorites = Favorites::new(JsonFileStore::open(&path).unwrap());
        favorites.add("spring").unwrap();
        favorites.add("autumn").unwrap();
        drop(favorites);

        let reopened = Favorites::new(JsonFileStore::open(&path).unwrap());
        assert_eq!(reopened.list().unwrap(), vec!["spring", "autumn"]);
    }

    #[test]
    fn test_corrupt_store_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(JsonFileStore::open(&path), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_corrupt_favorites_value() {
        let store = MemoryStore::new();
        store.set(FAVORITES_KEY, "not json").unwrap();
        let favorites = Favorites::new(store);
        assert!(matches!(favorites.list(), Err(StoreError::Corrupt(_))));
    }
}
