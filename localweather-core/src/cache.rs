//! Last-write-wins persistence of the most recent weather record.
//!
//! The cache sits on top of a [`KeyValueStore`], so the controller never
//! touches process-wide state. [`FileStore`] is the durable implementation;
//! [`MemoryStore`] backs tests and throwaway sessions.

use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use crate::{config::WEATHER_RESPONSE_DATA, model::WeatherRecord};

/// String key-value persistence scoped to the app.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

/// Keeps all keys in one JSON object on disk.
///
/// Each `set` rewrites the file through a temp file and a rename. A missing or
/// unreadable file reads as empty.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Store named `name` inside `dir`, e.g. `WeatherAppPreference`.
    pub fn open(dir: &Path, name: &str) -> Self {
        Self { path: dir.join(format!("{name}.json")), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> HashMap<String, String> {
        let Ok(contents) = fs::read_to_string(&self.path) else {
            return HashMap::new();
        };

        serde_json::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(path = %self.path.display(), error = %err, "store file unreadable, starting empty");
            HashMap::new()
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.read_all().remove(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut values = self.read_all();
        values.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create store directory: {}", parent.display())
            })?;
        }

        let text = serde_json::to_string(&values).context("Failed to serialize store")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text)
            .with_context(|| format!("Failed to write store file: {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace store file: {}", self.path.display()))?;

        Ok(())
    }
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Holds at most one record under [`WEATHER_RESPONSE_DATA`].
pub struct ResponseCache<S> {
    store: S,
}

impl<S: KeyValueStore> ResponseCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Replace whatever was cached with `record`.
    pub fn save(&self, record: &WeatherRecord) -> Result<()> {
        let text = serde_json::to_string(record).context("Failed to serialize weather record")?;
        self.store.set(WEATHER_RESPONSE_DATA, &text)?;
        tracing::debug!(bytes = text.len(), "weather record cached");
        Ok(())
    }

    /// The cached record, or `None` if absent or corrupt.
    pub fn load(&self) -> Option<WeatherRecord> {
        let text = self.store.get(WEATHER_RESPONSE_DATA)?;
        if text.is_empty() {
            return None;
        }

        match serde_json::from_str(&text) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(error = %err, "cached weather record is corrupt, ignoring");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures;

    #[test]
    fn load_returns_what_was_saved() {
        let cache = ResponseCache::new(MemoryStore::new());
        let record = fixtures::london();

        cache.save(&record).unwrap();

        assert_eq!(cache.load(), Some(record));
    }

    #[test]
    fn save_overwrites_previous_record() {
        let cache = ResponseCache::new(MemoryStore::new());
        let first = fixtures::london();
        let mut second = fixtures::london();
        second.location.name = "Paris".into();
        second.location.country_code = "FR".into();

        cache.save(&first).unwrap();
        cache.save(&second).unwrap();

        assert_eq!(cache.load(), Some(second));
    }

    #[test]
    fn empty_store_loads_none() {
        let cache = ResponseCache::new(MemoryStore::new());
        assert_eq!(cache.load(), None);
    }

    #[test]
    fn corrupt_value_loads_none() {
        let store = MemoryStore::new();
        store.set(WEATHER_RESPONSE_DATA, "{\"conditions\": [tru").unwrap();
        let cache = ResponseCache::new(store);

        assert_eq!(cache.load(), None);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().expect("temp dir");
        let record = fixtures::london();

        ResponseCache::new(FileStore::open(dir.path(), "WeatherAppPreference"))
            .save(&record)
            .unwrap();

        let reopened = ResponseCache::new(FileStore::open(dir.path(), "WeatherAppPreference"));
        assert_eq!(reopened.load(), Some(record));
    }

    #[test]
    fn file_store_keeps_other_keys() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileStore::open(dir.path(), "prefs");

        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();

        assert_eq!(store.get("a").as_deref(), Some("1"));
        assert_eq!(store.get("b").as_deref(), Some("2"));
        assert!(!dir.path().join("prefs.json.tmp").exists());
    }

    #[test]
    fn garbage_store_file_reads_as_empty() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileStore::open(dir.path(), "prefs");
        fs::write(store.path(), "not json at all").unwrap();

        let cache = ResponseCache::new(store);
        assert_eq!(cache.load(), None);

        cache.save(&fixtures::london()).unwrap();
        assert!(cache.load().is_some());
    }

    #[test]
    fn file_store_creates_missing_directory() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileStore::open(&dir.path().join("nested/data"), "prefs");

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").as_deref(), Some("v"));
    }
}
