//! Persistence of chosen combinations.
//!
//! Each key event occupies one entry keyed by [`Name::storage_key`], holding
//! the JSON encoding of its [`KeyCombination`]. Empty combinations are not
//! stored.

use crate::combination::KeyCombination;
use crate::error::Result;
use crate::name::Name;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A string key/value store in the manner of the OS user-preferences store
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Volatile store, the default when nothing else is configured
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        self.values.borrow_mut().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values.borrow_mut().remove(key);
        Ok(())
    }
}

/// A JSON object on disk, rewritten on every change
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: RefCell<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing or unreadable file is an empty
    /// store; the next change overwrites it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values: BTreeMap<String, String> = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring corrupt key event store {:?}: {}", path, e);
                BTreeMap::new()
            })
        } else {
            BTreeMap::new()
        };
        debug!("Opened key event store at {:?}", path);
        Ok(Self {
            path,
            values: RefCell::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored (key, value) pairs in key order
    pub fn entries(&self) -> Vec<(String, String)> {
        self.values
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(&*self.values.borrow())?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        self.values.borrow_mut().insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&self, key: &str) -> Result<()> {
        if self.values.borrow_mut().remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// The persisted combination for `name`. Absent or undecodable values read
/// as empty.
pub fn load(store: &dyn KeyValueStore, name: &Name) -> KeyCombination {
    let key = name.storage_key();
    let Some(raw) = store.get(&key) else {
        return KeyCombination::empty();
    };
    match serde_json::from_str(&raw) {
        Ok(combination) => combination,
        Err(e) => {
            warn!("Ignoring unreadable combination stored under '{}': {}", key, e);
            KeyCombination::empty()
        }
    }
}

/// Persist `combination` for `name`, removing the entry when it is empty
pub fn save(store: &dyn KeyValueStore, name: &Name, combination: &KeyCombination) -> Result<()> {
    let key = name.storage_key();
    if combination.is_empty() {
        store.remove(&key)
    } else {
        store.set(&key, serde_json::to_string(combination)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::combo;

    #[test]
    fn test_save_and_load() {
        let store = MemoryStore::new();
        let name = Name::new("save");
        assert!(load(&store, &name).is_empty());

        save(&store, &name, &combo("cmd+s")).unwrap();
        assert!(store.get("keyevent_save").is_some());
        assert_eq!(load(&store, &name), combo("cmd+s"));

        save(&store, &name, &KeyCombination::empty()).unwrap();
        assert_eq!(store.get("keyevent_save"), None);
    }

    #[test]
    fn test_corrupt_value_reads_as_empty() {
        let store = MemoryStore::new();
        store.set("keyevent_save", "{not json".to_string()).unwrap();
        assert!(load(&store, &Name::new("save")).is_empty());
    }

    #[test]
    fn test_prefix_collision_is_last_write_wins() {
        let store = MemoryStore::new();
        let a = Name::with_prefix("b_save", "a_");
        let b = Name::with_prefix("save", "a_b_");
        assert_eq!(a.storage_key(), b.storage_key());

        save(&store, &a, &combo("cmd+s")).unwrap();
        save(&store, &b, &combo("cmd+o")).unwrap();
        assert_eq!(load(&store, &a), combo("cmd+o"));
    }

    fn temp_path(label: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!(
            "keyevent-{label}-{}-{:?}.json",
            std::process::id(),
            std::thread::current().id()
        ))
    }

    #[test]
    fn test_corrupt_file_opens_empty() {
        let path = temp_path("corrupt");
        fs::write(&path, "{not json").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert!(store.entries().is_empty());
        assert!(load(&store, &Name::new("save")).is_empty());

        save(&store, &Name::new("save"), &combo("cmd+s")).unwrap();
        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(load(&reopened, &Name::new("save")), combo("cmd+s"));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_json_file_store_persists() {
        let path = temp_path("store");
        let _ = fs::remove_file(&path);

        let store = JsonFileStore::open(&path).unwrap();
        save(&store, &Name::new("save"), &combo("cmd+s")).unwrap();
        save(&store, &Name::new("open"), &combo("cmd+o")).unwrap();
        save(&store, &Name::new("open"), &KeyCombination::empty()).unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(load(&reopened, &Name::new("save")), combo("cmd+s"));
        assert!(load(&reopened, &Name::new("open")).is_empty());
        assert_eq!(reopened.entries().len(), 1);

        let _ = fs::remove_file(&path);
    }
}
