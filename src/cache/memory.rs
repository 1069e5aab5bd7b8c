use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::CacheStorage;
use crate::error::{Result, StructureError};

#[derive(Debug, Default)]
struct Entries {
    values: HashMap<String, String>,
    tags: HashMap<String, HashSet<String>>,
}

/// Process-local storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<Entries>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut Entries) -> T) -> Result<T> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| StructureError::Cache("memory cache lock poisoned".to_string()))?;
        Ok(f(&mut guard))
    }
}

impl CacheStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        self.with_entries(|e| e.values.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str, tags: &[String]) -> Result<()> {
        self.with_entries(|e| {
            e.values.insert(key.to_string(), value.to_string());
            for tag in tags {
                e.tags.entry(tag.clone()).or_default().insert(key.to_string());
            }
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.with_entries(|e| {
            e.values.remove(key);
        })
    }

    fn clean_tag(&self, tag: &str) -> Result<()> {
        self.with_entries(|e| {
            if let Some(keys) = e.tags.remove(tag) {
                for key in keys {
                    e.values.remove(&key);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_remove() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.load("k").unwrap(), None);

        storage.save("k", "v", &[]).unwrap();
        assert_eq!(storage.load("k").unwrap().as_deref(), Some("v"));

        storage.remove("k").unwrap();
        assert_eq!(storage.load("k").unwrap(), None);
    }

    #[test]
    fn test_clean_tag_drops_tagged_keys_only() {
        let storage = MemoryStorage::new();
        storage.save("a", "1", &["t".to_string()]).unwrap();
        storage.save("b", "2", &["t".to_string(), "u".to_string()]).unwrap();
        storage.save("c", "3", &[]).unwrap();

        storage.clean_tag("t").unwrap();

        assert_eq!(storage.load("a").unwrap(), None);
        assert_eq!(storage.load("b").unwrap(), None);
        assert_eq!(storage.load("c").unwrap().as_deref(), Some("3"));
    }
}
