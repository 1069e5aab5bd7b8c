//! Memoization store used by the registry to remember completed convergence
//!
//! The registry only needs a tagged key-value store. [`CacheStorage`] is that contract;
//! [`Cache`] scopes it to a namespace so several registries can share one backend.

pub mod memory;
pub mod redis;

pub use memory::MemoryStorage;
pub use self::redis::RedisStorage;

use crate::error::Result;

/// Tagged key-value storage backend
pub trait CacheStorage {
    /// Read a value, `None` when absent
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Write a value and attach it to each tag
    fn save(&self, key: &str, value: &str, tags: &[String]) -> Result<()>;

    /// Remove a single key
    fn remove(&self, key: &str) -> Result<()>;

    /// Remove every key saved under `tag`
    fn clean_tag(&self, tag: &str) -> Result<()>;
}

macro_rules! forward_storage {
    ($($wrapper:ident)::+) => {
        impl<T: CacheStorage + ?Sized> CacheStorage for $($wrapper)::+<T> {
            fn load(&self, key: &str) -> Result<Option<String>> {
                (**self).load(key)
            }

            fn save(&self, key: &str, value: &str, tags: &[String]) -> Result<()> {
                (**self).save(key, value, tags)
            }

            fn remove(&self, key: &str) -> Result<()> {
                (**self).remove(key)
            }

            fn clean_tag(&self, tag: &str) -> Result<()> {
                (**self).clean_tag(tag)
            }
        }
    };
}

forward_storage!(std::rc::Rc);
forward_storage!(std::sync::Arc);

/// A namespaced view over a [`CacheStorage`]
pub struct Cache {
    storage: Box<dyn CacheStorage>,
    namespace: String,
}

impl Cache {
    pub fn new(storage: Box<dyn CacheStorage>, namespace: impl Into<String>) -> Self {
        Self {
            storage,
            namespace: namespace.into(),
        }
    }

    /// In-process cache, lost when the process exits
    pub fn in_memory(namespace: impl Into<String>) -> Self {
        Self::new(Box::new(MemoryStorage::new()), namespace)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    pub fn load(&self, key: &str) -> Result<Option<String>> {
        self.storage.load(&self.scoped(key))
    }

    pub fn save(&self, key: &str, value: &str, tags: &[&str]) -> Result<()> {
        let tags: Vec<String> = tags.iter().map(|t| self.scoped(t)).collect();
        self.storage.save(&self.scoped(key), value, &tags)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.storage.remove(&self.scoped(key))
    }

    pub fn clean_tag(&self, tag: &str) -> Result<()> {
        self.storage.clean_tag(&self.scoped(tag))
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaces_do_not_collide() {
        let storage = std::rc::Rc::new(MemoryStorage::new());
        let a = Cache::new(Box::new(storage.clone()), "a");
        let b = Cache::new(Box::new(storage), "b");

        a.save("loaded", "1", &[]).unwrap();
        assert_eq!(a.load("loaded").unwrap().as_deref(), Some("1"));
        assert_eq!(b.load("loaded").unwrap(), None);
    }

    #[test]
    fn test_clean_tag_is_scoped() {
        let storage = std::rc::Rc::new(MemoryStorage::new());
        let a = Cache::new(Box::new(storage.clone()), "a");
        let b = Cache::new(Box::new(storage), "b");

        a.save("loaded", "1", &["structure"]).unwrap();
        b.save("loaded", "1", &["structure"]).unwrap();
        a.clean_tag("structure").unwrap();

        assert_eq!(a.load("loaded").unwrap(), None);
        assert_eq!(b.load("loaded").unwrap().as_deref(), Some("1"));
    }
}
