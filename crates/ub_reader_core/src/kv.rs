//! crates/ub_reader_core/src/kv.rs
//!
//! An in-process `KeyValueStore` for embedding the core without a database, and for tests.

use crate::ports::{KeyValueStore, PortError, PortResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Every key prefixed by this belongs to the reader.
pub const KEY_PREFIX: &str = "ub-reader:";

/// Builds the storage key for a named concern, e.g. `ub-reader:history`.
pub fn storage_key(name: &str) -> String {
    format!("{}{}", KEY_PREFIX, name)
}

/// Builds a per-user storage key, e.g. `ub-reader:history:42`.
pub fn user_storage_key(name: &str, user_id: &str) -> String {
    format!("{}{}:{}", KEY_PREFIX, name, user_id)
}

#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> PortResult<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|e| PortError::Storage(format!("key-value store poisoned: {}", e)))
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> PortResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> PortResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    async fn keys(&self) -> PortResult<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_remove() {
        let kv = MemoryKeyValueStore::new();
        assert_eq!(kv.get("a").await.unwrap(), None);
        kv.set("a", "1").await.unwrap();
        kv.set("b", "2").await.unwrap();
        assert_eq!(kv.get("a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(kv.keys().await.unwrap(), vec!["a".to_string(), "b".to_string()]);
        kv.remove("a").await.unwrap();
        assert_eq!(kv.get("a").await.unwrap(), None);
    }

    #[test]
    fn keys_are_namespaced() {
        assert_eq!(storage_key("history"), "ub-reader:history");
        assert_eq!(user_storage_key("history", "u1"), "ub-reader:history:u1");
    }
}
