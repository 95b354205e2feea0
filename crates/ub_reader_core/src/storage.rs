//! crates/ub_reader_core/src/storage.rs
//!
//! `CollectionStore` implements the typed `StorageService` port on top of any
//! `KeyValueStore`. A collection is kept as one JSON array under a single key and is
//! read and written whole, the same shape browser `localStorage` forces on a client.

use crate::kv::storage_key;
use crate::ports::{
    Entity, KeyValueStore, PortError, PortResult, Query, StorageService, StorageStatistics,
    Transaction,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

//=========================================================================================
// Collection Store
//=========================================================================================

pub struct CollectionStore<T> {
    kv: Arc<dyn KeyValueStore>,
    collection: String,
    key: String,
    /// Serializes this store's own read-modify-write cycles.
    write_lock: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> CollectionStore<T> {
    /// Creates a store for `collection`, persisted under `ub-reader:{collection}`.
    pub fn new(kv: Arc<dyn KeyValueStore>, collection: impl Into<String>) -> Self {
        let collection = collection.into();
        Self {
            key: storage_key(&collection),
            kv,
            collection,
            write_lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    /// Reads the whole collection. A corrupt value is logged and treated as empty.
    async fn read_all(&self) -> PortResult<Vec<T>> {
        let Some(raw) = self.kv.get(&self.key).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<T>>(&raw) {
            Ok(items) => Ok(items),
            Err(e) => {
                warn!(
                    "Discarding unreadable data in collection '{}': {}",
                    self.collection, e
                );
                Ok(Vec::new())
            }
        }
    }

    async fn write_all(&self, items: &[T]) -> PortResult<()> {
        let raw = serde_json::to_string(items)
            .map_err(|e| PortError::Invalid(format!("failed to serialize items: {}", e)))?;
        self.kv.set(&self.key, &raw).await
    }
}

#[async_trait]
impl<T: Entity> StorageService<T> for CollectionStore<T> {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn initialize(&self) -> PortResult<()> {
        let _guard = self.write_lock.lock().await;
        if self.kv.get(&self.key).await?.is_none() {
            self.kv.set(&self.key, "[]").await?;
            debug!("Initialized empty collection '{}'", self.collection);
        }
        Ok(())
    }

    async fn get_item(&self, id: &str) -> PortResult<Option<T>> {
        Ok(self.read_all().await?.into_iter().find(|item| item.id() == id))
    }

    async fn get_items(&self, ids: &[String]) -> PortResult<Vec<T>> {
        let items = self.read_all().await?;
        Ok(ids
            .iter()
            .filter_map(|id| items.iter().find(|item| item.id() == id).cloned())
            .collect())
    }

    async fn get_all_items(&self) -> PortResult<Vec<T>> {
        self.read_all().await
    }

    async fn query_items(&self, query: &Query<T>) -> PortResult<Vec<T>> {
        Ok(query.apply(self.read_all().await?))
    }

    async fn add_item(&self, item: T) -> PortResult<T> {
        let _guard = self.write_lock.lock().await;
        let mut items = self.read_all().await?;
        if items.iter().any(|existing| existing.id() == item.id()) {
            return Err(PortError::Conflict(format!(
                "{} '{}' already exists",
                self.collection,
                item.id()
            )));
        }
        items.push(item.clone());
        self.write_all(&items).await?;
        Ok(item)
    }

    async fn add_items(&self, new_items: Vec<T>) -> PortResult<Vec<T>> {
        let _guard = self.write_lock.lock().await;
        let mut items = self.read_all().await?;
        let mut seen: HashSet<String> = items.iter().map(|i| i.id().to_string()).collect();
        for item in &new_items {
            if !seen.insert(item.id().to_string()) {
                return Err(PortError::Conflict(format!(
                    "{} '{}' already exists",
                    self.collection,
                    item.id()
                )));
            }
        }
        items.extend(new_items.iter().cloned());
        self.write_all(&items).await?;
        Ok(new_items)
    }

    async fn update_item(&self, id: &str, changes: Value) -> PortResult<T> {
        let Value::Object(patch) = changes else {
            return Err(PortError::Invalid(
                "changes must be a JSON object".to_string(),
            ));
        };

        let _guard = self.write_lock.lock().await;
        let mut items = self.read_all().await?;
        let index = items
            .iter()
            .position(|item| item.id() == id)
            .ok_or_else(|| PortError::NotFound(format!("{} '{}'", self.collection, id)))?;

        let mut value = serde_json::to_value(&items[index])
            .map_err(|e| PortError::Invalid(e.to_string()))?;
        let Some(fields) = value.as_object_mut() else {
            return Err(PortError::Invalid(format!(
                "{} '{}' is not stored as an object",
                self.collection, id
            )));
        };
        for (field, new_value) in patch {
            // The id is the storage identity and never changes through an update.
            if field != "id" {
                fields.insert(field, new_value);
            }
        }

        let updated: T = serde_json::from_value(value)
            .map_err(|e| PortError::Invalid(format!("update rejected: {}", e)))?;
        items[index] = updated.clone();
        self.write_all(&items).await?;
        Ok(updated)
    }

    async fn delete_item(&self, id: &str) -> PortResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut items = self.read_all().await?;
        let before = items.len();
        items.retain(|item| item.id() != id);
        if items.len() == before {
            return Err(PortError::NotFound(format!("{} '{}'", self.collection, id)));
        }
        self.write_all(&items).await
    }

    async fn delete_items(&self, ids: &[String]) -> PortResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut items = self.read_all().await?;
        items.retain(|item| !ids.iter().any(|id| id == item.id()));
        self.write_all(&items).await
    }

    async fn count_items(&self) -> PortResult<usize> {
        Ok(self.read_all().await?.len())
    }

    async fn clear_items(&self) -> PortResult<()> {
        let _guard = self.write_lock.lock().await;
        self.kv.set(&self.key, "[]").await
    }

    async fn start_transaction(&self, scopes: &[&str]) -> PortResult<Box<dyn Transaction>> {
        let tx = SnapshotTransaction::begin(self.kv.clone(), scopes).await?;
        Ok(Box::new(tx))
    }

    async fn get_statistics(&self) -> PortResult<StorageStatistics> {
        let raw = self.kv.get(&self.key).await?.unwrap_or_default();
        Ok(StorageStatistics {
            collection: self.collection.clone(),
            item_count: self.read_all().await?.len(),
            size_bytes: raw.len(),
        })
    }
}

//=========================================================================================
// Snapshot Transactions
//=========================================================================================

/// Captures the raw value of every scoped collection at start; abort writes them back.
pub struct SnapshotTransaction {
    kv: Arc<dyn KeyValueStore>,
    snapshot: Vec<(String, Option<String>)>,
}

impl SnapshotTransaction {
    pub async fn begin(kv: Arc<dyn KeyValueStore>, scopes: &[&str]) -> PortResult<Self> {
        let mut snapshot = Vec::with_capacity(scopes.len());
        for scope in scopes {
            let key = storage_key(scope);
            let value = kv.get(&key).await?;
            snapshot.push((key, value));
        }
        debug!("Transaction started over {:?}", scopes);
        Ok(Self { kv, snapshot })
    }
}

#[async_trait]
impl Transaction for SnapshotTransaction {
    async fn commit(self: Box<Self>) -> PortResult<()> {
        debug!("Transaction committed");
        Ok(())
    }

    async fn abort(self: Box<Self>) -> PortResult<()> {
        for (key, value) in &self.snapshot {
            match value {
                Some(raw) => self.kv.set(key, raw).await?,
                None => self.kv.remove(key).await?,
            }
        }
        debug!("Transaction aborted; {} collection(s) restored", self.snapshot.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKeyValueStore;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        body: String,
        #[serde(default)]
        pinned: bool,
    }

    impl Entity for Note {
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn note(id: &str, body: &str) -> Note {
        Note {
            id: id.to_string(),
            body: body.to_string(),
            pinned: false,
        }
    }

    fn store() -> (Arc<MemoryKeyValueStore>, CollectionStore<Note>) {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = CollectionStore::new(kv.clone(), "notes");
        (kv, store)
    }

    #[tokio::test]
    async fn add_and_read_back_in_insertion_order() {
        let (_, store) = store();
        store.add_item(note("b", "second")).await.unwrap();
        store.add_items(vec![note("a", "first"), note("c", "third")]).await.unwrap();

        let ids: Vec<_> = store
            .get_all_items()
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert_eq!(store.count_items().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let (_, store) = store();
        store.add_item(note("a", "x")).await.unwrap();
        let err = store.add_item(note("a", "y")).await.unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));

        let err = store
            .add_items(vec![note("b", "1"), note("b", "2")])
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
        assert_eq!(store.count_items().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn update_merges_fields_and_keeps_id() {
        let (_, store) = store();
        store.add_item(note("a", "draft")).await.unwrap();
        let updated = store
            .update_item("a", json!({ "pinned": true, "id": "zzz" }))
            .await
            .unwrap();
        assert_eq!(updated.id, "a");
        assert_eq!(updated.body, "draft");
        assert!(updated.pinned);

        let err = store.update_item("missing", json!({})).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
        let err = store.update_item("a", json!({ "pinned": "yes" })).await.unwrap_err();
        assert!(matches!(err, PortError::Invalid(_)));
    }

    #[tokio::test]
    async fn query_filters_with_offset_and_limit() {
        let (_, store) = store();
        for i in 0..6 {
            store.add_item(note(&i.to_string(), "n")).await.unwrap();
        }
        let even = Query::filter(|n: &Note| n.id.parse::<u32>().unwrap() % 2 == 0);
        let ids: Vec<_> = store
            .query_items(&even.offset(1).limit(1))
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, vec!["2"]);

        let picked = store
            .get_items(&["4".to_string(), "nope".to_string(), "1".to_string()])
            .await
            .unwrap();
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[0].id, "4");
    }

    #[tokio::test]
    async fn delete_single_and_many() {
        let (_, store) = store();
        store
            .add_items(vec![note("a", ""), note("b", ""), note("c", "")])
            .await
            .unwrap();
        store.delete_item("b").await.unwrap();
        assert!(matches!(
            store.delete_item("b").await.unwrap_err(),
            PortError::NotFound(_)
        ));
        store
            .delete_items(&["a".to_string(), "ghost".to_string()])
            .await
            .unwrap();
        assert_eq!(store.count_items().await.unwrap(), 1);
        store.clear_items().await.unwrap();
        assert_eq!(store.count_items().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn corrupt_collection_reads_as_empty() {
        let (kv, store) = store();
        kv.set("ub-reader:notes", "{not json").await.unwrap();
        assert!(store.get_all_items().await.unwrap().is_empty());
        store.add_item(note("a", "fresh")).await.unwrap();
        assert_eq!(store.count_items().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn abort_restores_every_scoped_collection() {
        let (kv, store) = store();
        let other: CollectionStore<Note> = CollectionStore::new(kv.clone(), "others");
        store.add_item(note("kept", "")).await.unwrap();

        let tx = store.start_transaction(&["notes", "others"]).await.unwrap();
        store.add_item(note("temp", "")).await.unwrap();
        other.add_item(note("temp", "")).await.unwrap();
        tx.abort().await.unwrap();

        assert_eq!(store.count_items().await.unwrap(), 1);
        assert_eq!(kv.get("ub-reader:others").await.unwrap(), None);

        let tx = store.start_transaction(&["notes"]).await.unwrap();
        store.add_item(note("committed", "")).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.count_items().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn statistics_report_size() {
        let (_, store) = store();
        store.initialize().await.unwrap();
        store.add_item(note("a", "body")).await.unwrap();
        let stats = store.get_statistics().await.unwrap();
        assert_eq!(stats.collection, "notes");
        assert_eq!(stats.item_count, 1);
        assert!(stats.size_bytes > 2);
    }
}
