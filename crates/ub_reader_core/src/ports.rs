//! crates/ub_reader_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the reader's core logic.
//! These traits form the boundary of the hexagonal architecture: the repositories,
//! content manager and highlight engine depend only on these, never on a concrete
//! persistence technology or UI runtime.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::sync::Arc;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, disk).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Item already exists: {0}")]
    Conflict(String),
    #[error("Invalid data: {0}")]
    Invalid(String),
    #[error("Storage failure: {0}")]
    Storage(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Stored Items
//=========================================================================================

/// Anything that can live in a storage collection: serializable and identified by a string id.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn id(&self) -> &str;
}

/// A predicate used to filter items in memory.
pub type Filter<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Parameters for `StorageService::query_items`. Results keep insertion order.
pub struct Query<T> {
    pub filter: Option<Filter<T>>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl<T> Query<T> {
    pub fn all() -> Self {
        Self {
            filter: None,
            offset: 0,
            limit: None,
        }
    }

    pub fn filter(predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self {
            filter: Some(Arc::new(predicate)),
            offset: 0,
            limit: None,
        }
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Applies filter, offset and limit to an item list.
    pub fn apply(&self, items: Vec<T>) -> Vec<T> {
        let matched = items
            .into_iter()
            .filter(|item| self.filter.as_ref().map_or(true, |f| f(item)))
            .skip(self.offset);
        match self.limit {
            Some(limit) => matched.take(limit).collect(),
            None => matched.collect(),
        }
    }
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            filter: self.filter.clone(),
            offset: self.offset,
            limit: self.limit,
        }
    }
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("filtered", &self.filter.is_some())
            .field("offset", &self.offset)
            .field("limit", &self.limit)
            .finish()
    }
}

/// Size information for one collection.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStatistics {
    pub collection: String,
    pub item_count: usize,
    pub size_bytes: usize,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The raw string key-value store underneath every collection, shaped like browser
/// `localStorage`: each key holds one serialized value that is read and written whole.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> PortResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> PortResult<()>;

    async fn remove(&self, key: &str) -> PortResult<()>;

    async fn keys(&self) -> PortResult<Vec<String>>;
}

/// A unit of work over one or more collections.
#[async_trait]
pub trait Transaction: Send {
    /// Keeps every write made since the transaction started.
    async fn commit(self: Box<Self>) -> PortResult<()>;

    /// Restores the scoped collections to their state at transaction start.
    async fn abort(self: Box<Self>) -> PortResult<()>;
}

/// Typed item storage for one collection.
#[async_trait]
pub trait StorageService<T: Entity>: Send + Sync {
    /// The collection name, also used as a transaction scope.
    fn collection(&self) -> &str;

    async fn initialize(&self) -> PortResult<()>;

    async fn get_item(&self, id: &str) -> PortResult<Option<T>>;

    /// Returns the items that exist, in the order of `ids`.
    async fn get_items(&self, ids: &[String]) -> PortResult<Vec<T>>;

    async fn get_all_items(&self) -> PortResult<Vec<T>>;

    async fn query_items(&self, query: &Query<T>) -> PortResult<Vec<T>>;

    async fn add_item(&self, item: T) -> PortResult<T>;

    async fn add_items(&self, items: Vec<T>) -> PortResult<Vec<T>>;

    /// Shallow-merges the fields of `changes` (a JSON object) into the stored item.
    async fn update_item(&self, id: &str, changes: serde_json::Value) -> PortResult<T>;

    async fn delete_item(&self, id: &str) -> PortResult<()>;

    /// Deletes every listed item that exists; missing ids are ignored.
    async fn delete_items(&self, ids: &[String]) -> PortResult<()>;

    async fn count_items(&self) -> PortResult<usize>;

    async fn clear_items(&self) -> PortResult<()>;

    async fn start_transaction(&self, scopes: &[&str]) -> PortResult<Box<dyn Transaction>>;

    async fn get_statistics(&self) -> PortResult<StorageStatistics>;
}

/// Receives the global "hide all highlights" switch.
pub trait VisibilitySink: Send + Sync {
    fn set_hidden(&self, hidden: bool);
}

/// Installs a stylesheet once under a fixed identifier.
pub trait StyleRegistry: Send + Sync {
    /// Returns `false` when a sheet with this id is already present (nothing changes).
    fn register(&self, id: &str, css: &str) -> bool;
}
