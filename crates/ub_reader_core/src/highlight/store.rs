//! Durable highlight records, one collection per reader.

use crate::domain::{Highlight, HighlightColor, HighlightMetadata};
use crate::ports::{KeyValueStore, PortError, PortResult, Query, StorageService};
use crate::repository::DocumentRepository;
use crate::storage::CollectionStore;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// A highlight as requested by a client, before it gets an id and timestamp.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHighlight {
    pub text: String,
    pub color: HighlightColor,
    pub metadata: HighlightMetadata,
}

pub struct HighlightStore {
    items: CollectionStore<Highlight>,
}

impl HighlightStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, collection: impl Into<String>) -> Self {
        Self {
            items: CollectionStore::new(kv, collection),
        }
    }

    /// The collection of one reader, stored under `ub-reader:highlights:{user_id}`.
    pub fn for_user(kv: Arc<dyn KeyValueStore>, user_id: &str) -> Self {
        Self::new(kv, format!("highlights:{}", user_id))
    }

    /// Stores a highlight once its paragraph is known to exist.
    pub async fn create(&self, documents: &DocumentRepository, new: NewHighlight) -> PortResult<Highlight> {
        if new.color.is_none() {
            return Err(PortError::Invalid(
                "a highlight needs a colour other than 'none'".to_string(),
            ));
        }
        if new.text.trim().is_empty() {
            return Err(PortError::Invalid("highlight text is empty".to_string()));
        }
        let paper_id = &new.metadata.paper_id;
        let paragraph_id = &new.metadata.paragraph_id;
        if documents.find_paragraph(paper_id, paragraph_id).await?.is_none() {
            return Err(PortError::NotFound(format!(
                "paragraph '{}' in paper '{}'",
                paragraph_id, paper_id
            )));
        }

        let highlight = Highlight {
            id: Uuid::new_v4().to_string(),
            text: new.text,
            color: new.color,
            created_at: Utc::now(),
            metadata: new.metadata,
        };
        debug!("Storing highlight {} ({})", highlight.id, highlight.color);
        self.items.add_item(highlight).await
    }

    pub async fn list(&self) -> PortResult<Vec<Highlight>> {
        self.items.get_all_items().await
    }

    pub async fn get(&self, id: &str) -> PortResult<Option<Highlight>> {
        self.items.get_item(id).await
    }

    pub async fn for_paper(&self, paper_id: &str) -> PortResult<Vec<Highlight>> {
        let paper_id = paper_id.to_string();
        self.items
            .query_items(&Query::filter(move |h: &Highlight| h.metadata.paper_id == paper_id))
            .await
    }

    pub async fn for_paragraph(&self, paper_id: &str, paragraph_id: &str) -> PortResult<Vec<Highlight>> {
        let paper_id = paper_id.to_string();
        let paragraph_id = paragraph_id.to_string();
        self.items
            .query_items(&Query::filter(move |h: &Highlight| {
                h.metadata.paper_id == paper_id && h.metadata.paragraph_id == paragraph_id
            }))
            .await
    }

    pub async fn set_color(&self, id: &str, color: HighlightColor) -> PortResult<Highlight> {
        if color.is_none() {
            return Err(PortError::Invalid(
                "use delete to remove a highlight".to_string(),
            ));
        }
        self.items.update_item(id, json!({ "color": color })).await
    }

    pub async fn delete(&self, id: &str) -> PortResult<()> {
        self.items.delete_item(id).await
    }
}
