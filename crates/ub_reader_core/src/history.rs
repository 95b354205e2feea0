//! crates/ub_reader_core/src/history.rs
//!
//! The reading history: visited papers, most recent first, one entry per paper, capped.

use crate::domain::HistoryEntry;
use crate::kv::user_storage_key;
use crate::ports::{KeyValueStore, PortError, PortResult};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

pub struct ReadingHistory {
    kv: Arc<dyn KeyValueStore>,
    key: String,
    limit: usize,
    write_lock: Mutex<()>,
}

impl ReadingHistory {
    pub fn new(kv: Arc<dyn KeyValueStore>, key: impl Into<String>, limit: usize) -> Self {
        Self {
            kv,
            key: key.into(),
            limit: limit.max(1),
            write_lock: Mutex::new(()),
        }
    }

    /// History of one reader, stored under `ub-reader:history:{user_id}`.
    pub fn for_user(kv: Arc<dyn KeyValueStore>, user_id: &str, limit: usize) -> Self {
        Self::new(kv, user_storage_key("history", user_id), limit)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Entries, most recent first. Unreadable data counts as an empty history.
    pub async fn entries(&self) -> PortResult<Vec<HistoryEntry>> {
        let Some(raw) = self.kv.get(&self.key).await? else {
            return Ok(Vec::new());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Discarding unreadable reading history: {}", e);
            Vec::new()
        }))
    }

    pub async fn latest(&self) -> PortResult<Option<HistoryEntry>> {
        Ok(self.entries().await?.into_iter().next())
    }

    /// Records a visit now.
    pub async fn record(&self, paper_id: &str, title: &str) -> PortResult<Vec<HistoryEntry>> {
        self.record_entry(HistoryEntry {
            paper_id: paper_id.to_string(),
            title: title.to_string(),
            timestamp: Utc::now(),
        })
        .await
    }

    /// Puts `entry` at the front, dropping an older entry for the same paper and
    /// evicting the oldest entries beyond the limit.
    pub async fn record_entry(&self, entry: HistoryEntry) -> PortResult<Vec<HistoryEntry>> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.entries().await?;
        entries.retain(|e| e.paper_id != entry.paper_id);
        entries.insert(0, entry);
        entries.truncate(self.limit);
        self.write(&entries).await?;
        Ok(entries)
    }

    /// Returns whether an entry for `paper_id` existed.
    pub async fn remove(&self, paper_id: &str) -> PortResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.entries().await?;
        let before = entries.len();
        entries.retain(|e| e.paper_id != paper_id);
        if entries.len() == before {
            return Ok(false);
        }
        self.write(&entries).await?;
        Ok(true)
    }

    pub async fn clear(&self) -> PortResult<()> {
        let _guard = self.write_lock.lock().await;
        self.kv.remove(&self.key).await
    }

    async fn write(&self, entries: &[HistoryEntry]) -> PortResult<()> {
        let raw = serde_json::to_string(entries)
            .map_err(|e| PortError::Invalid(format!("failed to serialize history: {}", e)))?;
        self.kv.set(&self.key, &raw).await
    }
}
