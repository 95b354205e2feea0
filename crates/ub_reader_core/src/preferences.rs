//! crates/ub_reader_core/src/preferences.rs
//!
//! Reader preferences as an explicit service: loaded once on creation, persisted on
//! every change, and observable through a `watch` channel.

use crate::domain::UserPreferences;
use crate::kv::user_storage_key;
use crate::ports::{KeyValueStore, PortError, PortResult};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

pub struct PreferencesService {
    kv: Arc<dyn KeyValueStore>,
    key: String,
    state: watch::Sender<UserPreferences>,
    write_lock: Mutex<()>,
}

impl PreferencesService {
    /// Loads the stored preferences under `key`, falling back to defaults when nothing
    /// readable is stored.
    pub async fn create(kv: Arc<dyn KeyValueStore>, key: impl Into<String>) -> PortResult<Self> {
        let key = key.into();
        let initial = match kv.get(&key).await? {
            Some(raw) => serde_json::from_str::<UserPreferences>(&raw)
                .map(UserPreferences::clamped)
                .unwrap_or_else(|e| {
                    warn!("Discarding unreadable preferences: {}", e);
                    UserPreferences::default()
                }),
            None => UserPreferences::default(),
        };
        let (state, _) = watch::channel(initial);
        Ok(Self {
            kv,
            key,
            state,
            write_lock: Mutex::new(()),
        })
    }

    /// Preferences of one reader, stored under `ub-reader:preferences:{user_id}`.
    pub async fn for_user(kv: Arc<dyn KeyValueStore>, user_id: &str) -> PortResult<Self> {
        Self::create(kv, user_storage_key("preferences", user_id)).await
    }

    pub fn get(&self) -> UserPreferences {
        self.state.borrow().clone()
    }

    /// Every later change is delivered to the receiver.
    pub fn subscribe(&self) -> watch::Receiver<UserPreferences> {
        self.state.subscribe()
    }

    /// Stores `preferences` (clamped into range) and notifies subscribers.
    pub async fn set(&self, preferences: UserPreferences) -> PortResult<UserPreferences> {
        let _guard = self.write_lock.lock().await;
        self.store(preferences.clamped()).await
    }

    /// Applies `change` to the current preferences.
    pub async fn update(
        &self,
        change: impl FnOnce(&mut UserPreferences) + Send,
    ) -> PortResult<UserPreferences> {
        let _guard = self.write_lock.lock().await;
        let mut next = self.get();
        change(&mut next);
        self.store(next.clamped()).await
    }

    /// Merges the fields of a partial JSON object, one level deep for `tts`.
    pub async fn merge(&self, changes: Value) -> PortResult<UserPreferences> {
        let Value::Object(patch) = changes else {
            return Err(PortError::Invalid("preferences must be a JSON object".to_string()));
        };
        let _guard = self.write_lock.lock().await;
        let mut current = serde_json::to_value(self.get()).map_err(|e| PortError::Invalid(e.to_string()))?;
        if let Some(fields) = current.as_object_mut() {
            for (field, value) in patch {
                if let (Some(Value::Object(existing)), Value::Object(nested)) =
                    (fields.get_mut(&field), &value)
                {
                    existing.extend(nested.clone());
                    continue;
                }
                fields.insert(field, value);
            }
        }
        let next: UserPreferences = serde_json::from_value(current)
            .map_err(|e| PortError::Invalid(format!("preferences rejected: {}", e)))?;
        self.store(next.clamped()).await
    }

    pub async fn reset(&self) -> PortResult<UserPreferences> {
        let _guard = self.write_lock.lock().await;
        self.store(UserPreferences::default()).await
    }

    async fn store(&self, preferences: UserPreferences) -> PortResult<UserPreferences> {
        let raw = serde_json::to_string(&preferences)
            .map_err(|e| PortError::Invalid(format!("failed to serialize preferences: {}", e)))?;
        self.kv.set(&self.key, &raw).await?;
        self.state.send_replace(preferences.clone());
        debug!("Preferences saved under '{}'", self.key);
        Ok(preferences)
    }
}
