//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-reader services built from it.

use crate::adapters::ContentLoader;
use crate::config::Config;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use ub_reader_core::highlight::{stylesheet, HighlightStore, MarkerClasses, StyleSheets, STYLE_ID};
use ub_reader_core::ports::{KeyValueStore, PortResult, StyleRegistry};
use ub_reader_core::repository::{DOCUMENTS, PUBLICATIONS};
use ub_reader_core::{
    CollectionStore, ContentManager, DocumentRepository, HighlightColor, PreferencesService,
    PublicationRepository, ReadingHistory, SessionStore,
};

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub kv: Arc<dyn KeyValueStore>,
    pub content: ContentManager,
    pub sessions: Arc<SessionStore>,
    pub styles: Arc<StyleSheets>,
    readers: Arc<ReaderServices>,
}

/// One instance of each per-reader service, shared by all of that reader's requests so
/// their write locks serialize concurrent changes.
#[derive(Default)]
struct ReaderServices {
    highlights: Mutex<HashMap<String, Arc<HighlightStore>>>,
    history: Mutex<HashMap<String, Arc<ReadingHistory>>>,
    preferences: Mutex<HashMap<String, Arc<PreferencesService>>>,
}

impl AppState {
    /// Wires the repositories, sessions and the highlight stylesheet over `kv`.
    pub fn new(config: Arc<Config>, kv: Arc<dyn KeyValueStore>) -> Self {
        let publications = PublicationRepository::new(Arc::new(CollectionStore::new(
            kv.clone(),
            PUBLICATIONS,
        )));
        let documents = DocumentRepository::new(Arc::new(CollectionStore::new(kv.clone(), DOCUMENTS)));
        let sessions = SessionStore::new(kv.clone(), Duration::days(config.session_ttl_days));

        let styles = StyleSheets::new();
        styles.register(
            STYLE_ID,
            &stylesheet(&MarkerClasses::default(), &HighlightColor::PALETTE),
        );

        Self {
            config,
            content: ContentManager::new(Arc::new(publications), Arc::new(documents)),
            sessions: Arc::new(sessions),
            styles: Arc::new(styles),
            readers: Arc::new(ReaderServices::default()),
            kv,
        }
    }

    //-------------------------------------------------------------------------------------
    // Per-reader services
    //-------------------------------------------------------------------------------------

    pub async fn highlights(&self, user_id: &str) -> Arc<HighlightStore> {
        let mut stores = self.readers.highlights.lock().await;
        stores
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(HighlightStore::for_user(self.kv.clone(), user_id)))
            .clone()
    }

    pub async fn history(&self, user_id: &str) -> Arc<ReadingHistory> {
        let mut histories = self.readers.history.lock().await;
        histories
            .entry(user_id.to_string())
            .or_insert_with(|| {
                Arc::new(ReadingHistory::for_user(
                    self.kv.clone(),
                    user_id,
                    self.config.history_limit,
                ))
            })
            .clone()
    }

    /// Loads the reader's preferences on first use; later calls share the loaded service.
    pub async fn preferences(&self, user_id: &str) -> PortResult<Arc<PreferencesService>> {
        let mut services = self.readers.preferences.lock().await;
        if let Some(service) = services.get(user_id) {
            return Ok(service.clone());
        }
        let service = Arc::new(PreferencesService::for_user(self.kv.clone(), user_id).await?);
        services.insert(user_id.to_string(), service.clone());
        Ok(service)
    }

    /// Imports the publication found in a content directory unless it is already stored.
    /// Returns whether anything was imported.
    pub async fn seed_from(&self, loader: &ContentLoader) -> PortResult<bool> {
        let (publication, documents) = loader.load().await?;
        if self
            .content
            .publications()
            .find_by_id(&publication.id)
            .await?
            .is_some()
        {
            info!("Publication '{}' already imported", publication.id);
            return Ok(false);
        }
        Ok(self.content.import_publication(publication, documents).await)
    }
}
