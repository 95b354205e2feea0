pub mod auth;
pub mod content;
pub mod content_manager;
pub mod domain;
pub mod highlight;
pub mod history;
pub mod kv;
pub mod markup;
pub mod ports;
pub mod positioning;
pub mod preferences;
pub mod repository;
pub mod storage;

pub use auth::{authenticate, AuthService, SessionStore};
pub use content_manager::ContentManager;
pub use domain::{
    AuthProvider, AuthSession, Document, DocumentType, Highlight, HighlightColor,
    HighlightMetadata, HistoryEntry, Paragraph, Publication, Section, SectionNumber, User,
    UserPreferences,
};
pub use history::ReadingHistory;
pub use kv::MemoryKeyValueStore;
pub use markup::{MarkupTree, TextRange};
pub use ports::{Entity, KeyValueStore, PortError, PortResult, StorageService, Transaction};
pub use preferences::PreferencesService;
pub use repository::{BaseRepository, DocumentRepository, PublicationRepository};
pub use storage::CollectionStore;
