pub mod content_loader;
pub mod kv;

pub use content_loader::ContentLoader;
pub use kv::SqliteKeyValueStore;
