//! services/api/src/adapters/kv.rs
//!
//! The durable key-value adapter: the concrete implementation of the `KeyValueStore`
//! port from the core crate, backed by a single SQLite table through `sqlx`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use ub_reader_core::ports::{KeyValueStore, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the `kv_store` table if needed. Run once at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[derive(FromRow)]
struct ValueRecord {
    value: String,
}

#[derive(FromRow)]
struct KeyRecord {
    key: String,
}

fn storage_error(e: sqlx::Error) -> PortError {
    PortError::Storage(e.to_string())
}

//=========================================================================================
// KeyValueStore Implementation
//=========================================================================================

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        let record = sqlx::query_as::<_, ValueRecord>("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(record.map(|r| r.value))
    }

    async fn set(&self, key: &str, value: &str) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    async fn keys(&self) -> PortResult<Vec<String>> {
        let records = sqlx::query_as::<_, KeyRecord>("SELECT key FROM kv_store ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(records.into_iter().map(|r| r.key).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> SqliteKeyValueStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteKeyValueStore::new(pool);
        store.run_migrations().await.unwrap();
        store
    }

    #[tokio::test]
    async fn values_are_overwritten_and_removed() {
        let kv = store().await;
        assert_eq!(kv.get("ub-reader:history").await.unwrap(), None);
        kv.set("ub-reader:history", "[]").await.unwrap();
        kv.set("ub-reader:history", "[1]").await.unwrap();
        assert_eq!(kv.get("ub-reader:history").await.unwrap().as_deref(), Some("[1]"));
        kv.set("ub-reader:auth", "{}").await.unwrap();
        assert_eq!(
            kv.keys().await.unwrap(),
            vec!["ub-reader:auth".to_string(), "ub-reader:history".to_string()]
        );
        kv.remove("ub-reader:history").await.unwrap();
        assert_eq!(kv.get("ub-reader:history").await.unwrap(), None);
    }
}
