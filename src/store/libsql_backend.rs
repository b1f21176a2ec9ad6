//! libSQL backend — async `StateStore` over a single `agent_state` table.
//!
//! Supports local file and in-memory databases. One row per
//! `(user_id, key)`; values are JSON text.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::StorageError;
use crate::store::traits::StateStore;

/// libSQL state store.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and initialize the schema.
    pub async fn new_local(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Open(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StorageError::Open(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StorageError::Open(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        info!(path = %path.display(), "Agent state database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StorageError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StorageError::Open(format!("Failed to create in-memory database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StorageError::Open(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        Ok(backend)
    }

    async fn init_schema(&self) -> Result<(), StorageError> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS agent_state (
                    user_id TEXT NOT NULL,
                    key TEXT NOT NULL,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    PRIMARY KEY (user_id, key)
                )",
                (),
            )
            .await
            .map_err(|e| StorageError::Query(format!("init_schema: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for LibSqlBackend {
    async fn get_state(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, StorageError> {
        let mut rows = self
            .conn
            .query(
                "SELECT value FROM agent_state WHERE user_id = ?1 AND key = ?2",
                params![user_id, key],
            )
            .await
            .map_err(|e| StorageError::Query(format!("get_state: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let text: String = row
                    .get(0)
                    .map_err(|e| StorageError::Query(format!("get_state row parse: {e}")))?;
                let value = serde_json::from_str(&text)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(StorageError::Query(format!("get_state next: {e}"))),
        }
    }

    async fn set_state(
        &self,
        user_id: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), StorageError> {
        let text = serde_json::to_string(value)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.conn
            .execute(
                "INSERT INTO agent_state (user_id, key, value, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id, key) DO UPDATE SET
                     value = excluded.value,
                     updated_at = excluded.updated_at",
                params![user_id, key, text, Utc::now().to_rfc3339()],
            )
            .await
            .map_err(|e| StorageError::Query(format!("set_state: {e}")))?;
        debug!(user_id, key, "Agent state persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_roundtrip() {
        let store = LibSqlBackend::new_memory().await.unwrap();
        let value = serde_json::json!({"state": "pending"});
        store.set_state("u1", "reentry_state", &value).await.unwrap();
        assert_eq!(
            store.get_state("u1", "reentry_state").await.unwrap(),
            Some(value)
        );
    }

    #[tokio::test]
    async fn upsert_overwrites() {
        let store = LibSqlBackend::new_memory().await.unwrap();
        store
            .set_state("u1", "k", &serde_json::json!("old"))
            .await
            .unwrap();
        store
            .set_state("u1", "k", &serde_json::json!("new"))
            .await
            .unwrap();
        assert_eq!(
            store.get_state("u1", "k").await.unwrap(),
            Some(serde_json::json!("new"))
        );
    }

    #[tokio::test]
    async fn file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guide.db");
        {
            let store = LibSqlBackend::new_local(&path).await.unwrap();
            store
                .set_state("u1", "onboarding_state", &serde_json::json!({"state": "done"}))
                .await
                .unwrap();
        }
        let store = LibSqlBackend::new_local(&path).await.unwrap();
        assert_eq!(
            store.get_state("u1", "onboarding_state").await.unwrap(),
            Some(serde_json::json!({"state": "done"}))
        );
    }

    #[tokio::test]
    async fn missing_state_is_none() {
        let store = LibSqlBackend::new_memory().await.unwrap();
        assert_eq!(store.get_state("ghost", "k").await.unwrap(), None);
    }
}
