//! In-memory `StateStore` for tests and credential-less demos.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::store::traits::StateStore;

/// HashMap-backed store. State lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<(String, String), serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get_state(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, StorageError> {
        let entries = self.entries.read().await;
        Ok(entries.get(&(user_id.to_string(), key.to_string())).cloned())
    }

    async fn set_state(
        &self,
        user_id: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), StorageError> {
        let mut entries = self.entries.write().await;
        entries.insert((user_id.to_string(), key.to_string()), value.clone());
        Ok(())
    }
}
