//! `StateStore` trait — the persistence boundary for lifecycle machines.
//!
//! Each machine is a pure reducer; this trait is the only place durability
//! happens. Every machine owns a disjoint key under the user's id, so writes
//! never interleave between machines.

use async_trait::async_trait;

use crate::error::StorageError;

/// Backend-agnostic keyed JSON state per user.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the value stored for `(user_id, key)`, if any.
    async fn get_state(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, StorageError>;

    /// Upsert the value for `(user_id, key)`.
    async fn set_state(
        &self,
        user_id: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), StorageError>;
}
