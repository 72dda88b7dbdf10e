//! StoreClient port - durable hash used to park interrupted work items.
//!
//! The contract is a hash-of-hashes: `bucket -> (id -> serialized record)`.
//! Adapters live in [`crate::impls`].

use async_trait::async_trait;
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store backend: {0}")]
    Backend(String),

    #[error("store io: {0}")]
    Io(#[from] std::io::Error),

    #[error("store encoding: {0}")]
    Serde(#[from] serde_json::Error),
}

#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Stores (or overwrites) `record` under `id`.
    async fn set(&self, bucket: &str, id: &str, record: String) -> Result<(), StoreError>;

    /// Removes `id`; returns how many entries were removed (0 or 1).
    ///
    /// Recovery relies on this count to claim each record at most once.
    async fn delete(&self, bucket: &str, id: &str) -> Result<u64, StoreError>;

    /// Every entry in `bucket`. Empty when the bucket does not exist.
    async fn get_all(&self, bucket: &str) -> Result<HashMap<String, String>, StoreError>;
}
