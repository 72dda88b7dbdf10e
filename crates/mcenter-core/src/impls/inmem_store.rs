//! InMemoryStore - hash-of-hashes store for tests and single-process use.
//!
//! Nothing survives the process; use [`FileStore`](super::FileStore) or the
//! redis adapter when parked items must outlive a restart.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::ports::{StoreClient, StoreError};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    buckets: Mutex<HashMap<String, HashMap<String, String>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in `bucket`.
    pub fn len(&self, bucket: &str) -> usize {
        self.buckets.lock().get(bucket).map_or(0, HashMap::len)
    }
}

#[async_trait]
impl StoreClient for InMemoryStore {
    async fn set(&self, bucket: &str, id: &str, record: String) -> Result<(), StoreError> {
        self.buckets
            .lock()
            .entry(bucket.to_string())
            .or_default()
            .insert(id.to_string(), record);
        Ok(())
    }

    async fn delete(&self, bucket: &str, id: &str) -> Result<u64, StoreError> {
        let mut buckets = self.buckets.lock();
        let removed = buckets.get_mut(bucket).and_then(|b| b.remove(id)).is_some();
        if buckets.get(bucket).is_some_and(HashMap::is_empty) {
            buckets.remove(bucket);
        }
        Ok(u64::from(removed))
    }

    async fn get_all(&self, bucket: &str) -> Result<HashMap<String, String>, StoreError> {
        Ok(self.buckets.lock().get(bucket).cloned().unwrap_or_default())
    }
}
