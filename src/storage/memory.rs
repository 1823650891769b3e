//! In-process storage backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::DurableStorage;
use crate::error::Result;

/// Map-backed storage for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    records: RwLock<HashMap<String, String>>,
    writes: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save` and `remove` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Keys currently stored.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.records.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl DurableStorage for MemoryStorage {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: &str) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.records
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.records.write().await.remove(key);
        Ok(())
    }
}
