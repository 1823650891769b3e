//! Durable Storage Module
//!
//! Key/value persistence for the sync queue and persistent cache records.

mod file;
mod memory;

use async_trait::async_trait;

use crate::error::Result;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Storage key holding the serialized sync queue.
pub const SYNC_QUEUE_KEY: &str = "sync_queue";

/// Prefix for persistent cache records.
pub const CACHE_RECORD_PREFIX: &str = "offline_cache:";

// == Durable Storage ==
/// Text records that outlive the process.
#[async_trait]
pub trait DurableStorage: Send + Sync {
    /// Reads a record, `None` if it was never written or has been removed.
    async fn load(&self, key: &str) -> Result<Option<String>>;

    /// Writes a record, replacing any previous value.
    async fn save(&self, key: &str, value: &str) -> Result<()>;

    /// Removes a record. Removing a missing record is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}
