//! Cache Module
//!
//! Provides in-memory caching with TTL expiration, access-recency eviction
//! and tag-based invalidation.

mod entry;
mod eviction;
mod schedule;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use eviction::{eviction_count, select_victims};
pub use schedule::ExpirySchedule;
pub use stats::{CacheCounters, CacheStats};
pub use store::{CacheStore, SharedCache};
