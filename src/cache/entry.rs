//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::collections::BTreeSet;

// == Cache Entry ==
/// Represents a single cache entry with its serialized value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Key, unique within the store
    pub key: String,
    /// The stored value in its serialized form
    pub serialized_value: String,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Lifetime in milliseconds from `created_at`
    pub ttl_ms: u64,
    /// Number of successful reads
    pub access_count: u64,
    /// Timestamp of the last successful read (Unix milliseconds)
    pub last_access_at: u64,
    /// Labels used for bulk invalidation
    pub tags: BTreeSet<String>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry stamped at `now`.
    pub fn new(
        key: impl Into<String>,
        serialized_value: String,
        now: u64,
        ttl_ms: u64,
        tags: BTreeSet<String>,
    ) -> Self {
        Self {
            key: key.into(),
            serialized_value,
            created_at: now,
            ttl_ms,
            access_count: 0,
            last_access_at: now,
            tags,
        }
    }

    // == Expires At ==
    /// Timestamp after which the entry is logically absent.
    pub fn expires_at(&self) -> u64 {
        self.created_at.saturating_add(self.ttl_ms)
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// Boundary condition: the entry is still live when exactly `ttl_ms` has
    /// elapsed and expires strictly after that (`now - created_at > ttl`).
    pub fn is_expired(&self, now: u64) -> bool {
        now.saturating_sub(self.created_at) > self.ttl_ms
    }

    /// Age of the entry in milliseconds.
    pub fn age_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.created_at)
    }

    /// Records a successful read.
    pub fn touch(&mut self, now: u64) {
        self.access_count += 1;
        self.last_access_at = now;
    }

    /// Rough memory footprint in bytes.
    pub fn size_estimate(&self) -> usize {
        self.key.len()
            + self.serialized_value.len()
            + self.tags.iter().map(String::len).sum::<usize>()
            + std::mem::size_of::<Self>()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn entry(now: u64, ttl_ms: u64) -> CacheEntry {
        CacheEntry::new("k", "\"v\"".to_string(), now, ttl_ms, BTreeSet::new())
    }

    #[test]
    fn test_entry_creation() {
        let entry = entry(1_000, 100);

        assert_eq!(entry.key, "k");
        assert_eq!(entry.access_count, 0);
        assert_eq!(entry.last_access_at, 1_000);
        assert_eq!(entry.expires_at(), 1_100);
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = entry(1_000, 100);

        assert!(!entry.is_expired(1_100), "exactly ttl elapsed is still live");
        assert!(entry.is_expired(1_101));
        assert!(entry.is_expired(1_150));
    }

    #[test]
    fn test_touch_updates_access_stats() {
        let mut entry = entry(1_000, 100);
        entry.touch(1_010);
        entry.touch(1_020);

        assert_eq!(entry.access_count, 2);
        assert_eq!(entry.last_access_at, 1_020);
    }

    #[test]
    fn test_clock_behind_creation_is_not_expired() {
        let entry = entry(1_000, 0);
        assert!(!entry.is_expired(500));
        assert_eq!(entry.age_ms(500), 0);
    }
}
