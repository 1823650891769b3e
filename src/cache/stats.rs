//! Cache Statistics Module
//!
//! Tracks cache performance counters and builds diagnostic snapshots.

use serde::Serialize;

// == Cache Counters ==
/// Running counters kept by the store.
#[derive(Debug, Clone, Default)]
pub struct CacheCounters {
    /// Number of successful reads
    pub hits: u64,
    /// Number of reads that found nothing usable
    pub misses: u64,
    /// Number of entries removed by capacity eviction
    pub evictions: u64,
    /// Number of entries removed because their TTL elapsed
    pub expirations: u64,
}

impl CacheCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Cache Stats ==
/// Point-in-time snapshot of the store. Building one performs no I/O.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CacheStats {
    /// Current number of entries, including logically expired ones not yet purged
    pub size: usize,
    /// Capacity bound
    pub max_size: usize,
    /// Mean entry age in milliseconds
    pub average_age_ms: u64,
    /// Approximate bytes held by keys, values and tags
    pub memory_estimate: usize,
    /// Entries past their TTL still awaiting purge
    pub expired_count: usize,
    /// Armed expirations in the schedule
    pub pending_timers: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    /// hits / (hits + misses)
    pub hit_rate: f64,
}
