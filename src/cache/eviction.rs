//! Eviction Module
//!
//! Chooses which entries leave the store when it reaches capacity.

use std::collections::HashMap;

use crate::cache::CacheEntry;

/// One entry in this many is removed on overflow.
pub const EVICTION_DIVISOR: usize = 10;

// == Eviction Count ==
/// Number of entries to evict from a store holding `len` entries.
///
/// Ten percent, rounded down, but never less than one.
pub fn eviction_count(len: usize) -> usize {
    (len / EVICTION_DIVISOR).max(1)
}

// == Select Victims ==
/// Returns the keys of the least recently *accessed* entries.
///
/// Entries are ordered by `last_access_at` ascending; ties fall back to
/// creation time and then key so the choice is deterministic. Write order
/// plays no part beyond the tie-break.
pub fn select_victims(entries: &HashMap<String, CacheEntry>) -> Vec<String> {
    if entries.is_empty() {
        return Vec::new();
    }

    let mut candidates: Vec<&CacheEntry> = entries.values().collect();
    candidates.sort_by(|a, b| {
        a.last_access_at
            .cmp(&b.last_access_at)
            .then(a.created_at.cmp(&b.created_at))
            .then_with(|| a.key.cmp(&b.key))
    });

    candidates
        .into_iter()
        .take(eviction_count(entries.len()))
        .map(|entry| entry.key.clone())
        .collect()
}
