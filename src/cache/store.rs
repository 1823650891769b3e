//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with an expiry schedule,
//! access-recency eviction and tag-based invalidation.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::cache::eviction::select_victims;
use crate::cache::{CacheCounters, CacheEntry, CacheStats, ExpirySchedule};
use crate::clock::SharedClock;

/// Cache store shared between the read path, the sync queue and background tasks.
pub type SharedCache = Arc<RwLock<CacheStore>>;

// == Cache Store ==
/// Bounded, expiring key/value storage.
///
/// Values are kept in serialized JSON form. No operation returns an error:
/// serialization problems are logged and degrade to a best-effort result.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Armed expirations, one per live key
    schedule: ExpirySchedule,
    /// Performance counters
    counters: CacheCounters,
    /// Maximum number of entries allowed
    max_size: usize,
    clock: SharedClock,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore holding at most `max_size` entries (minimum one).
    pub fn new(max_size: usize, clock: SharedClock) -> Self {
        Self {
            entries: HashMap::new(),
            schedule: ExpirySchedule::new(),
            counters: CacheCounters::new(),
            max_size: max_size.max(1),
            clock,
        }
    }

    /// Wraps the store for sharing across tasks.
    pub fn into_shared(self) -> SharedCache {
        Arc::new(RwLock::new(self))
    }

    // == Set ==
    /// Stores `value` under `key` for `ttl`.
    ///
    /// Returns `false` if the value could not be serialized; it is then stored
    /// as its `Debug` rendering so the write still lands.
    pub fn set<T>(&mut self, key: &str, value: &T, ttl: Duration) -> bool
    where
        T: Serialize + Debug + ?Sized,
    {
        self.set_with_tags(key, value, ttl, std::iter::empty::<String>())
    }

    // == Set With Tags ==
    /// Stores `value` and labels the entry with `tags` for bulk invalidation.
    ///
    /// Inserting a new key into a full store first evicts the least recently
    /// accessed tenth of the entries. Overwriting resets age, access stats
    /// and the expiry deadline.
    pub fn set_with_tags<T, I, S>(&mut self, key: &str, value: &T, ttl: Duration, tags: I) -> bool
    where
        T: Serialize + Debug + ?Sized,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let now = self.clock.now_ms();
        let ttl_ms = ttl.as_millis() as u64;

        let (serialized, ok) = match serde_json::to_string(value) {
            Ok(serialized) => (serialized, true),
            Err(err) => {
                warn!(key, error = %err, "Serialization failed, storing raw representation");
                (format!("{:?}", value), false)
            }
        };

        if !self.entries.contains_key(key) && self.entries.len() >= self.max_size {
            self.evict();
        }

        let tags: BTreeSet<String> = tags.into_iter().map(Into::into).collect();
        let entry = CacheEntry::new(key, serialized, now, ttl_ms, tags);
        self.schedule.arm(key, entry.expires_at());
        self.entries.insert(key.to_string(), entry);

        ok
    }

    // == Get ==
    /// Retrieves and deserializes a value.
    ///
    /// Returns `None` if the key is absent, expired (checked before any
    /// scheduled expiry fires) or cannot be decoded as `T`. A successful
    /// read bumps the entry's access count and last access time.
    pub fn get<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let now = self.clock.now_ms();

        let decoded = self.live_entry_mut(key).map(|entry| {
            let decoded = serde_json::from_str::<T>(&entry.serialized_value);
            if decoded.is_ok() {
                entry.touch(now);
            }
            decoded
        });

        match decoded {
            Some(Ok(value)) => {
                self.counters.record_hit();
                debug!("Cache hit: {}", key);
                Some(value)
            }
            Some(Err(err)) => {
                self.counters.record_miss();
                warn!(key, error = %err, "Cached value could not be deserialized");
                None
            }
            None => {
                self.counters.record_miss();
                debug!("Cache miss: {}", key);
                None
            }
        }
    }

    // == Get Raw ==
    /// Retrieves the serialized form of a live entry, updating access stats.
    pub fn get_raw(&mut self, key: &str) -> Option<String> {
        let now = self.clock.now_ms();
        let raw = self.live_entry_mut(key).map(|entry| {
            entry.touch(now);
            entry.serialized_value.clone()
        });

        if raw.is_some() {
            self.counters.record_hit();
        } else {
            self.counters.record_miss();
        }
        raw
    }

    // == Peek ==
    /// Reads a live value without touching access stats or counters.
    pub fn peek<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .and_then(|entry| serde_json::from_str(&entry.serialized_value).ok())
    }

    // == Has ==
    /// Same freshness check as `get`, without side effects.
    pub fn has(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .map_or(false, |entry| !entry.is_expired(now))
    }

    // == Delete ==
    /// Removes an entry and cancels its expiry. Returns whether it existed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove_entry(key).is_some()
    }

    // == Clear ==
    /// Removes every entry and cancels every pending expiry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.schedule.clear();
    }

    // == Batch Get ==
    /// Reads several keys; keys with no usable value are left out of the map.
    pub fn mget<T: DeserializeOwned>(&mut self, keys: &[&str]) -> HashMap<String, T> {
        keys.iter()
            .filter_map(|key| self.get(key).map(|value| (key.to_string(), value)))
            .collect()
    }

    // == Batch Set ==
    /// Stores several values with a shared TTL. Returns `false` if any value
    /// fell back to its raw representation.
    pub fn mset<K, T, I>(&mut self, entries: I, ttl: Duration) -> bool
    where
        K: AsRef<str>,
        T: Serialize + Debug,
        I: IntoIterator<Item = (K, T)>,
    {
        let mut all_serialized = true;
        for (key, value) in entries {
            let stored = self.set(key.as_ref(), &value, ttl);
            all_serialized = all_serialized && stored;
        }
        all_serialized
    }

    // == Extend ==
    /// Adds `additional` to the entry's total TTL and re-arms its expiry.
    ///
    /// Returns `false` when the key is absent or already expired.
    pub fn extend(&mut self, key: &str, additional: Duration) -> bool {
        if self.live_entry_mut(key).is_none() {
            return false;
        }

        let Some(entry) = self.entries.get_mut(key) else {
            return false;
        };
        entry.ttl_ms = entry.ttl_ms.saturating_add(additional.as_millis() as u64);
        let deadline = entry.expires_at();

        self.schedule.arm(key, deadline);
        true
    }

    // == Tag Invalidation ==
    /// Removes every entry labelled `tag`. Returns the number removed.
    pub fn invalidate_tag(&mut self, tag: &str) -> usize {
        let keys = self.keys_with_tag(tag);
        for key in &keys {
            self.remove_entry(key);
        }
        if !keys.is_empty() {
            debug!("Invalidated {} entries tagged '{}'", keys.len(), tag);
        }
        keys.len()
    }

    /// Removes every entry carrying any of `tags`.
    pub fn invalidate_tags<S: AsRef<str>>(&mut self, tags: &[S]) -> usize {
        tags.iter().map(|tag| self.invalidate_tag(tag.as_ref())).sum()
    }

    /// Keys currently labelled `tag`, expired or not.
    pub fn keys_with_tag(&self, tag: &str) -> Vec<String> {
        self.entries
            .values()
            .filter(|entry| entry.tags.contains(tag))
            .map(|entry| entry.key.clone())
            .collect()
    }

    // == Run Expirations ==
    /// Fires every scheduled expiry whose deadline has passed.
    ///
    /// Returns the number of entries removed.
    pub fn run_expirations(&mut self) -> usize {
        let now = self.clock.now_ms();
        let mut removed = 0;

        for key in self.schedule.pop_due(now) {
            let expired = self
                .entries
                .get(&key)
                .map_or(false, |entry| entry.is_expired(now));
            if expired {
                self.entries.remove(&key);
                removed += 1;
            }
        }

        self.counters.record_expirations(removed);
        removed
    }

    // == Cleanup ==
    /// Purges every logically expired entry, whether or not its scheduled
    /// expiry has fired. Returns the number removed.
    pub fn cleanup(&mut self) -> usize {
        let now = self.clock.now_ms();
        let expired_keys: Vec<String> = self
            .entries
            .values()
            .filter(|entry| entry.is_expired(now))
            .map(|entry| entry.key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_entry(key);
        }

        self.counters.record_expirations(expired_keys.len());
        expired_keys.len()
    }

    // == Stats ==
    /// Returns a diagnostic snapshot.
    pub fn get_stats(&self) -> CacheStats {
        let now = self.clock.now_ms();
        let size = self.entries.len();

        let total_age: u64 = self.entries.values().map(|e| e.age_ms(now)).sum();
        let average_age_ms = if size == 0 { 0 } else { total_age / size as u64 };

        CacheStats {
            size,
            max_size: self.max_size,
            average_age_ms,
            memory_estimate: self.entries.values().map(CacheEntry::size_estimate).sum(),
            expired_count: self.entries.values().filter(|e| e.is_expired(now)).count(),
            pending_timers: self.schedule.pending(),
            hits: self.counters.hits,
            misses: self.counters.misses,
            evictions: self.counters.evictions,
            expirations: self.counters.expirations,
            hit_rate: self.counters.hit_rate(),
        }
    }

    /// Metadata for a key, expired or not.
    pub fn entry(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    // == Length ==
    /// Returns the current number of entries, including unpurged expired ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    fn live_entry_mut(&mut self, key: &str) -> Option<&mut CacheEntry> {
        let now = self.clock.now_ms();
        let expired = self.entries.get(key)?.is_expired(now);
        if expired {
            self.remove_entry(key);
            self.counters.record_expirations(1);
            debug!("Cache entry expired: {}", key);
            return None;
        }
        self.entries.get_mut(key)
    }

    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry> {
        self.schedule.cancel(key);
        self.entries.remove(key)
    }

    fn evict(&mut self) {
        let victims = select_victims(&self.entries);
        for key in &victims {
            self.remove_entry(key);
        }
        self.counters.record_evictions(victims.len());
        debug!("Evicted {} least recently accessed entries", victims.len());
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use serde::ser::Error as _;
    use serde::Serializer;

    fn store(max_size: usize) -> (CacheStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        (CacheStore::new(max_size, clock.clone()), clock)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[derive(Debug)]
    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _: S) -> std::result::Result<S::Ok, S::Error> {
            Err(S::Error::custom("nope"))
        }
    }

    #[test]
    fn test_store_new() {
        let (store, _) = store(100);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.max_size(), 100);
    }

    #[test]
    fn test_set_and_get() {
        let (mut store, _) = store(100);

        assert!(store.set("key1", &vec![1, 2, 3], ms(1_000)));
        let value: Option<Vec<i32>> = store.get("key1");

        assert_eq!(value, Some(vec![1, 2, 3]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_updates_access_stats() {
        let (mut store, clock) = store(100);
        store.set("key1", "v", ms(1_000));

        clock.advance(ms(10));
        let _: Option<String> = store.get("key1");
        clock.advance(ms(10));
        let _: Option<String> = store.get("key1");

        let entry = store.entry("key1").unwrap();
        assert_eq!(entry.access_count, 2);
        assert_eq!(entry.last_access_at, 1_020);
    }

    #[test]
    fn test_ttl_expiry_is_lazy() {
        let (mut store, clock) = store(100);
        store.set("k", "v", ms(100));

        clock.advance(ms(150));

        // no expiry has been run, the read itself rejects the entry
        assert!(!store.has("k"));
        assert_eq!(store.get::<String>("k"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_has_does_not_touch() {
        let (mut store, _) = store(100);
        store.set("k", "v", ms(100));

        assert!(store.has("k"));
        assert_eq!(store.entry("k").unwrap().access_count, 0);
        assert_eq!(store.get_stats().hits, 0);
    }

    #[test]
    fn test_serialization_failure_falls_back_to_raw() {
        let (mut store, _) = store(100);

        assert!(!store.set("bad", &Unserializable, ms(100)));
        assert!(store.has("bad"));
        assert_eq!(store.get_raw("bad"), Some("Unserializable".to_string()));
    }

    #[test]
    fn test_shape_mismatch_is_a_miss() {
        let (mut store, _) = store(100);
        store.set("k", "text", ms(100));

        assert_eq!(store.get::<u32>("k"), None);
        assert_eq!(store.get_stats().misses, 1);
        assert!(store.has("k"));
    }

    #[test]
    fn test_delete_and_clear() {
        let (mut store, _) = store(100);
        store.set("a", &1, ms(100));
        store.set("b", &2, ms(100));

        assert!(store.delete("a"));
        assert!(!store.delete("a"));
        assert_eq!(store.get_stats().pending_timers, 1);

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.get_stats().pending_timers, 0);
    }

    #[test]
    fn test_overwrite_resets_entry() {
        let (mut store, clock) = store(100);
        store.set("k", &1, ms(100));
        clock.advance(ms(80));
        store.set("k", &2, ms(100));
        clock.advance(ms(80));

        assert_eq!(store.get::<i32>("k"), Some(2));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_capacity_eviction_by_last_access() {
        let (mut store, clock) = store(10);
        for i in 0..10 {
            store.set(&format!("k{}", i), &i, ms(60_000));
            clock.advance(ms(1));
        }
        // k0 is the oldest write but the most recent read
        let _: Option<i32> = store.get("k0");

        store.set("new", &99, ms(60_000));

        assert_eq!(store.len(), 10);
        assert!(store.has("k0"));
        assert!(!store.has("k1"));
        assert!(store.has("new"));
        assert_eq!(store.get_stats().evictions, 1);
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_evict() {
        let (mut store, _) = store(2);
        store.set("a", &1, ms(100));
        store.set("b", &2, ms(100));
        store.set("a", &3, ms(100));

        assert_eq!(store.len(), 2);
        assert_eq!(store.get_stats().evictions, 0);
    }

    #[test]
    fn test_mget_and_mset() {
        let (mut store, _) = store(100);
        assert!(store.mset(vec![("a", 1), ("b", 2)], ms(100)));

        let values: HashMap<String, i32> = store.mget(&["a", "b", "missing"]);
        assert_eq!(values.len(), 2);
        assert_eq!(values["a"], 1);
        assert_eq!(values["b"], 2);
    }

    #[test]
    fn test_extend() {
        let (mut store, clock) = store(100);
        store.set("k", "v", ms(100));

        clock.advance(ms(90));
        assert!(store.extend("k", ms(100)));
        assert_eq!(store.entry("k").unwrap().ttl_ms, 200);

        clock.advance(ms(100));
        assert_eq!(store.run_expirations(), 0);
        assert!(store.has("k"));

        clock.advance(ms(20));
        assert_eq!(store.run_expirations(), 1);
        assert!(!store.has("k"));
    }

    #[test]
    fn test_extend_missing_or_expired() {
        let (mut store, clock) = store(100);
        assert!(!store.extend("missing", ms(10)));

        store.set("k", "v", ms(10));
        clock.advance(ms(11));
        assert!(!store.extend("k", ms(10)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_run_expirations() {
        let (mut store, clock) = store(100);
        store.set("short", &1, ms(10));
        store.set("long", &2, ms(1_000));

        clock.advance(ms(11));
        assert_eq!(store.run_expirations(), 1);
        assert!(store.has("long"));
        assert_eq!(store.get_stats().expirations, 1);
    }

    #[test]
    fn test_cleanup_catches_missed_timers() {
        let (mut store, clock) = store(100);
        store.set("a", &1, ms(10));
        store.set("b", &2, ms(10));
        store.set("c", &3, ms(1_000));

        clock.advance(ms(50));
        assert_eq!(store.get_stats().expired_count, 2);

        assert_eq!(store.cleanup(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_stats().pending_timers, 1);
    }

    #[test]
    fn test_tags() {
        let (mut store, _) = store(100);
        store.set_with_tags("lessons", &1, ms(100), ["lessons"]);
        store.set_with_tags("lessons_last_sync", &2, ms(100), ["lessons"]);
        store.set_with_tags("profiles", &3, ms(100), ["profiles"]);

        assert_eq!(store.keys_with_tag("lessons").len(), 2);
        assert_eq!(store.invalidate_tags(&["lessons", "unknown"]), 2);
        assert!(store.has("profiles"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_stats_snapshot() {
        let (mut store, clock) = store(100);
        store.set("a", &1, ms(1_000));
        clock.advance(ms(100));
        store.set("b", &2, ms(1_000));

        let _: Option<i32> = store.get("a");
        let _: Option<i32> = store.get("missing");

        let stats = store.get_stats();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.max_size, 100);
        assert_eq!(stats.average_age_ms, 50);
        assert!(stats.memory_estimate > 0);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate, 0.5);
    }

    #[test]
    fn test_peek_has_no_side_effects() {
        let (mut store, _) = store(100);
        store.set("k", &5, ms(100));

        assert_eq!(store.peek::<i32>("k"), Some(5));
        assert_eq!(store.get_stats().hits, 0);
        assert_eq!(store.entry("k").unwrap().access_count, 0);
    }
}
