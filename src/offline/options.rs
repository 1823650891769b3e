//! Per-call caching options.

use std::time::Duration;

/// Default freshness window.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(5 * 60);

/// Default cache lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

// == Cache Options ==
/// How a critical data set is cached and judged fresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    /// Age below which a cached value is served without refetching
    pub max_age: Duration,
    /// Lifetime of the cache entry itself
    pub ttl: Duration,
    /// Also write a durable copy that survives restarts
    pub persistent: bool,
    /// Extra invalidation tags; the data type's own tag is always added
    pub tags: Vec<String>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_MAX_AGE,
            ttl: DEFAULT_TTL,
            persistent: false,
            tags: Vec::new(),
        }
    }
}

impl CacheOptions {
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}
