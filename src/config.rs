//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// Default cache lifetime in seconds for critical data
    pub default_ttl: u64,
    /// Default freshness window in seconds before a cached value is revalidated
    pub max_age: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Expiry task interval in seconds
    pub expiry_interval: u64,
    /// Periodic sync interval in seconds
    pub sync_interval: u64,
    /// Directory holding durable records
    pub data_dir: PathBuf,
    /// Base URL sync mutations are replayed against
    pub api_base_url: String,
    /// Initial connectivity state until the host reports otherwise
    pub start_online: bool,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `DEFAULT_TTL` - Cache lifetime in seconds (default: 86400)
    /// - `MAX_AGE` - Freshness window in seconds (default: 300)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `EXPIRY_INTERVAL` - Expiry frequency in seconds (default: 1)
    /// - `SYNC_INTERVAL` - Periodic sync frequency in seconds (default: 300)
    /// - `DATA_DIR` - Durable storage directory (default: ./data)
    /// - `API_BASE_URL` - Backend API (default: http://localhost:8080/api)
    /// - `START_ONLINE` - Initial connectivity (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env_or("MAX_ENTRIES", defaults.max_entries),
            default_ttl: env_or("DEFAULT_TTL", defaults.default_ttl),
            max_age: env_or("MAX_AGE", defaults.max_age),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            expiry_interval: env_or("EXPIRY_INTERVAL", defaults.expiry_interval),
            sync_interval: env_or("SYNC_INTERVAL", defaults.sync_interval),
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            api_base_url: env::var("API_BASE_URL").unwrap_or(defaults.api_base_url),
            start_online: env_or("START_ONLINE", defaults.start_online),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age)
    }

    pub fn expiry_interval(&self) -> Duration {
        Duration::from_secs(self.expiry_interval.max(1))
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl: 24 * 60 * 60,
            max_age: 5 * 60,
            server_port: 3000,
            expiry_interval: 1,
            sync_interval: 5 * 60,
            data_dir: PathBuf::from("./data"),
            api_base_url: "http://localhost:8080/api".to_string(),
            start_online: true,
        }
    }
}
