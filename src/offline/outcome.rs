//! Read results, background revalidation handles and revalidation events.

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::error::{ResilienceError, Result};
use crate::offline::{CriticalData, DataType};

// == Cache Source ==
/// Where the returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheSource {
    /// Fetched just now
    Network,
    /// Cached and younger than `max_age`
    CacheFresh,
    /// Cached but older than `max_age`; a refresh may be running
    CacheStale,
    /// Served from cache because the network was unavailable or failed
    Offline,
}

// == Revalidation ==
/// Handle on a detached background refresh.
///
/// Dropping it leaves the refresh running.
#[derive(Debug)]
pub struct Revalidation {
    handle: JoinHandle<bool>,
}

impl Revalidation {
    pub(crate) fn new(handle: JoinHandle<bool>) -> Self {
        Self { handle }
    }

    /// Waits for the refresh. Returns `true` if fresh data was cached.
    ///
    /// A refresh that panicked or was cancelled is an `Internal` error.
    pub async fn wait(self) -> Result<bool> {
        self.handle
            .await
            .map_err(|err| ResilienceError::Internal(format!("Revalidation task failed: {}", err)))
    }
}

// == Fetched ==
/// Result of a critical data read.
#[derive(Debug)]
pub struct Fetched<T> {
    pub data: T,
    pub source: CacheSource,
    /// Present when a stale value was returned and a refresh was started
    pub revalidation: Option<Revalidation>,
}

impl<T> Fetched<T> {
    pub(crate) fn new(data: T, source: CacheSource) -> Self {
        Self {
            data,
            source,
            revalidation: None,
        }
    }

    pub(crate) fn revalidating(data: T, revalidation: Revalidation) -> Self {
        Self {
            data,
            source: CacheSource::CacheStale,
            revalidation: Some(revalidation),
        }
    }

    /// Drops the metadata; any revalidation keeps running detached.
    pub fn into_data(self) -> T {
        self.data
    }
}

// == Data Revalidated ==
/// Broadcast after a background refresh stored fresh data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataRevalidated {
    pub data_type: DataType,
    pub data: CriticalData,
}
