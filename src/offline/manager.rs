//! Offline Data Manager
//!
//! Cache-first reads with stale-while-revalidate, plus the write side that
//! routes mutations through the sync queue.

use std::collections::BTreeMap;
use std::future::{Future, Ready};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, SharedCache};
use crate::clock::{to_datetime, SharedClock};
use crate::connectivity::ConnectivityMonitor;
use crate::error::{ResilienceError, Result};
use crate::offline::{
    CacheOptions, CacheSource, CriticalData, CriticalRecord, DataRevalidated, DataType, Fetched,
    Revalidation,
};
use crate::storage::DurableStorage;
use crate::sync::{DrainReport, Enqueued, SyncAction, SyncQueue};

/// Buffered revalidation events per subscriber before the slowest lags.
const REVALIDATION_CHANNEL_CAPACITY: usize = 64;

/// Durable copy of a critical data set.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedRecord {
    data: CriticalData,
    synced_at: DateTime<Utc>,
}

/// Snapshot returned by `OfflineDataManager::stats`.
#[derive(Debug, Clone, Serialize)]
pub struct OfflineStats {
    pub online: bool,
    pub pending_sync: usize,
    pub draining: bool,
    pub cache: CacheStats,
    pub last_sync: BTreeMap<DataType, DateTime<Utc>>,
}

// == Offline Data Manager ==
/// Entry point for domain services reading and writing critical data.
///
/// Cloning is cheap; every clone shares the same cache, queue and event
/// channel.
#[derive(Clone)]
pub struct OfflineDataManager {
    cache: SharedCache,
    connectivity: ConnectivityMonitor,
    queue: Arc<SyncQueue>,
    storage: Arc<dyn DurableStorage>,
    clock: SharedClock,
    events: broadcast::Sender<DataRevalidated>,
}

impl std::fmt::Debug for OfflineDataManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineDataManager")
            .field("connectivity", &self.connectivity)
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

impl OfflineDataManager {
    pub fn new(
        cache: SharedCache,
        connectivity: ConnectivityMonitor,
        queue: Arc<SyncQueue>,
        storage: Arc<dyn DurableStorage>,
        clock: SharedClock,
    ) -> Self {
        let (events, _) = broadcast::channel(REVALIDATION_CHANNEL_CAPACITY);
        Self {
            cache,
            connectivity,
            queue,
            storage,
            clock,
            events,
        }
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    pub fn queue(&self) -> &Arc<SyncQueue> {
        &self.queue
    }

    // == Cache Critical Data ==
    /// Stores a data set and stamps its last sync time.
    ///
    /// Both entries carry the data type's tag plus any tags in `options`.
    /// With `options.persistent` a durable copy is written as well; a failed
    /// durable write is logged and does not affect the return value.
    pub async fn cache_critical_data<T: CriticalRecord>(
        &self,
        data: &T,
        options: &CacheOptions,
    ) -> bool {
        let critical = data.clone().into_critical();
        self.store_critical(&critical, options).await
    }

    async fn store_critical(&self, critical: &CriticalData, options: &CacheOptions) -> bool {
        let data_type = critical.data_type();
        let now = self.clock.now_ms();

        let mut tags = options.tags.clone();
        tags.push(data_type.tag().to_string());

        let stored = {
            let mut cache = self.cache.write().await;
            let data_ok = cache.set_with_tags(
                data_type.cache_key(),
                critical,
                options.ttl,
                tags.iter().cloned(),
            );
            let sync_ok =
                cache.set_with_tags(&data_type.last_sync_key(), &now, options.ttl, tags);
            data_ok && sync_ok
        };

        if options.persistent {
            self.persist(critical, now).await;
        }

        debug!(%data_type, records = critical.len(), "Cached critical data");
        stored
    }

    async fn persist(&self, critical: &CriticalData, now: u64) {
        let data_type = critical.data_type();
        let record = PersistedRecord {
            data: critical.clone(),
            synced_at: to_datetime(now).unwrap_or_else(Utc::now),
        };

        let result = match serde_json::to_string(&record) {
            Ok(raw) => self.storage.save(&data_type.record_key(), &raw).await,
            Err(err) => Err(err.into()),
        };
        if let Err(err) = result {
            warn!(%data_type, error = %err, "Failed to persist critical data");
        }
    }

    // == Get Critical Data ==
    /// Reads a data set, cache first.
    ///
    /// - fresh cache hit: returned as is, `fetch` is never called
    /// - stale hit while online: returned immediately while `fetch` runs in
    ///   the background; the handle is in `Fetched::revalidation`
    /// - stale hit while offline: returned with `CacheSource::Offline`
    /// - miss while online: `fetch` is awaited and its result cached; on
    ///   failure a durable copy is used if one exists
    /// - miss while offline: durable copy or `NoDataAvailable`
    pub async fn get_critical_data<T, F, Fut>(
        &self,
        fetch: F,
        options: &CacheOptions,
    ) -> Result<Fetched<T>>
    where
        T: CriticalRecord,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        self.read(Some(fetch), options).await
    }

    /// Reads a data set without any way to refetch it.
    pub async fn get_offline_data<T: CriticalRecord>(
        &self,
        options: &CacheOptions,
    ) -> Result<Fetched<T>> {
        self.read::<T, fn() -> Ready<anyhow::Result<T>>, Ready<anyhow::Result<T>>>(None, options)
            .await
    }

    async fn read<T, F, Fut>(&self, fetch: Option<F>, options: &CacheOptions) -> Result<Fetched<T>>
    where
        T: CriticalRecord,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let data_type = T::DATA_TYPE;
        let online = self.connectivity.is_online();

        if let Some((data, synced_at)) = self.cached::<T>().await {
            if self.is_fresh(synced_at, options.max_age) {
                debug!(%data_type, "Serving fresh cached data");
                return Ok(Fetched::new(data, CacheSource::CacheFresh));
            }

            return Ok(match fetch {
                Some(fetch) if online => {
                    debug!(%data_type, "Serving stale data, revalidating in background");
                    let revalidation = self.revalidate(fetch, options.clone());
                    Fetched::revalidating(data, revalidation)
                }
                _ if online => Fetched::new(data, CacheSource::CacheStale),
                _ => Fetched::new(data, CacheSource::Offline),
            });
        }

        if let (Some(fetch), true) = (fetch, online) {
            return match fetch().await {
                Ok(data) => {
                    self.cache_critical_data(&data, options).await;
                    Ok(Fetched::new(data, CacheSource::Network))
                }
                Err(err) => {
                    let message = format!("{:#}", err);
                    warn!(%data_type, error = %message, "Fetch failed");
                    match self.load_persisted::<T>().await {
                        Some(data) => Ok(Fetched::new(data, CacheSource::Offline)),
                        None => Err(ResilienceError::Fetch { data_type, message }),
                    }
                }
            };
        }

        match self.load_persisted::<T>().await {
            Some(data) => Ok(Fetched::new(data, CacheSource::Offline)),
            None => Err(ResilienceError::NoDataAvailable(data_type)),
        }
    }

    async fn cached<T: CriticalRecord>(&self) -> Option<(T, Option<u64>)> {
        let data_type = T::DATA_TYPE;
        let mut cache = self.cache.write().await;

        let data = cache
            .get::<CriticalData>(data_type.cache_key())
            .and_then(T::from_critical)?;
        let synced_at = cache.get::<u64>(&data_type.last_sync_key());
        Some((data, synced_at))
    }

    /// A missing sync stamp counts as stale.
    fn is_fresh(&self, synced_at: Option<u64>, max_age: Duration) -> bool {
        synced_at
            .map(|at| self.clock.now_ms().saturating_sub(at) < max_age.as_millis() as u64)
            .unwrap_or(false)
    }

    async fn load_persisted<T: CriticalRecord>(&self) -> Option<T> {
        let data_type = T::DATA_TYPE;
        let raw = match self.storage.load(&data_type.record_key()).await {
            Ok(raw) => raw?,
            Err(err) => {
                warn!(%data_type, error = %err, "Failed to read persisted data");
                return None;
            }
        };

        match serde_json::from_str::<PersistedRecord>(&raw) {
            Ok(record) => {
                debug!(%data_type, synced_at = %record.synced_at, "Using persisted data");
                T::from_critical(record.data)
            }
            Err(err) => {
                warn!(%data_type, error = %err, "Persisted data is corrupt");
                None
            }
        }
    }

    fn revalidate<T, F, Fut>(&self, fetch: F, options: CacheOptions) -> Revalidation
    where
        T: CriticalRecord,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let manager = self.clone();
        let handle = tokio::spawn(async move {
            let data_type = T::DATA_TYPE;
            match fetch().await {
                Ok(data) => {
                    let critical = data.into_critical();
                    manager.store_critical(&critical, &options).await;
                    info!(%data_type, "Background revalidation stored fresh data");
                    // no receivers is fine
                    let _ = manager.events.send(DataRevalidated {
                        data_type,
                        data: critical,
                    });
                    true
                }
                Err(err) => {
                    warn!(%data_type, error = %format!("{:#}", err), "Background revalidation failed");
                    false
                }
            }
        });
        Revalidation::new(handle)
    }

    /// Receives a `DataRevalidated` event after every successful background
    /// refresh.
    pub fn subscribe_revalidations(&self) -> broadcast::Receiver<DataRevalidated> {
        self.events.subscribe()
    }

    /// Time of the last successful cache write for `data_type`, if still cached.
    pub async fn last_sync(&self, data_type: DataType) -> Option<DateTime<Utc>> {
        self.cache
            .read()
            .await
            .peek::<u64>(&data_type.last_sync_key())
            .and_then(to_datetime)
    }

    // == Sync ==
    /// Queues a mutation; it is replayed right away when online.
    pub async fn queue_for_sync(&self, action: SyncAction) -> Enqueued {
        self.queue.enqueue(action).await
    }

    pub async fn sync_pending_changes(&self) -> DrainReport {
        self.queue.drain().await
    }

    /// Like `sync_pending_changes`, but refuses to run while offline.
    pub async fn force_sync(&self) -> Result<DrainReport> {
        if !self.connectivity.is_online() {
            return Err(ResilienceError::Offline);
        }
        Ok(self.queue.drain().await)
    }

    // == Stats ==
    pub async fn stats(&self) -> OfflineStats {
        let (cache, last_sync) = {
            let cache = self.cache.read().await;
            let last_sync: BTreeMap<DataType, DateTime<Utc>> = DataType::ALL
                .into_iter()
                .filter_map(|data_type| {
                    cache
                        .peek::<u64>(&data_type.last_sync_key())
                        .and_then(to_datetime)
                        .map(|at| (data_type, at))
                })
                .collect();
            (cache.get_stats(), last_sync)
        };

        OfflineStats {
            online: self.connectivity.is_online(),
            pending_sync: self.queue.len().await,
            draining: self.queue.is_draining(),
            cache,
            last_sync,
        }
    }
}
