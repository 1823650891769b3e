//! Resilience Context
//!
//! Builds the cache, connectivity monitor, sync queue and offline manager
//! once at startup and tears them down together.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cache::{CacheStore, SharedCache};
use crate::clock::SharedClock;
use crate::config::Config;
use crate::connectivity::ConnectivityMonitor;
use crate::error::Result;
use crate::offline::{CacheOptions, OfflineDataManager};
use crate::storage::DurableStorage;
use crate::sync::{SyncBackend, SyncQueue};
use crate::tasks::{spawn_expiry_task, spawn_reconnect_task, spawn_sync_task};

/// Process-wide resilience state plus its background tasks.
#[derive(Debug)]
pub struct ResilienceContext {
    pub cache: SharedCache,
    pub connectivity: ConnectivityMonitor,
    pub queue: Arc<SyncQueue>,
    pub offline: OfflineDataManager,
    /// Options built from the configured `max_age` and `default_ttl`
    pub defaults: CacheOptions,
    tasks: Vec<JoinHandle<()>>,
}

impl ResilienceContext {
    // == Init ==
    /// Wires every component and starts the background tasks.
    ///
    /// The queue is reloaded from `storage` before the reconnect and
    /// periodic sync tasks exist, so nothing drains a half-loaded queue.
    pub async fn init(
        config: &Config,
        backend: Arc<dyn SyncBackend>,
        storage: Arc<dyn DurableStorage>,
        clock: SharedClock,
    ) -> Result<Self> {
        let cache = CacheStore::new(config.max_entries, clock.clone()).into_shared();
        let connectivity = ConnectivityMonitor::new(config.start_online);
        let queue = SyncQueue::load(
            backend,
            cache.clone(),
            connectivity.clone(),
            storage.clone(),
            clock.clone(),
        )
        .await;
        // fails fast when storage is not writable
        queue.flush().await?;

        let offline = OfflineDataManager::new(
            cache.clone(),
            connectivity.clone(),
            queue.clone(),
            storage,
            clock,
        );

        let tasks = vec![
            spawn_expiry_task(cache.clone(), config.expiry_interval()),
            spawn_sync_task(queue.clone(), config.sync_interval()),
            spawn_reconnect_task(queue.clone()),
        ];

        info!(
            "Resilience layer ready: max_entries={}, online={}, pending_sync={}",
            config.max_entries,
            connectivity.is_online(),
            queue.len().await
        );

        Ok(Self {
            cache,
            connectivity,
            queue,
            offline,
            defaults: CacheOptions::default()
                .with_max_age(config.max_age())
                .with_ttl(config.default_ttl()),
            tasks,
        })
    }

    // == Shutdown ==
    /// Stops the background tasks, drops every cache entry along with its
    /// pending expiry and writes the queue to durable storage.
    pub async fn shutdown(self) {
        for task in &self.tasks {
            task.abort();
        }

        self.cache.write().await.clear();

        match self.queue.flush().await {
            Ok(()) => info!("Sync queue flushed ({} pending)", self.queue.len().await),
            Err(err) => warn!(error = %err, "Failed to flush sync queue on shutdown"),
        }
    }
}
