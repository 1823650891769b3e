//! Sync Tasks
//!
//! Background drains of the sync queue: on a fixed interval and on every
//! offline to online transition.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::sync::SyncQueue;

/// Spawns a background task that drains the queue every `interval` while
/// online and non-empty.
pub fn spawn_sync_task(queue: Arc<SyncQueue>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting periodic sync task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            if !queue.connectivity().is_online() {
                debug!("Periodic sync: offline, skipping");
                continue;
            }
            if queue.is_empty().await {
                debug!("Periodic sync: queue empty");
                continue;
            }

            let report = queue.drain().await;
            debug!(?report, "Periodic sync finished");
        }
    })
}

/// Spawns a background task that drains the queue as soon as the
/// connectivity monitor reports a transition to online.
pub fn spawn_reconnect_task(queue: Arc<SyncQueue>) -> JoinHandle<()> {
    let mut changes = queue.connectivity().subscribe();
    // baseline taken before spawning so a flip ahead of the first poll still counts
    let mut was_online = changes.borrow_and_update().online;

    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let online = changes.borrow_and_update().online;
            if online && !was_online {
                info!("Connectivity restored, draining sync queue");
                let report = queue.drain().await;
                debug!(?report, "Reconnect sync finished");
            }
            was_online = online;
        }
    })
}
