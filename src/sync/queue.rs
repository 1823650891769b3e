//! Sync Queue
//!
//! Durable, ordered buffer of mutations with bounded retry. Every change to
//! the task list is written through to durable storage.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::SharedCache;
use crate::clock::{to_datetime, SharedClock};
use crate::connectivity::ConnectivityMonitor;
use crate::error::Result;
use crate::offline::DataType;
use crate::storage::{DurableStorage, SYNC_QUEUE_KEY};
use crate::sync::{SyncAction, SyncBackend, SyncTask, MAX_SYNC_RETRIES};

// == Drain Report ==
/// Outcome of a `drain` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// Tasks replayed successfully and removed
    pub replayed: usize,
    /// Replays that failed (kept or dropped)
    pub failed: usize,
    /// Tasks dropped after reaching the retry ceiling
    pub dropped: usize,
    /// Tasks still queued afterwards
    pub remaining: usize,
    /// Cache entries invalidated after successful replays
    pub invalidated: usize,
    /// Another drain was already running; a follow-up pass was requested instead
    pub skipped: bool,
    /// Nothing was attempted because the monitor reports offline
    pub offline: bool,
}

impl DrainReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Default::default()
        }
    }

    fn absorb(&mut self, pass: DrainReport) {
        self.replayed += pass.replayed;
        self.failed += pass.failed;
        self.dropped += pass.dropped;
        self.invalidated += pass.invalidated;
        self.remaining = pass.remaining;
        self.offline = pass.offline;
    }
}

/// Result of `enqueue`.
#[derive(Debug)]
pub struct Enqueued {
    pub id: Uuid,
    /// The immediate drain attempt, started only when online
    pub drain: Option<JoinHandle<DrainReport>>,
}

// == Sync Queue ==
pub struct SyncQueue {
    tasks: Mutex<VecDeque<SyncTask>>,
    draining: AtomicBool,
    drain_requested: AtomicBool,
    max_retries: u32,
    backend: Arc<dyn SyncBackend>,
    cache: SharedCache,
    connectivity: ConnectivityMonitor,
    storage: Arc<dyn DurableStorage>,
    clock: SharedClock,
}

impl std::fmt::Debug for SyncQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncQueue")
            .field("draining", &self.draining.load(Ordering::Relaxed))
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl SyncQueue {
    // == Load ==
    /// Builds the queue, restoring any tasks persisted by a previous run.
    ///
    /// An unreadable or corrupt record is logged and replaced by an empty
    /// queue; startup never fails on it.
    pub async fn load(
        backend: Arc<dyn SyncBackend>,
        cache: SharedCache,
        connectivity: ConnectivityMonitor,
        storage: Arc<dyn DurableStorage>,
        clock: SharedClock,
    ) -> Arc<Self> {
        let tasks = match storage.load(SYNC_QUEUE_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<VecDeque<SyncTask>>(&raw) {
                Ok(tasks) => tasks,
                Err(err) => {
                    warn!(error = %err, "Persisted sync queue is corrupt, starting empty");
                    VecDeque::new()
                }
            },
            Ok(None) => VecDeque::new(),
            Err(err) => {
                warn!(error = %err, "Failed to read persisted sync queue, starting empty");
                VecDeque::new()
            }
        };

        if !tasks.is_empty() {
            info!("Restored {} pending sync tasks", tasks.len());
        }

        Arc::new(Self {
            tasks: Mutex::new(tasks),
            draining: AtomicBool::new(false),
            drain_requested: AtomicBool::new(false),
            max_retries: MAX_SYNC_RETRIES,
            backend,
            cache,
            connectivity,
            storage,
            clock,
        })
    }

    // == Enqueue ==
    /// Appends a task, persists the queue and, when online, starts a drain.
    pub async fn enqueue(self: &Arc<Self>, action: SyncAction) -> Enqueued {
        let enqueued_at = to_datetime(self.clock.now_ms()).unwrap_or_else(Utc::now);
        let task = SyncTask::new(action, enqueued_at);
        let id = task.id;
        info!(%id, action = %task.action, "Queued for sync");

        {
            let mut tasks = self.tasks.lock().await;
            tasks.push_back(task);
            if let Err(err) = self.persist(&tasks).await {
                warn!(error = %err, "Failed to persist sync queue");
            }
        }

        let drain = if self.connectivity.is_online() {
            let queue = Arc::clone(self);
            Some(tokio::spawn(async move { queue.drain().await }))
        } else {
            None
        };

        Enqueued { id, drain }
    }

    // == Drain ==
    /// Replays queued tasks in FIFO order.
    ///
    /// Only one drain runs at a time. A call arriving mid-drain returns a
    /// `skipped` report and requests one follow-up pass from the running
    /// drain, so tasks enqueued meanwhile are not left waiting for the next
    /// periodic tick.
    pub async fn drain(&self) -> DrainReport {
        if self.draining.swap(true, Ordering::AcqRel) {
            self.drain_requested.store(true, Ordering::Release);
            debug!("Drain already running, follow-up pass requested");
            return DrainReport::skipped();
        }

        let mut report = DrainReport::default();
        loop {
            self.drain_requested.store(false, Ordering::Release);
            report.absorb(self.drain_pass().await);
            if self.drain_requested.load(Ordering::Acquire) {
                debug!("Running requested follow-up drain pass");
                continue;
            }
            if !self.release_drain() {
                break;
            }
            debug!("Follow-up pass requested while releasing the drain guard");
        }

        report
    }

    /// Clears the drain guard. Returns `true` when a request arrived after the
    /// last pass and the guard was taken back to serve it.
    fn release_drain(&self) -> bool {
        self.draining.store(false, Ordering::Release);
        // a failed re-acquire means a newer drain owns the guard and sees the tasks
        self.drain_requested.swap(false, Ordering::AcqRel)
            && self
                .draining
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
    }

    async fn drain_pass(&self) -> DrainReport {
        if !self.connectivity.is_online() {
            return DrainReport {
                offline: true,
                remaining: self.len().await,
                ..Default::default()
            };
        }

        let snapshot: Vec<SyncTask> = self.tasks.lock().await.iter().cloned().collect();
        if snapshot.is_empty() {
            return DrainReport::default();
        }

        info!("Draining {} pending sync tasks", snapshot.len());

        let mut succeeded = HashSet::new();
        let mut failed = HashSet::new();
        let mut stale: BTreeSet<DataType> = BTreeSet::new();

        for task in &snapshot {
            match task.action.dispatch(self.backend.as_ref()).await {
                Ok(()) => {
                    debug!(id = %task.id, action = %task.action, "Replayed sync task");
                    succeeded.insert(task.id);
                    stale.extend(task.action.invalidates());
                }
                Err(err) => {
                    warn!(
                        id = %task.id,
                        action = %task.action,
                        attempt = task.retry_count + 1,
                        error = %format!("{:#}", err),
                        "Sync task failed"
                    );
                    failed.insert(task.id);
                }
            }
        }

        let mut report = DrainReport {
            replayed: succeeded.len(),
            failed: failed.len(),
            ..Default::default()
        };

        {
            let mut tasks = self.tasks.lock().await;
            let max_retries = self.max_retries;
            let mut dropped = 0;

            tasks.retain_mut(|task| {
                if succeeded.contains(&task.id) {
                    return false;
                }
                if failed.contains(&task.id) && task.record_failure(max_retries) {
                    warn!(
                        id = %task.id,
                        action = %task.action,
                        retries = task.retry_count,
                        "Dropping sync task after repeated failures, its change is lost"
                    );
                    dropped += 1;
                    return false;
                }
                true
            });

            report.dropped = dropped;
            report.remaining = tasks.len();
            if let Err(err) = self.persist(&tasks).await {
                warn!(error = %err, "Failed to persist sync queue");
            }
        }

        if !stale.is_empty() {
            let tags: Vec<&str> = stale.iter().map(DataType::tag).collect();
            report.invalidated = self.cache.write().await.invalidate_tags(&tags);
        }

        info!(
            "Drain finished: {} replayed, {} failed, {} dropped, {} remaining",
            report.replayed, report.failed, report.dropped, report.remaining
        );
        report
    }

    // == Inspection ==
    /// Snapshot of the queued tasks in replay order.
    pub async fn pending(&self) -> Vec<SyncTask> {
        self.tasks.lock().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.tasks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.lock().await.is_empty()
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    // == Flush ==
    /// Writes the current queue to durable storage.
    pub async fn flush(&self) -> Result<()> {
        let tasks = self.tasks.lock().await;
        self.persist(&tasks).await
    }

    /// Discards every queued task.
    pub async fn clear(&self) -> Result<()> {
        let mut tasks = self.tasks.lock().await;
        tasks.clear();
        self.persist(&tasks).await
    }

    async fn persist(&self, tasks: &VecDeque<SyncTask>) -> Result<()> {
        let raw = serde_json::to_string(tasks)?;
        self.storage.save(SYNC_QUEUE_KEY, &raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStorage;
    use crate::sync::test_support::{lesson_action, profile_action, ScriptedBackend};
    use std::time::Duration;
    use tokio_test::assert_ok;

    struct Harness {
        queue: Arc<SyncQueue>,
        backend: Arc<ScriptedBackend>,
        storage: Arc<MemoryStorage>,
        cache: SharedCache,
        connectivity: ConnectivityMonitor,
    }

    async fn harness(online: bool, backend: ScriptedBackend) -> Harness {
        harness_with_storage(online, backend, Arc::new(MemoryStorage::new())).await
    }

    async fn harness_with_storage(
        online: bool,
        backend: ScriptedBackend,
        storage: Arc<MemoryStorage>,
    ) -> Harness {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let cache = CacheStore::new(100, clock.clone()).into_shared();
        let connectivity = ConnectivityMonitor::new(online);
        let backend = Arc::new(backend);
        let queue = SyncQueue::load(
            backend.clone(),
            cache.clone(),
            connectivity.clone(),
            storage.clone(),
            clock,
        )
        .await;

        Harness {
            queue,
            backend,
            storage,
            cache,
            connectivity,
        }
    }

    #[tokio::test]
    async fn test_enqueue_offline_persists_without_draining() {
        let h = harness(false, ScriptedBackend::new()).await;

        let enqueued = h.queue.enqueue(profile_action("Ada")).await;

        assert!(enqueued.drain.is_none());
        assert_eq!(h.queue.len().await, 1);
        assert!(h.storage.load(SYNC_QUEUE_KEY).await.unwrap().is_some());
        assert!(h.backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_enqueue_online_drains_immediately() {
        let h = harness(true, ScriptedBackend::new()).await;

        let enqueued = h.queue.enqueue(profile_action("Ada")).await;
        let report = assert_ok!(enqueued.drain.expect("online enqueue drains").await);

        assert_eq!(report.replayed, 1);
        assert!(h.queue.is_empty().await);
        assert_eq!(h.backend.calls(), vec!["create_profile"]);
    }

    #[tokio::test]
    async fn test_drain_replays_in_enqueue_order() {
        let h = harness(false, ScriptedBackend::new()).await;
        h.queue.enqueue(lesson_action("Volcanoes")).await;
        h.queue.enqueue(profile_action("Ada")).await;
        h.queue.enqueue(lesson_action("Fractions")).await;

        h.connectivity.go_online();
        let report = h.queue.drain().await;

        assert_eq!(report.replayed, 3);
        assert_eq!(
            h.backend.calls(),
            vec!["create_lesson", "create_profile", "create_lesson"]
        );
        assert_eq!(report.remaining, 0);
    }

    #[tokio::test]
    async fn test_retry_ceiling_drops_task_after_three_attempts() {
        let h = harness(false, ScriptedBackend::failing()).await;
        h.queue.enqueue(profile_action("Ada")).await;
        h.connectivity.go_online();

        let first = h.queue.drain().await;
        assert_eq!((first.failed, first.dropped, first.remaining), (1, 0, 1));
        assert_eq!(h.queue.pending().await[0].retry_count, 1);

        let second = h.queue.drain().await;
        assert_eq!((second.failed, second.dropped, second.remaining), (1, 0, 1));

        let third = h.queue.drain().await;
        assert_eq!((third.failed, third.dropped, third.remaining), (1, 1, 0));

        let fourth = h.queue.drain().await;
        assert_eq!(fourth, DrainReport::default());
        assert_eq!(h.backend.call_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_drain_performs_no_writes() {
        let h = harness(true, ScriptedBackend::new()).await;
        let writes_before = h.storage.write_count();

        let report = h.queue.drain().await;

        assert_eq!(report, DrainReport::default());
        assert_eq!(h.storage.write_count(), writes_before);
    }

    #[tokio::test]
    async fn test_offline_drain_is_a_no_op() {
        let h = harness(false, ScriptedBackend::new()).await;
        h.queue.enqueue(profile_action("Ada")).await;
        let writes_before = h.storage.write_count();

        let report = h.queue.drain().await;

        assert!(report.offline);
        assert_eq!(report.remaining, 1);
        assert_eq!(h.storage.write_count(), writes_before);
        assert_eq!(h.queue.pending().await[0].retry_count, 0);
    }

    #[tokio::test]
    async fn test_successful_replay_invalidates_tags() {
        let h = harness(false, ScriptedBackend::new()).await;
        {
            let mut cache = h.cache.write().await;
            cache.set_with_tags("lessons", &1, Duration::from_secs(60), ["lessons"]);
            cache.set_with_tags("lessons_last_sync", &1, Duration::from_secs(60), ["lessons"]);
            cache.set_with_tags("profiles", &1, Duration::from_secs(60), ["profiles"]);
        }
        h.queue.enqueue(lesson_action("Volcanoes")).await;
        h.connectivity.go_online();

        let report = h.queue.drain().await;

        assert_eq!(report.invalidated, 2);
        let cache = h.cache.read().await;
        assert!(!cache.has("lessons"));
        assert!(!cache.has("lessons_last_sync"));
        assert!(cache.has("profiles"));
    }

    #[tokio::test]
    async fn test_failed_replay_does_not_invalidate() {
        let h = harness(false, ScriptedBackend::failing()).await;
        h.cache
            .write()
            .await
            .set_with_tags("lessons", &1, Duration::from_secs(60), ["lessons"]);
        h.queue.enqueue(lesson_action("Volcanoes")).await;
        h.connectivity.go_online();

        let report = h.queue.drain().await;

        assert_eq!(report.invalidated, 0);
        assert!(h.cache.read().await.has("lessons"));
    }

    #[tokio::test]
    async fn test_queue_survives_restart() {
        let storage = Arc::new(MemoryStorage::new());
        let first = harness_with_storage(false, ScriptedBackend::new(), storage.clone()).await;
        let id = first.queue.enqueue(profile_action("Ada")).await.id;

        let second = harness_with_storage(false, ScriptedBackend::new(), storage).await;
        let pending = second.queue.pending().await;

        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);
    }

    #[tokio::test]
    async fn test_corrupt_queue_starts_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.save(SYNC_QUEUE_KEY, "{not json").await.unwrap();

        let h = harness_with_storage(true, ScriptedBackend::new(), storage).await;

        assert!(h.queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_concurrent_drain_requests_follow_up_pass() {
        let h = harness(false, ScriptedBackend::with_delay(Duration::from_millis(50))).await;
        h.queue.enqueue(profile_action("Ada")).await;
        h.connectivity.go_online();

        let running = {
            let queue = h.queue.clone();
            tokio::spawn(async move { queue.drain().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(h.queue.is_draining());

        // enqueue while the first task is still in flight
        let enqueued = h.queue.enqueue(lesson_action("Volcanoes")).await;
        let second = assert_ok!(enqueued.drain.unwrap().await);
        assert!(second.skipped);

        let first = assert_ok!(running.await);
        assert_eq!(first.replayed, 2);
        assert_eq!(h.backend.calls(), vec!["create_profile", "create_lesson"]);
        assert!(h.queue.is_empty().await);
        assert!(!h.queue.is_draining());
    }

    #[tokio::test]
    async fn test_request_after_last_pass_is_served_on_release() {
        let h = harness(true, ScriptedBackend::new()).await;

        // a drain has finished its last pass but still holds the guard
        h.queue.draining.store(true, Ordering::Release);
        let enqueued = h.queue.enqueue(profile_action("Ada")).await;
        let late = assert_ok!(enqueued.drain.unwrap().await);
        assert!(late.skipped);
        assert_eq!(h.queue.len().await, 1);

        // releasing picks up the late request and keeps the guard
        assert!(h.queue.release_drain());
        assert!(h.queue.is_draining());

        let follow_up = h.queue.drain_pass().await;
        assert_eq!(follow_up.replayed, 1);
        assert_eq!(h.backend.calls(), vec!["create_profile"]);

        assert!(!h.queue.release_drain());
        assert!(!h.queue.is_draining());
    }

    #[tokio::test]
    async fn test_clear_and_flush() {
        let h = harness(false, ScriptedBackend::new()).await;
        h.queue.enqueue(profile_action("Ada")).await;

        assert_ok!(h.queue.flush().await);
        assert_ok!(h.queue.clear().await);

        assert!(h.queue.is_empty().await);
        assert_eq!(
            h.storage.load(SYNC_QUEUE_KEY).await.unwrap(),
            Some("[]".to_string())
        );
    }
}
