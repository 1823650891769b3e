//! API Handlers
//!
//! HTTP request handlers for the admin endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::error::{ResilienceError, Result};
use crate::models::{
    CleanupResponse, ConnectivityRequest, ConnectivityResponse, DataResponse, EnqueueResponse,
    HealthResponse, InvalidateResponse, Lesson, Notification, Profile, QueueResponse, QuizResult,
};
use crate::offline::{
    CacheOptions, CacheSource, CriticalData, CriticalRecord, DataType, OfflineDataManager,
    OfflineStats,
};
use crate::sync::{DrainReport, SyncAction};

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub offline: OfflineDataManager,
    /// Freshness window and TTL applied to reads made through the API
    pub defaults: CacheOptions,
}

impl AppState {
    pub fn new(offline: OfflineDataManager, defaults: CacheOptions) -> Self {
        Self { offline, defaults }
    }
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for GET /stats
///
/// Cache statistics, queue depth, connectivity and last sync times.
pub async fn stats_handler(State(state): State<AppState>) -> Json<OfflineStats> {
    Json(state.offline.stats().await)
}

/// Handler for GET /connectivity
pub async fn get_connectivity_handler(State(state): State<AppState>) -> Json<ConnectivityResponse> {
    let connectivity = state.offline.connectivity();
    Json(ConnectivityResponse::new(connectivity.state(), None))
}

/// Handler for PUT /connectivity
///
/// Host-reported reachability. A transition to online triggers a drain
/// through the reconnect task.
pub async fn put_connectivity_handler(
    State(state): State<AppState>,
    Json(req): Json<ConnectivityRequest>,
) -> Json<ConnectivityResponse> {
    let connectivity = state.offline.connectivity();
    let changed = connectivity.set_online(req.online);

    Json(ConnectivityResponse::new(connectivity.state(), Some(changed)))
}

/// Handler for GET /data/:data_type
///
/// Serves the cached or persisted copy of a data set. There is no fetch
/// function here, so a stale entry is returned as is.
pub async fn get_data_handler(
    State(state): State<AppState>,
    Path(data_type): Path<String>,
) -> Result<Json<DataResponse>> {
    let data_type: DataType = data_type.parse().map_err(ResilienceError::InvalidRequest)?;

    let (source, data) = match data_type {
        DataType::Profiles => read_offline::<Vec<Profile>>(&state).await?,
        DataType::Lessons => read_offline::<Vec<Lesson>>(&state).await?,
        DataType::Notifications => read_offline::<Vec<Notification>>(&state).await?,
        DataType::QuizResults => read_offline::<Vec<QuizResult>>(&state).await?,
    };

    Ok(Json(DataResponse { source, data }))
}

async fn read_offline<T: CriticalRecord>(state: &AppState) -> Result<(CacheSource, CriticalData)> {
    let fetched = state.offline.get_offline_data::<T>(&state.defaults).await?;
    let source = fetched.source;
    Ok((source, fetched.into_data().into_critical()))
}

/// Handler for POST /sync
///
/// Drains the queue now. Fails with 503 while offline.
pub async fn sync_handler(State(state): State<AppState>) -> Result<Json<DrainReport>> {
    let report = state.offline.force_sync().await?;
    Ok(Json(report))
}

/// Handler for GET /queue
pub async fn get_queue_handler(State(state): State<AppState>) -> Json<QueueResponse> {
    let queue = state.offline.queue();
    let tasks = queue.pending().await;

    Json(QueueResponse {
        pending: tasks.len(),
        draining: queue.is_draining(),
        tasks,
    })
}

/// Handler for POST /queue
///
/// Queues a mutation. When online the immediate drain runs detached.
pub async fn enqueue_handler(
    State(state): State<AppState>,
    Json(action): Json<SyncAction>,
) -> Result<(StatusCode, Json<EnqueueResponse>)> {
    if let Some(error_msg) = action.validate() {
        return Err(ResilienceError::InvalidRequest(error_msg));
    }

    let name = action.name().to_string();
    let enqueued = state.offline.queue_for_sync(action).await;
    let pending = state.offline.queue().len().await;

    Ok((
        StatusCode::ACCEPTED,
        Json(EnqueueResponse {
            id: enqueued.id,
            action: name,
            pending,
        }),
    ))
}

/// Handler for DELETE /cache/tags/:tag
pub async fn invalidate_tag_handler(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Json<InvalidateResponse> {
    let removed = state.offline.cache().write().await.invalidate_tag(&tag);
    info!(tag = %tag, removed, "Invalidated cache tag");

    Json(InvalidateResponse { tag, removed })
}

/// Handler for POST /cache/cleanup
///
/// Purges every logically expired entry right away.
pub async fn cleanup_handler(State(state): State<AppState>) -> Json<CleanupResponse> {
    let mut cache = state.offline.cache().write().await;
    let removed = cache.cleanup();

    Json(CleanupResponse {
        removed,
        remaining: cache.len(),
    })
}
