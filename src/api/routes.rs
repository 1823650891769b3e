//! API Routes
//!
//! Configures the Axum router with all admin endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cleanup_handler, enqueue_handler, get_connectivity_handler, get_data_handler,
    get_queue_handler, health_handler, invalidate_tag_handler, put_connectivity_handler, stats_handler,
    sync_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route(
            "/connectivity",
            get(get_connectivity_handler).put(put_connectivity_handler),
        )
        .route("/data/:data_type", get(get_data_handler))
        .route("/sync", post(sync_handler))
        .route("/queue", get(get_queue_handler).post(enqueue_handler))
        .route("/cache/tags/:tag", delete(invalidate_tag_handler))
        .route("/cache/cleanup", post(cleanup_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
