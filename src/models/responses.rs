//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::connectivity::ConnectivityState;
use crate::offline::{CacheSource, CriticalData};
use crate::sync::SyncTask;

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Response body for GET and PUT /connectivity
#[derive(Debug, Clone, Serialize)]
pub struct ConnectivityResponse {
    pub online: bool,
    pub changed_at: DateTime<Utc>,
    /// Whether this request flipped the state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed: Option<bool>,
}

impl ConnectivityResponse {
    pub fn new(state: ConnectivityState, changed: Option<bool>) -> Self {
        Self {
            online: state.online,
            changed_at: state.changed_at,
            changed,
        }
    }
}

/// Response body for GET /queue
#[derive(Debug, Clone, Serialize)]
pub struct QueueResponse {
    pub pending: usize,
    pub draining: bool,
    pub tasks: Vec<SyncTask>,
}

/// Response body for POST /queue
#[derive(Debug, Clone, Serialize)]
pub struct EnqueueResponse {
    pub id: Uuid,
    pub action: String,
    /// Queue length right after the enqueue
    pub pending: usize,
}

/// Response body for DELETE /cache/tags/:tag
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub tag: String,
    pub removed: usize,
}

/// Response body for POST /cache/cleanup
#[derive(Debug, Clone, Serialize)]
pub struct CleanupResponse {
    pub removed: usize,
    pub remaining: usize,
}

/// Response body for GET /data/:data_type
#[derive(Debug, Clone, Serialize)]
pub struct DataResponse {
    pub source: CacheSource,
    /// Tagged set, `{"data_type": .., "data": [..]}`
    pub data: CriticalData,
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
