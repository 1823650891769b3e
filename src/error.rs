//! Error types for the resilience layer
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::offline::DataType;

// == Resilience Error Enum ==
/// Unified error type for the resilience layer.
///
/// Cache misses are not errors; they surface as `None`.
#[derive(Error, Debug)]
pub enum ResilienceError {
    /// Offline (or no fetch available) and nothing cached for the data type
    #[error("No data available for {0}")]
    NoDataAvailable(DataType),

    /// The injected fetch failed and no cached fallback existed
    #[error("Fetch failed for {data_type}: {message}")]
    Fetch { data_type: DataType, message: String },

    /// The operation requires connectivity
    #[error("Cannot sync while offline")]
    Offline,

    /// Durable storage read or write failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// A value could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for ResilienceError {
    fn from(err: serde_json::Error) -> Self {
        ResilienceError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for ResilienceError {
    fn from(err: std::io::Error) -> Self {
        ResilienceError::Storage(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ResilienceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ResilienceError::NoDataAvailable(_) => StatusCode::NOT_FOUND,
            ResilienceError::Fetch { .. } => StatusCode::BAD_GATEWAY,
            ResilienceError::Offline => StatusCode::SERVICE_UNAVAILABLE,
            ResilienceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ResilienceError::Storage(_)
            | ResilienceError::Serialization(_)
            | ResilienceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the resilience layer.
pub type Result<T> = std::result::Result<T, ResilienceError>;
