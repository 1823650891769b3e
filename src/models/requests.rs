//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

/// Request body for PUT /connectivity
///
/// Sent by the host whenever its network reachability changes.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectivityRequest {
    pub online: bool,
}
