//! API Module
//!
//! Admin HTTP surface: host connectivity signals and diagnostics.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Cache, queue and connectivity statistics
//! - `GET /connectivity`, `PUT /connectivity` - Read or report reachability
//! - `POST /sync` - Drain the sync queue now
//! - `GET /queue`, `POST /queue` - List or enqueue sync tasks
//! - `DELETE /cache/tags/:tag` - Invalidate every entry carrying a tag
//! - `POST /cache/cleanup` - Purge expired entries

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
