//! Portal Resilience - offline-first data access for the learning portal
//!
//! Provides a TTL cache with tag invalidation, stale-while-revalidate reads
//! and a durable sync queue that replays mutations once connectivity returns.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod connectivity;
pub mod context;
pub mod error;
pub mod models;
pub mod offline;
pub mod storage;
pub mod sync;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use context::ResilienceContext;
pub use error::{ResilienceError, Result};
