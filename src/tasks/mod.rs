//! Background Tasks Module
//!
//! Long-running tasks spawned at startup and aborted on shutdown.
//!
//! # Tasks
//! - Expiry: fires due cache expirations and sweeps missed ones
//! - Periodic sync: drains the sync queue on a fixed interval
//! - Reconnect sync: drains the sync queue when connectivity returns

mod expiry;
mod sync;

pub use expiry::spawn_expiry_task;
pub use sync::{spawn_reconnect_task, spawn_sync_task};
