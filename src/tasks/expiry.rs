//! Expiry Task
//!
//! Background task that fires due cache expirations.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::SharedCache;

/// Spawns a background task that periodically expires cache entries.
///
/// Each tick fires every expiry deadline that has passed, then runs a full
/// `cleanup()` sweep to catch entries whose deadline was missed while the
/// process was suspended.
///
/// The returned handle is aborted on shutdown.
pub fn spawn_expiry_task(cache: SharedCache, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting expiry task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let (fired, swept) = {
                let mut cache = cache.write().await;
                let fired = cache.run_expirations();
                (fired, cache.cleanup())
            };

            if fired + swept > 0 {
                info!("Expiry: removed {} scheduled and {} missed entries", fired, swept);
            } else {
                debug!("Expiry: nothing due");
            }
        }
    })
}
