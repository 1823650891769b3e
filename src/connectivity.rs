//! Connectivity Module
//!
//! Single source of truth for network reachability, driven by host signals.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::info;

// == Connectivity State ==
/// Current reachability and when it last changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectivityState {
    pub online: bool,
    pub changed_at: DateTime<Utc>,
}

// == Connectivity Monitor ==
/// Tracks online/offline transitions reported by the host.
///
/// Cloning yields another handle onto the same state. Subscribers are woken
/// on every transition; nothing is polled.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    tx: Arc<watch::Sender<ConnectivityState>>,
}

impl ConnectivityMonitor {
    // == Constructor ==
    pub fn new(online: bool) -> Self {
        let (tx, _) = watch::channel(ConnectivityState {
            online,
            changed_at: Utc::now(),
        });
        Self { tx: Arc::new(tx) }
    }

    // == Is Online ==
    pub fn is_online(&self) -> bool {
        self.tx.borrow().online
    }

    pub fn state(&self) -> ConnectivityState {
        *self.tx.borrow()
    }

    // == Set Online ==
    /// Applies a host signal. Returns `true` if it was a transition.
    ///
    /// Repeated signals with the same value neither notify subscribers nor
    /// move `changed_at`.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.tx.send_if_modified(|state| {
            if state.online == online {
                return false;
            }
            state.online = online;
            state.changed_at = Utc::now();
            true
        });

        if changed {
            info!(
                "Connectivity changed: {}",
                if online { "online" } else { "offline" }
            );
        }
        changed
    }

    pub fn go_online(&self) -> bool {
        self.set_online(true)
    }

    pub fn go_offline(&self) -> bool {
        self.set_online(false)
    }

    // == Subscribe ==
    /// Receiver woken on each transition.
    pub fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.tx.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}
