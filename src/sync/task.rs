//! Sync Task
//!
//! One queued mutation plus its replay bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sync::SyncAction;

/// Replays allowed before a task is dropped.
pub const MAX_SYNC_RETRIES: u32 = 3;

// == Sync Task ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncTask {
    /// Time-ordered unique id (UUID v7)
    pub id: Uuid,
    pub action: SyncAction,
    pub enqueued_at: DateTime<Utc>,
    /// Failed replays so far
    #[serde(default)]
    pub retry_count: u32,
}

impl SyncTask {
    pub fn new(action: SyncAction, enqueued_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            action,
            enqueued_at,
            retry_count: 0,
        }
    }

    /// Records a failed replay. Returns `true` once the task has used up
    /// its `max_retries` attempts and must be dropped.
    pub fn record_failure(&mut self, max_retries: u32) -> bool {
        self.retry_count += 1;
        self.retry_count >= max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::ProfileUpdate;
    use serde_json::Map;

    fn task() -> SyncTask {
        SyncTask::new(
            SyncAction::UpdateProfile(ProfileUpdate {
                id: "p1".to_string(),
                fields: Map::new(),
            }),
            Utc::now(),
        )
    }

    #[test]
    fn test_ids_are_unique_and_ordered() {
        let first = task();
        let second = task();

        assert_ne!(first.id, second.id);
        assert!(first.id < second.id);
    }

    #[test]
    fn test_record_failure_hits_ceiling() {
        let mut task = task();

        assert!(!task.record_failure(MAX_SYNC_RETRIES));
        assert!(!task.record_failure(MAX_SYNC_RETRIES));
        assert!(task.record_failure(MAX_SYNC_RETRIES));
        assert_eq!(task.retry_count, 3);
    }

    #[test]
    fn test_serialized_shape() {
        let task = task();
        let json = serde_json::to_value(&task).unwrap();

        assert_eq!(json["action"]["type"], "update_profile");
        assert_eq!(json["retryCount"], 0);
        assert!(json.get("enqueuedAt").is_some());

        let back: SyncTask = serde_json::from_value(json).unwrap();
        assert_eq!(back, task);
    }
}
