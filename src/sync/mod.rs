//! Sync Module
//!
//! Queues mutations made while offline and replays them against the backend.

mod action;
mod backend;
mod http;
mod queue;
mod task;

#[cfg(test)]
pub(crate) mod test_support;

pub use action::{
    LessonFile, NewLesson, NewNotification, NewProfile, ProfileUpdate, QuizSubmission, SyncAction,
};
pub use backend::SyncBackend;
pub use http::HttpSyncBackend;
pub use queue::{DrainReport, Enqueued, SyncQueue};
pub use task::{SyncTask, MAX_SYNC_RETRIES};
