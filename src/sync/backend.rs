//! Backend operations the sync queue replays mutations through.

use async_trait::async_trait;

use crate::sync::{NewLesson, NewNotification, NewProfile, ProfileUpdate, QuizSubmission};

// == Sync Backend ==
/// Domain mutations, one per `SyncAction` variant.
///
/// Implementations own their timeouts; the queue waits as long as they do.
#[async_trait]
pub trait SyncBackend: Send + Sync {
    async fn create_profile(&self, profile: &NewProfile) -> anyhow::Result<()>;

    async fn update_profile(&self, update: &ProfileUpdate) -> anyhow::Result<()>;

    async fn create_lesson(&self, lesson: &NewLesson) -> anyhow::Result<()>;

    async fn save_quiz_result(&self, result: &QuizSubmission) -> anyhow::Result<()>;

    async fn create_notification(&self, notification: &NewNotification) -> anyhow::Result<()>;
}
