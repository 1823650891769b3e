//! Sync Actions
//!
//! The closed set of mutations that can be queued for replay, with their
//! payloads and the cache tags each one invalidates.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::offline::DataType;
use crate::sync::SyncBackend;

/// Full attributes of a profile to create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProfile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade_level: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Changed fields of an existing profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Attachment uploaded alongside a lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonFile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLesson {
    pub lesson_data: Map<String, Value>,
    pub profile_id: String,
    #[serde(default)]
    pub files: Vec<LessonFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSubmission {
    pub lesson_id: String,
    pub profile_id: String,
    pub results: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    pub profile_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// == Sync Action ==
/// A mutation waiting to reach the backend.
///
/// Serialized as `{"type": "<action>", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum SyncAction {
    CreateProfile(NewProfile),
    UpdateProfile(ProfileUpdate),
    CreateLesson(NewLesson),
    SaveQuizResult(QuizSubmission),
    CreateNotification(NewNotification),
}

impl SyncAction {
    pub fn name(&self) -> &'static str {
        match self {
            SyncAction::CreateProfile(_) => "create_profile",
            SyncAction::UpdateProfile(_) => "update_profile",
            SyncAction::CreateLesson(_) => "create_lesson",
            SyncAction::SaveQuizResult(_) => "save_quiz_result",
            SyncAction::CreateNotification(_) => "create_notification",
        }
    }

    /// Data sets made stale by a successful replay.
    pub fn invalidates(&self) -> &'static [DataType] {
        match self {
            SyncAction::CreateProfile(_) | SyncAction::UpdateProfile(_) => &[DataType::Profiles],
            SyncAction::CreateLesson(_) => &[DataType::Lessons],
            SyncAction::SaveQuizResult(_) => &[DataType::QuizResults, DataType::Lessons],
            SyncAction::CreateNotification(_) => &[DataType::Notifications],
        }
    }

    /// Checks the identifying fields every backend route needs.
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        let missing = match self {
            SyncAction::CreateProfile(profile) if profile.name.trim().is_empty() => "name",
            SyncAction::UpdateProfile(update) if update.id.trim().is_empty() => "id",
            SyncAction::CreateLesson(lesson) if lesson.profile_id.trim().is_empty() => "profileId",
            SyncAction::SaveQuizResult(result) if result.lesson_id.trim().is_empty() => "lessonId",
            SyncAction::SaveQuizResult(result) if result.profile_id.trim().is_empty() => {
                "profileId"
            }
            SyncAction::CreateNotification(notification)
                if notification.profile_id.trim().is_empty() =>
            {
                "profileId"
            }
            _ => return None,
        };
        Some(format!("{} requires a non-empty {}", self.name(), missing))
    }

    // == Dispatch ==
    /// Replays the mutation through the matching backend operation.
    pub async fn dispatch(&self, backend: &dyn SyncBackend) -> anyhow::Result<()> {
        match self {
            SyncAction::CreateProfile(profile) => backend.create_profile(profile).await,
            SyncAction::UpdateProfile(update) => backend.update_profile(update).await,
            SyncAction::CreateLesson(lesson) => backend.create_lesson(lesson).await,
            SyncAction::SaveQuizResult(result) => backend.save_quiz_result(result).await,
            SyncAction::CreateNotification(notification) => {
                backend.create_notification(notification).await
            }
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
