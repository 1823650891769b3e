//! Domain records cached by the offline layer
//!
//! Only the fields this layer reads are typed; everything else the portal
//! sends rides along in `extra` untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A learner profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade_level: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Profile {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar: None,
            grade_level: None,
            extra: Map::new(),
        }
    }
}

/// A generated lesson belonging to a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub profile_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Lesson {
    pub fn new(
        id: impl Into<String>,
        profile_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            profile_id: profile_id.into(),
            title: title.into(),
            subject: None,
            created_at: None,
            extra: Map::new(),
        }
    }
}

/// A notification shown to a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub profile_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A scored quiz attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub id: String,
    pub lesson_id: String,
    pub profile_id: String,
    pub score: u32,
    pub total: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_keeps_unknown_fields() {
        let raw = json!({
            "id": "p1",
            "name": "Ada",
            "gradeLevel": "3",
            "favoriteColor": "teal"
        });

        let profile: Profile = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(profile.grade_level.as_deref(), Some("3"));
        assert_eq!(profile.extra["favoriteColor"], "teal");
        assert_eq!(serde_json::to_value(&profile).unwrap(), raw);
    }

    #[test]
    fn test_notification_type_field() {
        let raw = json!({
            "id": "n1",
            "profileId": "p1",
            "type": "achievement",
            "title": "Well done",
            "message": "Quiz passed"
        });

        let notification: Notification = serde_json::from_value(raw).unwrap();
        assert_eq!(notification.kind, "achievement");
        assert!(!notification.read);
    }
}
