//! Schema-tagged payloads for critical data
//!
//! Each cacheable data set is bound to its `DataType` at compile time, and
//! the serialized form carries the tag so a mismatched shape is caught on
//! read instead of silently decoding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{Lesson, Notification, Profile, QuizResult};
use crate::storage::CACHE_RECORD_PREFIX;

// == Data Type ==
/// Kinds of critical data the portal keeps available offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Profiles,
    Lessons,
    Notifications,
    QuizResults,
}

impl DataType {
    pub const ALL: [DataType; 4] = [
        DataType::Profiles,
        DataType::Lessons,
        DataType::Notifications,
        DataType::QuizResults,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Profiles => "profiles",
            DataType::Lessons => "lessons",
            DataType::Notifications => "notifications",
            DataType::QuizResults => "quiz_results",
        }
    }

    /// Tag attached to every cache entry of this type.
    pub fn tag(&self) -> &'static str {
        self.as_str()
    }

    /// Cache key of the data itself.
    pub fn cache_key(&self) -> &'static str {
        self.as_str()
    }

    /// Cache key of the last synchronization timestamp.
    pub fn last_sync_key(&self) -> String {
        format!("{}_last_sync", self.as_str())
    }

    /// Durable storage key of the persistent copy.
    pub fn record_key(&self) -> String {
        format!("{}{}", CACHE_RECORD_PREFIX, self.as_str())
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::ALL
            .into_iter()
            .find(|data_type| data_type.as_str() == s)
            .ok_or_else(|| format!("Unknown data type: {}", s))
    }
}

// == Critical Data ==
/// A cached data set, tagged with its type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "data_type", content = "data", rename_all = "snake_case")]
pub enum CriticalData {
    Profiles(Vec<Profile>),
    Lessons(Vec<Lesson>),
    Notifications(Vec<Notification>),
    QuizResults(Vec<QuizResult>),
}

impl CriticalData {
    pub fn data_type(&self) -> DataType {
        match self {
            CriticalData::Profiles(_) => DataType::Profiles,
            CriticalData::Lessons(_) => DataType::Lessons,
            CriticalData::Notifications(_) => DataType::Notifications,
            CriticalData::QuizResults(_) => DataType::QuizResults,
        }
    }

    /// Number of records in the set.
    pub fn len(&self) -> usize {
        match self {
            CriticalData::Profiles(items) => items.len(),
            CriticalData::Lessons(items) => items.len(),
            CriticalData::Notifications(items) => items.len(),
            CriticalData::QuizResults(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// == Critical Record ==
/// Rust type that can be cached as one `DataType`.
pub trait CriticalRecord: Clone + Send + Sync + 'static {
    const DATA_TYPE: DataType;

    fn into_critical(self) -> CriticalData;

    /// Unwraps the matching variant, `None` for any other type.
    fn from_critical(data: CriticalData) -> Option<Self>;
}

macro_rules! critical_record {
    ($record:ty, $variant:ident) => {
        impl CriticalRecord for Vec<$record> {
            const DATA_TYPE: DataType = DataType::$variant;

            fn into_critical(self) -> CriticalData {
                CriticalData::$variant(self)
            }

            fn from_critical(data: CriticalData) -> Option<Self> {
                match data {
                    CriticalData::$variant(items) => Some(items),
                    _ => None,
                }
            }
        }
    };
}

critical_record!(Profile, Profiles);
critical_record!(Lesson, Lessons);
critical_record!(Notification, Notifications);
critical_record!(QuizResult, QuizResults);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_type_keys() {
        assert_eq!(DataType::QuizResults.cache_key(), "quiz_results");
        assert_eq!(DataType::Lessons.last_sync_key(), "lessons_last_sync");
        assert_eq!(DataType::Profiles.record_key(), "offline_cache:profiles");
    }

    #[test]
    fn test_data_type_from_str() {
        assert_eq!("notifications".parse::<DataType>(), Ok(DataType::Notifications));
        assert!("users".parse::<DataType>().is_err());
    }

    #[test]
    fn test_critical_data_is_tagged() {
        let data = vec![Profile::new("p1", "Ada")].into_critical();
        let json = serde_json::to_value(&data).unwrap();

        assert_eq!(json["data_type"], "profiles");
        assert_eq!(json["data"][0]["name"], "Ada");
    }

    #[test]
    fn test_from_critical_rejects_other_variant() {
        let lessons = CriticalData::Lessons(vec![Lesson::new("l1", "p1", "Fractions")]);

        assert!(<Vec<Profile>>::from_critical(lessons.clone()).is_none());
        assert_eq!(<Vec<Lesson>>::from_critical(lessons).map(|l| l.len()), Some(1));
    }

    #[test]
    fn test_mismatched_tag_fails_to_decode() {
        let raw = json!({"data_type": "lessons", "data": [{"id": "p1", "name": "Ada"}]});
        assert!(serde_json::from_value::<CriticalData>(raw).is_err());
    }
}
