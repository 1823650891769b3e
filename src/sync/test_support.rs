//! Scripted backend shared by queue and offline tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use serde_json::Map;

use crate::sync::{
    NewLesson, NewNotification, NewProfile, ProfileUpdate, QuizSubmission, SyncAction,
    SyncBackend,
};

/// Records every call by action name; fails or stalls on demand.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    calls: Mutex<Vec<String>>,
    failing: AtomicBool,
    delay_ms: AtomicU64,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let backend = Self::new();
        backend.set_failing(true);
        backend
    }

    pub fn with_delay(delay: Duration) -> Self {
        let backend = Self::new();
        backend.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
        backend
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    async fn record(&self, name: &str) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(name.to_string());

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            bail!("{} rejected by scripted backend", name);
        }
        Ok(())
    }
}

#[async_trait]
impl SyncBackend for ScriptedBackend {
    async fn create_profile(&self, _profile: &NewProfile) -> anyhow::Result<()> {
        self.record("create_profile").await
    }

    async fn update_profile(&self, _update: &ProfileUpdate) -> anyhow::Result<()> {
        self.record("update_profile").await
    }

    async fn create_lesson(&self, _lesson: &NewLesson) -> anyhow::Result<()> {
        self.record("create_lesson").await
    }

    async fn save_quiz_result(&self, _result: &QuizSubmission) -> anyhow::Result<()> {
        self.record("save_quiz_result").await
    }

    async fn create_notification(&self, _notification: &NewNotification) -> anyhow::Result<()> {
        self.record("create_notification").await
    }
}

pub fn profile_action(name: &str) -> SyncAction {
    SyncAction::CreateProfile(NewProfile {
        name: name.to_string(),
        avatar: None,
        grade_level: None,
        extra: Map::new(),
    })
}

pub fn lesson_action(title: &str) -> SyncAction {
    let mut lesson_data = Map::new();
    lesson_data.insert("title".to_string(), title.into());
    SyncAction::CreateLesson(NewLesson {
        lesson_data,
        profile_id: "p1".to_string(),
        files: Vec::new(),
    })
}
