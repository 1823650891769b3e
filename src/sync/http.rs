//! HTTP Sync Backend
//!
//! Replays queued mutations against the portal's REST API.

use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::Serialize;
use tracing::debug;

use crate::sync::{
    NewLesson, NewNotification, NewProfile, ProfileUpdate, QuizSubmission, SyncBackend,
};

/// Per-request timeout. The queue itself never times out a replay.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Backend that sends each mutation as a JSON request.
/// Clone is cheap - reqwest::Client pools connections behind an Arc.
#[derive(Debug, Clone)]
pub struct HttpSyncBackend {
    client: Client,
    base_url: String,
}

impl HttpSyncBackend {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> anyhow::Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid API base URL {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("API base URL {} cannot carry a path", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> anyhow::Result<()> {
        let url = self.endpoint(segments)?;
        debug!("{} {}", method, url);

        let response = self
            .client
            .request(method.clone(), url.clone())
            .json(body)
            .send()
            .await
            .with_context(|| format!("{} {} failed", method, url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("{} {} returned {}: {}", method, url, status, body);
        }
        Ok(())
    }
}

#[async_trait]
impl SyncBackend for HttpSyncBackend {
    async fn create_profile(&self, profile: &NewProfile) -> anyhow::Result<()> {
        self.send(Method::POST, &["profiles"], profile).await
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> anyhow::Result<()> {
        self.send(Method::PUT, &["profiles", update.id.as_str()], &update.fields)
            .await
    }

    async fn create_lesson(&self, lesson: &NewLesson) -> anyhow::Result<()> {
        self.send(Method::POST, &["lessons"], lesson).await
    }

    async fn save_quiz_result(&self, result: &QuizSubmission) -> anyhow::Result<()> {
        self.send(Method::POST, &["quiz-results"], result).await
    }

    async fn create_notification(&self, notification: &NewNotification) -> anyhow::Result<()> {
        self.send(Method::POST, &["notifications"], notification).await
    }
}
