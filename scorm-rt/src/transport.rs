//! Runtime-state transport
//!
//! `GET`/`POST /api/scorm/lesson/{lessonId}/runtime` on the content server.

use async_trait::async_trait;
use reqwest::StatusCode;
use scorm_common::api::{runtime_path, RuntimeUpdateRequest, LEARNER_HEADER};
use scorm_common::CmiTree;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};

const USER_AGENT: &str = concat!("scorm-rt/", env!("CARGO_PKG_VERSION"));

/// Persistence backend of a session
#[async_trait]
pub trait RuntimeTransport: Send + Sync {
    /// Previously stored CMI state, `None` when the lesson has none
    async fn load(&self, lesson_id: &str) -> BridgeResult<Option<CmiTree>>;

    /// Send one batch of updates
    async fn commit(&self, lesson_id: &str, updates: &BTreeMap<String, String>) -> BridgeResult<()>;

    /// One-shot, best-effort delivery that must not block the caller
    ///
    /// Used when the page is going away; failures are only logged.
    fn beacon(&self, lesson_id: &str, updates: BTreeMap<String, String>);
}

/// reqwest-backed transport
#[derive(Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
    base_url: String,
    learner_id: Option<String>,
    beacon_timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &BridgeConfig) -> BridgeResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.base_url.clone(),
            learner_id: config.learner_id.clone(),
            beacon_timeout: config.beacon_timeout,
        })
    }

    fn runtime_url(&self, lesson_id: &str) -> String {
        format!("{}{}", self.base_url, runtime_path(lesson_id))
    }

    fn with_learner(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.learner_id {
            Some(learner) => request.header(LEARNER_HEADER, learner),
            None => request,
        }
    }
}

#[async_trait]
impl RuntimeTransport for HttpTransport {
    async fn load(&self, lesson_id: &str) -> BridgeResult<Option<CmiTree>> {
        let response = self
            .with_learner(self.http_client.get(self.runtime_url(lesson_id)))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(lesson_id = %lesson_id, "No stored runtime state");
            return Ok(None);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(BridgeError::Status(status.as_u16(), error_text));
        }

        let body = response.text().await?;
        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Ok(None);
        }

        let value: serde_json::Value =
            serde_json::from_str(trimmed).map_err(|e| BridgeError::Parse(e.to_string()))?;
        let tree = CmiTree::from_json(&value).map_err(|e| BridgeError::Parse(e.to_string()))?;

        Ok(if tree.is_empty() { None } else { Some(tree) })
    }

    async fn commit(&self, lesson_id: &str, updates: &BTreeMap<String, String>) -> BridgeResult<()> {
        let body = RuntimeUpdateRequest {
            updates: updates.clone(),
        };

        let response = self
            .with_learner(self.http_client.post(self.runtime_url(lesson_id)))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(BridgeError::Status(status.as_u16(), error_text));
        }

        debug!(lesson_id = %lesson_id, updates = updates.len(), "Runtime state committed");
        Ok(())
    }

    fn beacon(&self, lesson_id: &str, updates: BTreeMap<String, String>) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(lesson_id = %lesson_id, "No async runtime, beacon dropped");
            return;
        };

        // Plain-text body, the way browsers send beacons; the server parses
        // the bytes regardless of content type.
        let body = match serde_json::to_string(&RuntimeUpdateRequest { updates }) {
            Ok(body) => body,
            Err(e) => {
                warn!(lesson_id = %lesson_id, error = %e, "Beacon body not serializable");
                return;
            }
        };

        let request = self
            .with_learner(self.http_client.post(self.runtime_url(lesson_id)))
            .header(reqwest::header::CONTENT_TYPE, "text/plain;charset=UTF-8")
            .timeout(self.beacon_timeout)
            .body(body);
        let lesson_id = lesson_id.to_string();

        handle.spawn(async move {
            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(lesson_id = %lesson_id, "Beacon delivered");
                }
                Ok(response) => {
                    warn!(lesson_id = %lesson_id, status = response.status().as_u16(), "Beacon rejected");
                }
                Err(e) => {
                    warn!(lesson_id = %lesson_id, error = %e, "Beacon failed");
                }
            }
        });
    }
}
