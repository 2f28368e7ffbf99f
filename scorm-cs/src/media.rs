//! Media store client
//!
//! Resolves a media id to a downloadable URL and fetches the ZIP package
//! behind it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("scorm-cs/", env!("CARGO_PKG_VERSION"));

/// Media store errors
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Media store returned {0}: {1}")]
    Status(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Media store not configured")]
    NotConfigured,
}

/// Media record as returned by the store
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MediaRecord {
    /// Download URL of the stored file
    pub file: String,
}

/// Backing store of uploaded SCORM packages
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Look up a media record; `None` when the id is unknown
    async fn get(&self, media_id: &str) -> Result<Option<MediaRecord>, MediaError>;

    /// Fetch the bytes behind a record's URL
    async fn download(&self, url: &str) -> Result<Vec<u8>, MediaError>;
}

/// reqwest-backed media store (`GET {base}/media/{id}`)
pub struct HttpMediaStore {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpMediaStore {
    pub fn new(base_url: &str) -> Result<Self, MediaError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| MediaError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn record_url(&self, media_id: &str) -> String {
        format!("{}/media/{}", self.base_url, media_id)
    }
}

#[async_trait]
impl MediaStore for HttpMediaStore {
    async fn get(&self, media_id: &str) -> Result<Option<MediaRecord>, MediaError> {
        let response = self
            .http_client
            .get(self.record_url(media_id))
            .send()
            .await
            .map_err(|e| MediaError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(MediaError::Status(status.as_u16(), error_text));
        }

        let record: MediaRecord = response
            .json()
            .await
            .map_err(|e| MediaError::Parse(e.to_string()))?;

        tracing::debug!(media_id = %media_id, "Media record resolved");
        Ok(Some(record))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, MediaError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| MediaError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::Status(status.as_u16(), url.to_string()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| MediaError::Network(e.to_string()))?;

        tracing::debug!(bytes = bytes.len(), "Package downloaded");
        Ok(bytes.to_vec())
    }
}

/// Stand-in when no media store URL is configured
///
/// Already-extracted packages are still served; new ones cannot be fetched.
pub struct UnconfiguredMediaStore;

#[async_trait]
impl MediaStore for UnconfiguredMediaStore {
    async fn get(&self, _media_id: &str) -> Result<Option<MediaRecord>, MediaError> {
        Err(MediaError::NotConfigured)
    }

    async fn download(&self, _url: &str) -> Result<Vec<u8>, MediaError> {
        Err(MediaError::NotConfigured)
    }
}
