//! Bridge configuration

use std::time::Duration;

/// Quiet period before pending updates are committed
pub const DEFAULT_COMMIT_DEBOUNCE_MS: u64 = 500;

/// Bridge settings supplied by the embedding host
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Base URL of the content server, e.g. `http://127.0.0.1:5740`
    pub base_url: String,
    /// Learner identity forwarded in the `x-learner-id` header
    pub learner_id: Option<String>,
    /// Debounce window for commits
    pub commit_debounce: Duration,
    /// Timeout for load and commit requests
    pub request_timeout: Duration,
    /// Timeout for the unload-time beacon
    pub beacon_timeout: Duration,
}

impl BridgeConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            learner_id: None,
            commit_debounce: Duration::from_millis(DEFAULT_COMMIT_DEBOUNCE_MS),
            request_timeout: Duration::from_secs(30),
            beacon_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_learner(mut self, learner_id: impl Into<String>) -> Self {
        self.learner_id = Some(learner_id.into());
        self
    }

    pub fn with_commit_debounce(mut self, debounce: Duration) -> Self {
        self.commit_debounce = debounce;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::new("http://localhost:5740/");
        assert_eq!(config.base_url, "http://localhost:5740");
        assert_eq!(config.commit_debounce, Duration::from_millis(500));
        assert!(config.learner_id.is_none());
    }

    #[test]
    fn test_builders() {
        let config = BridgeConfig::new("http://x")
            .with_learner("learner-7")
            .with_commit_debounce(Duration::from_millis(20));
        assert_eq!(config.learner_id.as_deref(), Some("learner-7"));
        assert_eq!(config.commit_debounce, Duration::from_millis(20));
    }
}
