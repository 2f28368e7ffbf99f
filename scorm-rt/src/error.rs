//! Error types for the session bridge
//!
//! None of these ever reach the SCO: the API adapters turn failures into
//! SCORM sentinel strings. They surface to the embedding host and the logs.

use thiserror::Error;

/// Bridge error type
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Request could not be sent or the response could not be read
    #[error("Network error: {0}")]
    Network(String),

    /// Runtime endpoint answered with a non-success status
    #[error("Runtime endpoint returned {0}: {1}")]
    Status(u16, String),

    /// Response body was not a CMI document
    #[error("Parse error: {0}")]
    Parse(String),

    /// The named API surface is not mounted
    #[error("SCORM API '{0}' is not available")]
    ApiUnavailable(String),

    /// Method name not part of the surface
    #[error("Unknown SCORM method '{0}'")]
    UnknownMethod(String),
}

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        BridgeError::Network(err.to_string())
    }
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
