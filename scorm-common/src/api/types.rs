//! Request/response bodies of the runtime and package endpoints

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Body of `POST /api/scorm/lesson/{lessonId}/runtime`
///
/// Used for debounced commits and for the unload-time beacon alike.
///
/// ```
/// use scorm_common::api::RuntimeUpdateRequest;
///
/// let body: RuntimeUpdateRequest =
///     serde_json::from_str(r#"{"updates":{"cmi.core.lesson_status":"completed"}}"#).unwrap();
/// assert_eq!(body.updates.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RuntimeUpdateRequest {
    /// Dot-path → latest value
    pub updates: BTreeMap<String, String>,
}

/// Body of `PUT /api/scorm/lesson/{lessonId}/package`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RegisterPackageRequest {
    /// Media id of the uploaded ZIP package
    pub media_id: String,
    /// Entry file inside the package (from the manifest)
    pub launch_url: String,
}

/// Error response shared by all handlers
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorBody {
    /// Machine-readable code, e.g. `NOT_FOUND`
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}
