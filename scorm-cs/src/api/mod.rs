//! HTTP API handlers for scorm-cs

pub mod content;
pub mod health;
pub mod package;
pub mod runtime;

pub use content::{get_content, launch};
pub use health::health_routes;
pub use package::{get_package, put_package};
pub use runtime::{get_runtime, post_runtime};

use axum::http::HeaderMap;
use scorm_common::api::{ANONYMOUS_LEARNER, LEARNER_HEADER};

/// Learner identity from the authenticating proxy's header
pub(crate) fn learner_id(headers: &HeaderMap) -> String {
    headers
        .get(LEARNER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(ANONYMOUS_LEARNER)
        .to_string()
}
