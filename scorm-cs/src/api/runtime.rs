//! Runtime-state endpoints
//!
//! The POST body is parsed from raw bytes whatever its content type: unload
//! beacons arrive as `text/plain`.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use scorm_common::api::RuntimeUpdateRequest;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/scorm/lesson/:lesson_id/runtime
pub async fn get_runtime(
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let learner_id = super::learner_id(&headers);

    let tree = state
        .runtime
        .load_runtime(&learner_id, &lesson_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No runtime state for lesson {}", lesson_id)))?;

    Ok(Json(tree.to_json()))
}

/// POST /api/scorm/lesson/:lesson_id/runtime
pub async fn post_runtime(
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<StatusCode> {
    let learner_id = super::learner_id(&headers);

    let request: RuntimeUpdateRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!(lesson_id = %lesson_id, error = %e, "Malformed runtime update");
        ApiError::BadRequest(format!("Malformed runtime update: {}", e))
    })?;

    if request.updates.is_empty() {
        debug!(lesson_id = %lesson_id, "Empty runtime update");
        return Ok(StatusCode::NO_CONTENT);
    }

    state
        .runtime
        .merge_runtime(&learner_id, &lesson_id, &request.updates)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
