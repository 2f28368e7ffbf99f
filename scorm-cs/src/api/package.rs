//! Lesson package registration

use axum::{
    extract::{Path, State},
    Json,
};
use scorm_common::api::RegisterPackageRequest;
use scorm_common::paths::{is_valid_media_id, sanitize_relative_path};

use crate::db::lessons::{self, LessonPackage};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// PUT /api/scorm/lesson/:lesson_id/package
pub async fn put_package(
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
    Json(request): Json<RegisterPackageRequest>,
) -> ApiResult<Json<LessonPackage>> {
    if !is_valid_media_id(&request.media_id) {
        return Err(ApiError::BadRequest(format!(
            "Invalid media id: {}",
            request.media_id
        )));
    }
    sanitize_relative_path(&request.launch_url).map_err(|e| {
        ApiError::BadRequest(format!("Invalid launch url {}: {}", request.launch_url, e))
    })?;

    let package =
        lessons::register_package(&state.db, &lesson_id, &request.media_id, &request.launch_url)
            .await?;

    Ok(Json(package))
}

/// GET /api/scorm/lesson/:lesson_id/package
pub async fn get_package(
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
) -> ApiResult<Json<LessonPackage>> {
    lessons::get_package(&state.db, &lesson_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No SCORM package for lesson {}", lesson_id)))
}
