//! Serving extracted package files

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use scorm_common::api::content_path;
use scorm_common::mime::content_type_for;

use crate::cache::CacheError;
use crate::db::lessons::{self, LessonPackage};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

async fn lesson_package(state: &AppState, lesson_id: &str) -> ApiResult<LessonPackage> {
    lessons::get_package(&state.db, lesson_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No SCORM package for lesson {}", lesson_id)))
}

/// GET /api/scorm/lesson/:lesson_id/launch
///
/// 307 to the content URL of the package's launch file.
pub async fn launch(
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
) -> ApiResult<Response> {
    let package = lesson_package(&state, &lesson_id).await?;

    let location = content_path(&lesson_id, &package.launch_url);
    let location = HeaderValue::try_from(location).map_err(|e| {
        ApiError::Internal(format!(
            "Launch url {:?} of lesson {} is not a valid location: {}",
            package.launch_url, lesson_id, e
        ))
    })?;

    Ok((StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, location)]).into_response())
}

/// GET /api/scorm/lesson/:lesson_id/content/*file_path
pub async fn get_content(
    State(state): State<AppState>,
    Path((lesson_id, file_path)): Path<(String, String)>,
) -> ApiResult<Response> {
    let cache = state
        .cache
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("SCORM extraction is disabled".to_string()))?;

    let package = lesson_package(&state, &lesson_id).await?;
    let file_path = file_path.trim_start_matches('/');

    match cache
        .get_extracted_file(&package.media_id, file_path, state.media.as_ref())
        .await
    {
        Ok(Some(bytes)) => {
            Ok(([(header::CONTENT_TYPE, content_type_for(file_path))], bytes).into_response())
        }
        Ok(None) => Err(ApiError::NotFound(format!(
            "{} not available in lesson {}",
            file_path, lesson_id
        ))),
        Err(CacheError::LockTimeout { media_id, waited }) => Err(ApiError::Busy {
            message: format!("Package {} is still being extracted", media_id),
            retry_after_secs: waited.as_secs().clamp(1, 30),
        }),
        Err(e) => Err(ApiError::Internal(e.to_string())),
    }
}
