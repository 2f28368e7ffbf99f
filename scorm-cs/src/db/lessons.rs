//! Lesson → SCORM package registration

use serde::Serialize;
use sqlx::SqlitePool;

/// Package backing a lesson
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonPackage {
    pub lesson_id: String,
    pub media_id: String,
    /// Launch file relative to the package root
    pub launch_url: String,
    pub updated_at: String,
}

/// Insert or replace the package for `lesson_id`
pub async fn register_package(
    pool: &SqlitePool,
    lesson_id: &str,
    media_id: &str,
    launch_url: &str,
) -> Result<LessonPackage, sqlx::Error> {
    let updated_at = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO scorm_lessons (lesson_id, media_id, launch_url, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(lesson_id) DO UPDATE SET
            media_id = excluded.media_id,
            launch_url = excluded.launch_url,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(lesson_id)
    .bind(media_id)
    .bind(launch_url)
    .bind(&updated_at)
    .execute(pool)
    .await?;

    tracing::info!(lesson_id = %lesson_id, media_id = %media_id, "SCORM package registered");

    Ok(LessonPackage {
        lesson_id: lesson_id.to_string(),
        media_id: media_id.to_string(),
        launch_url: launch_url.to_string(),
        updated_at,
    })
}

pub async fn get_package(
    pool: &SqlitePool,
    lesson_id: &str,
) -> Result<Option<LessonPackage>, sqlx::Error> {
    let row: Option<(String, String, String)> = sqlx::query_as(
        "SELECT media_id, launch_url, updated_at FROM scorm_lessons WHERE lesson_id = ?",
    )
    .bind(lesson_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(media_id, launch_url, updated_at)| LessonPackage {
        lesson_id: lesson_id.to_string(),
        media_id,
        launch_url,
        updated_at,
    }))
}
