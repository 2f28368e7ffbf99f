//! scorm-cs library - SCORM content server
//!
//! Serves files out of extracted SCORM packages and persists the runtime
//! state the session bridge commits.

use std::sync::Arc;

use axum::Router;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod media;

use cache::ExtractionCache;
use db::runtime::RuntimeStore;
use media::MediaStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub runtime: RuntimeStore,
    /// `None` when no cache root is configured
    pub cache: Option<Arc<ExtractionCache>>,
    pub media: Arc<dyn MediaStore>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        cache: Option<Arc<ExtractionCache>>,
        media: Arc<dyn MediaStore>,
    ) -> Self {
        Self {
            runtime: RuntimeStore::new(db.clone()),
            db,
            cache,
            media,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let lessons = Router::new()
        .route(
            "/api/scorm/lesson/:lesson_id/runtime",
            get(api::get_runtime).post(api::post_runtime),
        )
        .route(
            "/api/scorm/lesson/:lesson_id/package",
            get(api::get_package).put(api::put_package),
        )
        .route("/api/scorm/lesson/:lesson_id/launch", get(api::launch))
        .route(
            "/api/scorm/lesson/:lesson_id/content/*file_path",
            get(api::get_content),
        );

    Router::new()
        .merge(lessons)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
