//! scorm-cs - SCORM content server
//!
//! Extracts uploaded SCORM packages on first request, serves their files and
//! stores per-learner runtime state.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use scorm_cs::cache::ExtractionCache;
use scorm_cs::config::{Cli, ServerConfig};
use scorm_cs::media::{HttpMediaStore, MediaStore, UnconfiguredMediaStore};
use scorm_cs::{build_router, db, AppState};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config is read before tracing so its log level can seed the filter
    let config = ServerConfig::load(&cli)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        "Starting SCORM content server (scorm-cs) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    info!("Database path: {}", config.database_path.display());
    let pool = match db::init_database_pool(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e);
        }
    };

    let cache = match ExtractionCache::new(config.cache_dir.clone(), config.lock_policy) {
        Ok(cache) => Some(Arc::new(cache)),
        Err(e) => {
            warn!("{}", e);
            None
        }
    };

    let media: Arc<dyn MediaStore> = match &config.media_base_url {
        Some(url) => {
            info!("Media store: {}", url);
            Arc::new(HttpMediaStore::new(url)?)
        }
        None => {
            warn!("media_base_url not configured; only already-extracted packages can be served");
            Arc::new(UnconfiguredMediaStore)
        }
    };

    let app = build_router(AppState::new(pool, cache, media));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("scorm-cs listening on http://{}", config.bind_addr);
    info!("Health check: http://{}/health", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
