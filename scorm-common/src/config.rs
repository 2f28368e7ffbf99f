//! Configuration loading and cache root resolution
//!
//! Resolution priority for every setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (the cache root has none: unset means disabled)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the extraction cache root
pub const CACHE_DIR_ENV: &str = "CACHE_DIR";

/// Default HTTP bind address for the content server
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5740";

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Extraction cache root; extraction is disabled when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// SQLite database holding runtime state and package registrations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// HTTP bind address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_addr: Option<String>,

    /// Base URL of the media store (`GET {base}/media/{id}`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_base_url: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub extraction: ExtractionConfig,
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `[extraction]` section: lock contention policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// First backoff delay when the extraction lock is held
    #[serde(default = "default_lock_retry_initial_ms")]
    pub lock_retry_initial_ms: u64,

    /// Backoff ceiling per wait
    #[serde(default = "default_lock_retry_max_ms")]
    pub lock_retry_max_ms: u64,

    /// Total time a request waits for another extraction before giving up
    #[serde(default = "default_lock_max_wait_ms")]
    pub lock_max_wait_ms: u64,

    /// Lock files older than this are considered abandoned
    #[serde(default = "default_stale_lock_secs")]
    pub stale_lock_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            lock_retry_initial_ms: default_lock_retry_initial_ms(),
            lock_retry_max_ms: default_lock_retry_max_ms(),
            lock_max_wait_ms: default_lock_max_wait_ms(),
            stale_lock_secs: default_stale_lock_secs(),
        }
    }
}

fn default_lock_retry_initial_ms() -> u64 {
    100
}

fn default_lock_retry_max_ms() -> u64 {
    2_000
}

fn default_lock_max_wait_ms() -> u64 {
    60_000
}

fn default_stale_lock_secs() -> u64 {
    600
}

/// Default config file location (`~/.config/courselit/scorm-cs.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("courselit").join("scorm-cs.toml"))
}

/// Default database location when none is configured
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("courselit").join("scorm.db"))
        .unwrap_or_else(|| PathBuf::from("./courselit_data/scorm.db"))
}

/// Load TOML config from `path`
///
/// A missing file is not an error: defaults are returned and a warning is
/// logged. A file that exists but does not parse is a configuration error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!("Config file not found at {}, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Write TOML config atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, path)?;

    Ok(())
}

/// Resolve the extraction cache root
///
/// Returns `None` when no tier provides a value, which disables extraction.
pub fn resolve_cache_dir(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CACHE_DIR_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    toml_config.cache_dir.clone()
}

/// Require a configured cache root
pub fn require_cache_dir(cache_dir: Option<PathBuf>) -> Result<PathBuf> {
    cache_dir.ok_or_else(|| {
        Error::Config(format!(
            "{} not configured; SCORM extraction is disabled",
            CACHE_DIR_ENV
        ))
    })
}
