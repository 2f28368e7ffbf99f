//! Server configuration: CLI over ENV over TOML

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use scorm_common::config::{
    default_config_path, default_database_path, load_toml_config, resolve_cache_dir, TomlConfig,
    DEFAULT_BIND_ADDR,
};

use crate::cache::LockPolicy;

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "scorm-cs", version, about = "SCORM package content server")]
pub struct Cli {
    /// Config file (defaults to the per-user config location)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Extraction cache root; overrides CACHE_DIR and the config file
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Listen address
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// SQLite database file
    #[arg(long)]
    pub database: Option<PathBuf>,
}

/// Effective server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    /// `None` disables extraction
    pub cache_dir: Option<PathBuf>,
    pub media_base_url: Option<String>,
    pub log_level: String,
    pub lock_policy: LockPolicy,
}

impl ServerConfig {
    /// Load the config file named by `cli` (or the default) and layer the
    /// CLI on top
    pub fn load(cli: &Cli) -> scorm_common::Result<Self> {
        let toml_config = match cli.config.clone().or_else(default_config_path) {
            Some(path) => load_toml_config(&path)?,
            None => TomlConfig::default(),
        };
        Self::resolve(cli, &toml_config)
    }

    pub fn resolve(cli: &Cli, toml_config: &TomlConfig) -> scorm_common::Result<Self> {
        let bind_addr = match cli.bind {
            Some(addr) => addr,
            None => {
                let raw = toml_config.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
                raw.parse().map_err(|e| {
                    scorm_common::Error::Config(format!("Invalid bind address {}: {}", raw, e))
                })?
            }
        };

        let database_path = cli
            .database
            .clone()
            .or_else(|| toml_config.database_path.clone())
            .unwrap_or_else(default_database_path);

        Ok(Self {
            bind_addr,
            database_path,
            cache_dir: resolve_cache_dir(cli.cache_dir.as_deref(), toml_config),
            media_base_url: toml_config.media_base_url.clone(),
            log_level: toml_config.logging.level.clone(),
            lock_policy: LockPolicy::from(&toml_config.extraction),
        })
    }
}
