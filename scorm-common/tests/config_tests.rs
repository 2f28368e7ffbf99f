//! Configuration loading and cache root resolution
//!
//! Note: uses serial_test to prevent ENV variable races. Tests that touch
//! CACHE_DIR are marked #[serial].

use scorm_common::config::{
    load_toml_config, require_cache_dir, resolve_cache_dir, write_toml_config, ExtractionConfig,
    TomlConfig, CACHE_DIR_ENV,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_missing_config_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config = load_toml_config(&temp_dir.path().join("absent.toml")).unwrap();

    assert_eq!(config, TomlConfig::default());
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.extraction, ExtractionConfig::default());
}

#[test]
fn test_partial_config_fills_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("scorm-cs.toml");
    std::fs::write(
        &path,
        r#"
cache_dir = "/srv/scorm-cache"

[extraction]
lock_max_wait_ms = 5000
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.cache_dir, Some(PathBuf::from("/srv/scorm-cache")));
    assert_eq!(config.extraction.lock_max_wait_ms, 5000);
    assert_eq!(config.extraction.lock_retry_initial_ms, 100);
    assert_eq!(config.bind_addr, None);
}

#[test]
fn test_invalid_toml_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "cache_dir = [unterminated").unwrap();

    let err = load_toml_config(&path).unwrap_err();
    assert!(matches!(err, scorm_common::Error::Config(_)));
}

#[test]
fn test_write_then_load_preserves_values() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("scorm-cs.toml");

    let config = TomlConfig {
        cache_dir: Some(PathBuf::from("/var/cache/scorm")),
        media_base_url: Some("http://media.local".to_string()),
        ..TomlConfig::default()
    };
    write_toml_config(&config, &path).unwrap();

    assert!(!path.with_extension("toml.tmp").exists());
    assert_eq!(load_toml_config(&path).unwrap(), config);
}

#[test]
#[serial]
fn test_cli_arg_beats_env_and_toml() {
    env::set_var(CACHE_DIR_ENV, "/from/env");
    let toml = TomlConfig {
        cache_dir: Some(PathBuf::from("/from/toml")),
        ..TomlConfig::default()
    };

    let resolved = resolve_cache_dir(Some(Path::new("/from/cli")), &toml);
    env::remove_var(CACHE_DIR_ENV);

    assert_eq!(resolved, Some(PathBuf::from("/from/cli")));
}

#[test]
#[serial]
fn test_env_beats_toml() {
    env::set_var(CACHE_DIR_ENV, "/from/env");
    let toml = TomlConfig {
        cache_dir: Some(PathBuf::from("/from/toml")),
        ..TomlConfig::default()
    };

    let resolved = resolve_cache_dir(None, &toml);
    env::remove_var(CACHE_DIR_ENV);

    assert_eq!(resolved, Some(PathBuf::from("/from/env")));
}

#[test]
#[serial]
fn test_unconfigured_cache_dir_disables_extraction() {
    env::remove_var(CACHE_DIR_ENV);

    let resolved = resolve_cache_dir(None, &TomlConfig::default());
    assert_eq!(resolved, None);

    let err = require_cache_dir(resolved).unwrap_err();
    assert!(err.to_string().contains("CACHE_DIR not configured"));
}
