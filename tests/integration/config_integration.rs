//! Integration tests for configuration loading and the repo-path cache

use anyhow::Result;
use canopy::config::{CanopyConfig, ConfigLoader, RepoPathCache};
use std::sync::Mutex;
use tempfile::TempDir;

// Serialize environment mutation across tests in this binary.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

#[test]
fn full_config_file_round_trips() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_file = temp_dir.path().join("config.toml");

    std::fs::write(
        &config_file,
        r#"
[repository]
owner = "acme"
name = "widgets"
app_name = "release-bot"
default_branch = "main"
image_branch = "media"
route_images_to_image_branch = false

[logging]
level = "debug"
format = "json"
"#,
    )?;

    let config = ConfigLoader::load_from_file(&config_file)?;
    assert_eq!(config.repository.owner, "acme");
    assert_eq!(config.repository.app_name, "release-bot");
    assert_eq!(config.repository.image_branch, "media");
    assert!(!config.repository.route_images_to_image_branch);
    assert_eq!(config.logging.format, "json");
    assert!(config.validate().is_ok());
    Ok(())
}

#[test]
fn environment_variables_override_defaults() -> Result<()> {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp_dir = TempDir::new()?;

    // Point the global config at an empty directory so only env applies.
    let original_xdg = std::env::var("XDG_CONFIG_HOME").ok();
    std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
    std::env::set_var("CANOPY_REPOSITORY__OWNER", "env-owner");
    std::env::set_var("CANOPY_REPOSITORY__NAME", "env-repo");

    let result = ConfigLoader::load();

    std::env::remove_var("CANOPY_REPOSITORY__OWNER");
    std::env::remove_var("CANOPY_REPOSITORY__NAME");
    match original_xdg {
        Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
        None => std::env::remove_var("XDG_CONFIG_HOME"),
    }

    let config = result?;
    assert_eq!(config.repository.owner, "env-owner");
    assert_eq!(config.repository.name, "env-repo");
    // Everything else keeps its default.
    assert_eq!(config.repository.default_branch, "develop");
    Ok(())
}

#[test]
fn missing_global_config_falls_back_to_defaults() -> Result<()> {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp_dir = TempDir::new()?;

    let original_xdg = std::env::var("XDG_CONFIG_HOME").ok();
    std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());

    let result = ConfigLoader::load();

    match original_xdg {
        Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
        None => std::env::remove_var("XDG_CONFIG_HOME"),
    }

    let config = result?;
    let defaults = CanopyConfig::default();
    assert_eq!(config.repository.api_base, defaults.repository.api_base);
    assert_eq!(config.logging.level, defaults.logging.level);
    Ok(())
}

#[test]
fn repo_path_cache_survives_reload() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let checkout = temp_dir.path().join("checkout");
    std::fs::create_dir(&checkout)?;
    let cache_file = temp_dir.path().join("canopy").join("repo_path.toml");

    {
        let cache = RepoPathCache::at(cache_file.clone());
        cache.store(&checkout)?;
    }

    // A fresh handle reads the same state back.
    let cache = RepoPathCache::at(cache_file);
    assert_eq!(cache.load()?.unwrap(), checkout);
    Ok(())
}
