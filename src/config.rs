//! Configuration System
//!
//! Hierarchical configuration with environment variable overrides: built-in
//! defaults, then the global config file, then `CANOPY_*` variables. The
//! "currently known local repository path" is explicit configuration state
//! (persisted by [`RepoPathCache`]), never implicit process-wide state.

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

mod repo_cache;
mod sources;

pub use repo_cache::RepoPathCache;
pub use sources::ConfigLoader;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanopyConfig {
    /// The remote repository this client mirrors.
    #[serde(default)]
    pub repository: RepoConfig,

    /// Local checkout the host is analyzing, when already known.
    pub local_repo_path: Option<PathBuf>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for CanopyConfig {
    fn default() -> Self {
        Self {
            repository: RepoConfig::default(),
            local_repo_path: None,
            logging: LoggingConfig::default(),
        }
    }
}

/// One remote repository and the policies applied to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Repository owner (user or organization).
    #[serde(default)]
    pub owner: String,

    /// Repository name.
    #[serde(default)]
    pub name: String,

    /// Name this client signs commit messages and statuses with.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// REST API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Branch targeted when the caller does not name one.
    #[serde(default = "default_branch")]
    pub default_branch: String,

    /// Branch binary content is routed to on upload.
    #[serde(default = "default_image_branch")]
    pub image_branch: String,

    /// Route image uploads to `image_branch` instead of the target branch.
    #[serde(default = "default_true")]
    pub route_images_to_image_branch: bool,

    /// Allow the client to create missing branches before uploading.
    #[serde(default)]
    pub allow_branch_creation: bool,
}

fn default_app_name() -> String {
    "canopy".to_string()
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_branch() -> String {
    "develop".to_string()
}

fn default_image_branch() -> String {
    "figures".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            name: String::new(),
            app_name: default_app_name(),
            api_base: default_api_base(),
            default_branch: default_branch(),
            image_branch: default_image_branch(),
            route_images_to_image_branch: default_true(),
            allow_branch_creation: false,
        }
    }
}

impl RepoConfig {
    /// Validate the repository configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.owner.is_empty() {
            return Err("repository owner cannot be empty".to_string());
        }
        if self.name.is_empty() {
            return Err("repository name cannot be empty".to_string());
        }
        if !crate::remote::url_is_valid(&self.api_base) {
            return Err(format!("api_base is not a valid http(s) url: {}", self.api_base));
        }
        if self.default_branch.is_empty() {
            return Err("default branch cannot be empty".to_string());
        }
        Ok(())
    }
}

impl CanopyConfig {
    /// Validate the entire configuration.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Err(e) = self.repository.validate() {
            errors.push(format!("repository: {}", e));
        }
        if let Some(path) = &self.local_repo_path {
            if !path.is_dir() {
                errors.push(format!(
                    "local_repo_path is not a directory: {}",
                    path.display()
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
