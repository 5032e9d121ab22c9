//! Persisted "currently known local repository path".
//!
//! A small toml document under the XDG config directory remembers which
//! local checkout the client was last pointed at, so hosts do not have to
//! re-register it every run. The cache is explicit state passed to whoever
//! needs it, never a process-wide global.

use crate::error::ClientError;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Serialize, Deserialize)]
struct CacheDoc {
    repo_path: PathBuf,
}

/// File-backed repository path cache.
pub struct RepoPathCache {
    file: PathBuf,
}

impl RepoPathCache {
    /// Cache at the default location,
    /// `<config dir>/canopy/repo_path.toml`.
    pub fn new() -> Result<Self, ClientError> {
        let dirs = ProjectDirs::from("", "", "canopy").ok_or_else(|| {
            ClientError::ConfigError("cannot determine a configuration directory".to_string())
        })?;
        Ok(Self {
            file: dirs.config_dir().join("repo_path.toml"),
        })
    }

    /// Cache backed by an explicit file (used by tests).
    pub fn at(file: PathBuf) -> Self {
        Self { file }
    }

    /// The cached repository path, when one has been stored.
    ///
    /// A cached path that no longer exists on disk is a configuration
    /// error: the host must re-register the repository.
    pub fn load(&self) -> Result<Option<PathBuf>, ClientError> {
        let Some(cached) = self.peek()? else {
            return Ok(None);
        };
        if !cached.is_dir() {
            return Err(ClientError::ConfigError(format!(
                "the cached repository path is not valid: {} (cache file: {})",
                cached.display(),
                self.file.display()
            )));
        }
        Ok(Some(cached))
    }

    /// Remember `path` as the known repository location.
    pub fn store(&self, path: &Path) -> Result<(), ClientError> {
        if !path.is_dir() {
            return Err(ClientError::ConfigError(format!(
                "the suggested repository path is not valid: {}",
                path.display()
            )));
        }

        if let Ok(Some(previous)) = self.peek() {
            if previous != path {
                info!(
                    from = %previous.display(),
                    to = %path.display(),
                    "changing cached repository path"
                );
            }
        }

        if let Some(parent) = self.file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let doc = CacheDoc {
            repo_path: path.to_path_buf(),
        };
        let raw = toml::to_string(&doc)
            .map_err(|e| ClientError::ConfigError(format!("cannot encode cache: {}", e)))?;
        std::fs::write(&self.file, raw)?;
        Ok(())
    }

    /// Read the cached path without checking that it still exists.
    fn peek(&self) -> Result<Option<PathBuf>, ClientError> {
        if !self.file.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.file)?;
        let doc: CacheDoc = toml::from_str(&raw).map_err(|e| {
            ClientError::ConfigError(format!(
                "malformed cache file {}: {}",
                self.file.display(),
                e
            ))
        })?;
        Ok(Some(doc.repo_path))
    }
}
