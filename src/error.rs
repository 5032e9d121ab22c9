//! Error types for the tree model and the remote repository client.

use thiserror::Error;

/// Hard failures raised while building the tree.
///
/// All of these indicate caller misuse (malformed remote data or wrong
/// insertion order) and abort the current build; they are never retried
/// internally. Lookup misses are `Option::None`, not errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error(
        "unknown content type '{content_type}' (allowed: dir, file, misc); \
         path: '{path}', sha: {sha:?}"
    )]
    InvalidContentType {
        path: String,
        content_type: String,
        sha: Option<String>,
    },

    #[error("no content specified; path: '{path}', type: '{content_type}'")]
    EmptyContentPath { path: String, content_type: String },

    #[error("content sha must be 40 hex characters, got '{sha}'; path: '{path}'")]
    MalformedHash { path: String, sha: String },

    #[error("cannot insert '{path}': parent directory '{segment}' has not been inserted")]
    MissingParentDirectory { path: String, segment: String },

    #[error("cannot insert '{name}' under '{path}': already recorded as {existing}")]
    ConflictingEntry {
        path: String,
        name: String,
        existing: crate::types::EntryKind,
    },
}

/// Remote-client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("branch missing from repository: {0}")]
    BranchMissing(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("unrecognized commit state: {0}")]
    InvalidState(String),

    #[error("commit sha not provided and CI_COMMIT_SHA/TRAVIS_COMMIT are not defined")]
    MissingCommitSha,

    #[error("unconventional commit sha '{sha}': expected 40 characters, got {len}")]
    UnconventionalCommitSha { sha: String, len: usize },

    #[error("unexpected response shape: {0}")]
    UnexpectedResponse(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for ClientError {
    fn from(err: config::ConfigError) -> Self {
        ClientError::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::UnexpectedResponse(err.to_string())
    }
}
