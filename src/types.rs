//! Core vocabulary types shared across the tree model and the remote client.

use crate::error::TreeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of a remote object id in hex characters.
pub const OBJECT_SHA_LEN: usize = 40;

/// A 40-character hex object id identifying a file or directory snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectSha(String);

impl ObjectSha {
    /// Parse a candidate object id.
    ///
    /// Accepts exactly 40 hexadecimal characters; everything else is rejected.
    pub fn parse(candidate: &str) -> Result<Self, TreeError> {
        if candidate.len() != OBJECT_SHA_LEN || hex::decode(candidate).is_err() {
            return Err(TreeError::MalformedHash {
                path: String::new(),
                sha: candidate.to_string(),
            });
        }
        Ok(Self(candidate.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectSha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The three-way classification of tree entries.
///
/// Remote listings only distinguish directories and files; every other
/// remote type is mapped to `Misc` by the lister before insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Dir,
    File,
    Misc,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Dir => "dir",
            EntryKind::File => "file",
            EntryKind::Misc => "misc",
        }
    }
}

impl FromStr for EntryKind {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dir" => Ok(EntryKind::Dir),
            "file" => Ok(EntryKind::File),
            "misc" => Ok(EntryKind::Misc),
            other => Err(TreeError::InvalidContentType {
                path: String::new(),
                content_type: other.to_string(),
                sha: None,
            }),
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Commit status states accepted by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitState {
    Pending,
    Failed,
    Error,
    Success,
}

impl CommitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitState::Pending => "pending",
            CommitState::Failed => "failed",
            CommitState::Error => "error",
            CommitState::Success => "success",
        }
    }
}

impl FromStr for CommitState {
    type Err = crate::error::ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CommitState::Pending),
            "failed" => Ok(CommitState::Failed),
            "error" => Ok(CommitState::Error),
            "success" => Ok(CommitState::Success),
            other => Err(crate::error::ClientError::InvalidState(other.to_string())),
        }
    }
}

impl fmt::Display for CommitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
