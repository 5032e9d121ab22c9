//! Wire types for the remote repository REST API.

use crate::types::CommitState;
use serde::{Deserialize, Serialize};

/// One entry of a per-directory contents listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub sha: String,
}

/// A branch as returned by the branch-listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BranchInfo {
    pub name: String,
    pub commit: CommitRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitRef {
    pub sha: String,
}

/// Head/base labels of an open pull request, `owner:branch` form.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestInfo {
    pub head: BranchLabel,
    pub base: BranchLabel,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BranchLabel {
    pub label: String,
}

/// An app installation record; the installation id is the tail of `html_url`.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallationInfo {
    pub html_url: String,
}

/// An installation access-token grant.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenGrant {
    pub token: String,
    pub expires_at: Option<String>,
}

/// Payload for posting a commit status.
#[derive(Debug, Clone, Serialize)]
pub struct StatusPayload {
    pub state: CommitState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
}

/// A commit status as returned by the status-listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitStatus {
    pub state: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_url: Option<String>,
}

/// Map a remote entry type onto the tree model's three-way classification.
///
/// The remote API distinguishes more types (symlinks, submodules, ...);
/// everything that is not a directory or plain file is tracked as misc
/// content.
pub fn entry_kind_for(remote_type: &str) -> &'static str {
    match remote_type {
        "dir" => "dir",
        "file" => "file",
        _ => "misc",
    }
}
