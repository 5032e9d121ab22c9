//! Remote Repository Client
//!
//! REST client for the version-control service hosting the repository.
//! Feeds per-directory listings into the tree model, manages the branch
//! roster, and carries the content upload/removal and commit-status
//! operations. All tree mutation happens on one logical thread of control;
//! the client never shares a partially built tree.

use crate::config::RepoConfig;
use crate::error::ClientError;
use crate::tree::{path as tree_path, ContentRecord, TreeNode};
use crate::types::CommitState;
use async_trait::async_trait;
use data_encoding::BASE64;
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub mod api;
pub mod auth;

use api::{BranchInfo, CommitStatus, ContentEntry, PullRequestInfo, StatusPayload};
use auth::TokenSource;

const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const API_VERSION: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("canopy/", env!("CARGO_PKG_VERSION"));

/// Extensions routed to the image branch on upload.
const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".tiff", ".bmp", ".gif"];

/// Low-level REST transport.
///
/// `auth` is the full `Authorization` header value (`token …` for access
/// tokens, `Bearer …` during the app-JWT exchange).
#[async_trait]
pub trait RestTransport: Send + Sync {
    async fn get(&self, url: &str, auth: &str) -> Result<Value, ClientError>;
    async fn post(&self, url: &str, auth: &str, body: Value) -> Result<Value, ClientError>;
    async fn put(&self, url: &str, auth: &str, body: Value) -> Result<Value, ClientError>;
    async fn delete(&self, url: &str, auth: &str, body: Value) -> Result<Value, ClientError>;
}

fn map_http_error(error: reqwest::Error) -> ClientError {
    if error.is_timeout() {
        ClientError::RequestFailed(format!("request timeout: {}", error))
    } else if error.is_connect() {
        ClientError::RequestFailed(format!("connection error: {}", error))
    } else {
        ClientError::RequestFailed(format!("http error: {}", error))
    }
}

/// Production transport backed by `reqwest`.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::RequestFailed(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Value, ClientError> {
        let response = request
            .header("Accept", API_VERSION)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(map_http_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(match status.as_u16() {
                401 => ClientError::AuthFailed(text),
                403 | 429 => ClientError::RateLimited(text),
                404 => ClientError::NotFound(text),
                _ => ClientError::RequestFailed(format!("status {}: {}", status, text)),
            });
        }

        let text = response.text().await.map_err(map_http_error)?;
        if text.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(ClientError::from)
    }
}

#[async_trait]
impl RestTransport for HttpTransport {
    async fn get(&self, url: &str, auth: &str) -> Result<Value, ClientError> {
        self.execute(self.client.get(url).header("Authorization", auth))
            .await
    }

    async fn post(&self, url: &str, auth: &str, body: Value) -> Result<Value, ClientError> {
        self.execute(
            self.client
                .post(url)
                .header("Authorization", auth)
                .json(&body),
        )
        .await
    }

    async fn put(&self, url: &str, auth: &str, body: Value) -> Result<Value, ClientError> {
        self.execute(
            self.client
                .put(url)
                .header("Authorization", auth)
                .json(&body),
        )
        .await
    }

    async fn delete(&self, url: &str, auth: &str, body: Value) -> Result<Value, ClientError> {
        self.execute(
            self.client
                .delete(url)
                .header("Authorization", auth)
                .json(&body),
        )
        .await
    }
}

/// Cached branch names and head commit shas for one repository.
#[derive(Debug, Clone, Default)]
pub struct BranchRoster {
    names: Vec<String>,
    head_shas: HashMap<String, String>,
}

impl BranchRoster {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, branch: &str) -> bool {
        self.head_shas.contains_key(branch)
    }

    pub fn head_sha(&self, branch: &str) -> Option<&str> {
        self.head_shas.get(branch).map(String::as_str)
    }
}

/// Client for one remote repository.
pub struct RepoClient {
    repo: RepoConfig,
    transport: Arc<dyn RestTransport>,
    tokens: Arc<dyn TokenSource>,
    roster: RwLock<Option<BranchRoster>>,
}

impl RepoClient {
    pub fn new(repo: RepoConfig, tokens: Arc<dyn TokenSource>) -> Result<Self, ClientError> {
        Ok(Self::with_transport(
            repo,
            Arc::new(HttpTransport::new()?),
            tokens,
        ))
    }

    pub fn with_transport(
        repo: RepoConfig,
        transport: Arc<dyn RestTransport>,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            repo,
            transport,
            tokens,
            roster: RwLock::new(None),
        }
    }

    fn repo_url(&self) -> String {
        format!(
            "{}/repos/{}/{}",
            self.repo.api_base, self.repo.owner, self.repo.name
        )
    }

    async fn auth_header(&self) -> Result<String, ClientError> {
        Ok(format!("token {}", self.tokens.access_token().await?))
    }

    /// Refetch the branch roster, replacing any cached copy.
    ///
    /// The listing is paginated; the loop stops at the first page that
    /// returns no entries.
    pub async fn refresh_branches(&self) -> Result<(), ClientError> {
        let auth = self.auth_header().await?;
        let mut roster = BranchRoster::default();
        let mut page = 1;
        loop {
            let url = format!("{}/branches?page={}", self.repo_url(), page);
            let value = self.transport.get(&url, &auth).await?;
            let infos: Vec<BranchInfo> = serde_json::from_value(value)?;
            if infos.is_empty() {
                break;
            }
            for info in infos {
                roster
                    .head_shas
                    .insert(info.name.clone(), info.commit.sha);
                roster.names.push(info.name);
            }
            page += 1;
        }
        debug!(branch_count = roster.names.len(), "refreshed branch roster");
        *self.roster.write() = Some(roster);
        Ok(())
    }

    async fn ensure_roster(&self) -> Result<(), ClientError> {
        if self.roster.read().is_none() {
            self.refresh_branches().await?;
        }
        Ok(())
    }

    /// Branch names known on the remote, fetched once and cached.
    pub async fn branches(&self) -> Result<Vec<String>, ClientError> {
        self.ensure_roster().await?;
        let guard = self.roster.read();
        Ok(guard
            .as_ref()
            .map(|r| r.names.clone())
            .unwrap_or_default())
    }

    pub async fn branch_exists(&self, branch: &str) -> Result<bool, ClientError> {
        self.ensure_roster().await?;
        let guard = self.roster.read();
        Ok(guard.as_ref().map(|r| r.contains(branch)).unwrap_or(false))
    }

    /// Head commit sha of `branch`, when the branch is known.
    pub async fn latest_commit_sha(&self, branch: &str) -> Result<Option<String>, ClientError> {
        self.ensure_roster().await?;
        let guard = self.roster.read();
        Ok(guard
            .as_ref()
            .and_then(|r| r.head_sha(branch))
            .map(str::to_string))
    }

    /// Create `branch` off the head of `fork_from` (defaults to the
    /// configured default branch). Creating an existing branch is a no-op.
    pub async fn create_branch(
        &self,
        branch: &str,
        fork_from: Option<&str>,
    ) -> Result<(), ClientError> {
        let fork_from = fork_from.unwrap_or(&self.repo.default_branch);
        if self.branch_exists(branch).await? {
            return Ok(());
        }
        let fork_sha = self.latest_commit_sha(fork_from).await?.ok_or_else(|| {
            ClientError::BranchMissing(format!(
                "cannot create '{}' from '{}': '{}' does not exist",
                branch, fork_from, fork_from
            ))
        })?;

        let auth = self.auth_header().await?;
        self.transport
            .post(
                &format!("{}/git/refs", self.repo_url()),
                &auth,
                json!({
                    "ref": format!("refs/heads/{}", branch),
                    "sha": fork_sha,
                }),
            )
            .await?;
        info!(branch, fork_from, "created branch");
        self.refresh_branches().await
    }

    /// Build the full content tree of `branch`.
    ///
    /// Lists the root directory, then works through a queue of discovered
    /// subdirectories, feeding every entry into the tree root with its full
    /// relative path. Directory entries always reach the tree before their
    /// descendants, so insertion never sees a missing parent.
    #[instrument(skip(self))]
    pub async fn branch_tree(&self, branch: &str) -> Result<TreeNode, ClientError> {
        if !self.branch_exists(branch).await? {
            return Err(ClientError::BranchMissing(branch.to_string()));
        }

        let auth = self.auth_header().await?;
        let mut root = TreeNode::root();
        let mut pending: VecDeque<String> = VecDeque::from([String::new()]);

        while let Some(dir) = pending.pop_front() {
            let url = if dir.is_empty() {
                format!("{}/contents?ref={}", self.repo_url(), branch)
            } else {
                format!("{}/contents/{}?ref={}", self.repo_url(), dir, branch)
            };
            let value = self.transport.get(&url, &auth).await?;
            // A single-entry directory may answer with a bare object.
            let entries: Vec<ContentEntry> = match value {
                Value::Array(_) => serde_json::from_value(value)?,
                other => vec![serde_json::from_value(other)?],
            };
            for entry in entries {
                let content_path = if dir.is_empty() {
                    entry.name.clone()
                } else {
                    format!("{}/{}", dir, entry.name)
                };
                let kind = api::entry_kind_for(&entry.entry_type);
                root.insert(&content_path, kind, Some(&entry.sha))?;
                if kind == "dir" {
                    pending.push_back(content_path);
                }
            }
        }

        info!(branch, "built branch tree");
        Ok(root)
    }

    /// Flattened contents of `branch`: full path to leaf name and sha.
    pub async fn contents(
        &self,
        branch: &str,
    ) -> Result<BTreeMap<String, ContentRecord>, ClientError> {
        Ok(self.branch_tree(branch).await?.flatten())
    }

    /// Remove a file from `branch` (defaults to `master`).
    ///
    /// Does nothing when the tree says the path does not exist. The sha is
    /// taken from the tree when not supplied.
    pub async fn remove(
        &self,
        file_path: &str,
        branch: Option<&str>,
        file_sha: Option<&str>,
    ) -> Result<(), ClientError> {
        let branch = branch.unwrap_or("master");
        let tree = self.branch_tree(branch).await?;
        if !tree.exists(file_path) {
            debug!(file_path, branch, "remove skipped: path not in branch tree");
            return Ok(());
        }

        let sha = match file_sha {
            Some(s) => s.to_string(),
            None => tree
                .sha(file_path)
                .map(|s| s.as_str().to_string())
                .ok_or_else(|| {
                    ClientError::NotFound(format!(
                        "unable to remove existing file '{}': sha is unknown",
                        file_path
                    ))
                })?,
        };

        let name_path = tree_path::strip_prefix(file_path);
        let message = format!("{} is removing {}", self.repo.app_name, name_path);
        let auth = self.auth_header().await?;
        self.transport
            .delete(
                &format!("{}/contents/{}", self.repo_url(), name_path),
                &auth,
                json!({
                    "branch": branch,
                    "sha": sha,
                    "message": message,
                }),
            )
            .await?;
        info!(file_path = name_path, branch, "removed file");
        Ok(())
    }

    /// Upload a local file to `branch` (defaults to the configured default
    /// branch), overwriting in place when it already exists remotely.
    ///
    /// Image files are routed to the configured image branch unless the
    /// repository config opts out, so binary content does not bloat the
    /// main history.
    pub async fn upload(&self, file_name: &Path, branch: Option<&str>) -> Result<(), ClientError> {
        let base_name = file_name
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                ClientError::RequestFailed(format!("not a file path: {}", file_name.display()))
            })?;

        let mut branch = branch.unwrap_or(&self.repo.default_branch).to_string();
        let mut fork_point = self.repo.default_branch.clone();
        if is_image(&base_name)
            && branch != self.repo.image_branch
            && self.repo.route_images_to_image_branch
        {
            warn!(
                image_branch = %self.repo.image_branch,
                "image files are uploaded to the image branch of the main repository"
            );
            branch = self.repo.image_branch.clone();
            fork_point = "master".to_string();
        }

        if self.repo.allow_branch_creation {
            self.create_branch(&branch, Some(&fork_point)).await?;
        } else if !self.branch_exists(&branch).await? {
            return Err(ClientError::BranchMissing(branch));
        }

        let contents = self.contents(&branch).await?;
        let existing = contents.get(&tree_path::join(".", &base_name));
        if existing.is_some() {
            warn!(file = %base_name, branch = %branch, "file already exists in branch");
        }

        let data = std::fs::read(file_name)?;
        let mut payload = json!({
            "message": format!(
                "{} {} file {}",
                self.repo.app_name,
                if existing.is_some() { "overwriting" } else { "uploading" },
                base_name
            ),
            "name": self.repo.app_name,
            "branch": branch,
            "content": BASE64.encode(&data),
        });
        if let Some(sha) = existing.and_then(|record| record.sha.as_ref()) {
            payload["sha"] = json!(sha.as_str());
        }

        info!(file = %base_name, branch = %branch, "uploading file");
        let auth = self.auth_header().await?;
        self.transport
            .put(
                &format!("{}/contents/{}", self.repo_url(), base_name),
                &auth,
                payload,
            )
            .await?;
        Ok(())
    }

    /// The base branch an open pull request for `branch` targets, if any.
    pub async fn merge_target(&self, branch: &str) -> Result<Option<String>, ClientError> {
        let auth = self.auth_header().await?;
        let value = self
            .transport
            .get(&format!("{}/pulls", self.repo_url()), &auth)
            .await?;
        let pulls: Vec<PullRequestInfo> = serde_json::from_value(value)?;

        let wanted = format!("{}:{}", self.repo.owner, branch);
        debug!(head = %wanted, "checking open pull requests for merge target");
        for pull in pulls {
            if pull.head.label == wanted {
                let base = pull
                    .base
                    .label
                    .split_once(':')
                    .map(|(_, name)| name.to_string())
                    .unwrap_or(pull.base.label);
                return Ok(Some(base));
            }
        }
        Ok(None)
    }

    /// Post a commit status.
    ///
    /// The commit sha falls back to `CI_COMMIT_SHA` then `TRAVIS_COMMIT`
    /// when not provided; a `target_url` must be a valid http(s) URL.
    pub async fn post_status(
        &self,
        state: CommitState,
        commit_sha: Option<&str>,
        context: Option<&str>,
        description: Option<&str>,
        target_url: Option<&str>,
    ) -> Result<(), ClientError> {
        let sha = resolve_commit_sha(commit_sha)?;
        if let Some(url) = target_url {
            if !url_is_valid(url) {
                return Err(ClientError::InvalidUrl(url.to_string()));
            }
        }

        let payload = StatusPayload {
            state,
            context: context.map(str::to_string),
            description: description.map(str::to_string),
            target_url: target_url.map(str::to_string),
        };
        info!(state = %state, commit = %sha, "posting commit status");
        let auth = self.auth_header().await?;
        self.transport
            .post(
                &format!("{}/statuses/{}", self.repo_url(), sha),
                &auth,
                serde_json::to_value(&payload)?,
            )
            .await?;
        Ok(())
    }

    /// Statuses of the given commit (or the env-provided one), newest first,
    /// along with the resolved sha.
    pub async fn statuses(
        &self,
        commit_sha: Option<&str>,
    ) -> Result<(Vec<CommitStatus>, String), ClientError> {
        let sha = resolve_commit_sha(commit_sha)?;
        let auth = self.auth_header().await?;
        let value = self
            .transport
            .get(
                &format!("{}/commits/{}/statuses", self.repo_url(), sha),
                &auth,
            )
            .await?;
        Ok((serde_json::from_value(value)?, sha))
    }

    /// State of the status at `index` for the given commit.
    pub async fn state_at(
        &self,
        commit_sha: Option<&str>,
        index: usize,
    ) -> Result<CommitState, ClientError> {
        let (statuses, sha) = self.statuses(commit_sha).await?;
        let status = statuses.get(index).ok_or_else(|| {
            ClientError::NotFound(format!(
                "no status at index {} for commit {} ({} total)",
                index,
                sha,
                statuses.len()
            ))
        })?;
        status.state.parse()
    }
}

fn resolve_commit_sha(provided: Option<&str>) -> Result<String, ClientError> {
    let sha = match provided {
        Some(s) => s.to_string(),
        None => std::env::var("CI_COMMIT_SHA")
            .or_else(|_| std::env::var("TRAVIS_COMMIT"))
            .map_err(|_| ClientError::MissingCommitSha)?,
    };
    if sha.len() != 40 {
        return Err(ClientError::UnconventionalCommitSha {
            len: sha.len(),
            sha,
        });
    }
    Ok(sha)
}

fn is_image(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// True for absolute http(s) URLs.
pub fn url_is_valid(candidate: &str) -> bool {
    reqwest::Url::parse(candidate)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}
