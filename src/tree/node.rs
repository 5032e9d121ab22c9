//! Tree node: one directory level of the remote repository mirror.

use crate::error::TreeError;
use crate::tree::path;
use crate::types::{EntryKind, ObjectSha};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// One entry of the flattened content listing: leaf name plus content sha.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRecord {
    pub name: String,
    pub sha: Option<ObjectSha>,
}

/// In-memory representation of one directory of a remote repository branch.
///
/// A node owns its child directory nodes and its leaf entries; no node holds
/// a reference into a sibling's subtree. The tree is populated through
/// [`TreeNode::insert`] on the root instance and queried with `./`-rooted
/// relative paths. It is not safe for concurrent mutation; a host that
/// parallelizes remote listings must serialize calls into the tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    name: String,
    sha: Option<ObjectSha>,
    rel_path: String,
    children: Vec<TreeNode>,
    files: BTreeMap<String, Option<ObjectSha>>,
    assets: BTreeMap<String, Option<ObjectSha>>,
}

impl TreeNode {
    /// Create the root of a fresh tree.
    ///
    /// The root has no name and no sha of its own; its relative path is `"."`.
    pub fn root() -> Self {
        Self {
            name: String::new(),
            sha: None,
            rel_path: ".".to_string(),
            children: Vec::new(),
            files: BTreeMap::new(),
            assets: BTreeMap::new(),
        }
    }

    fn child(name: String, parent_rel_path: &str, sha: Option<ObjectSha>) -> Self {
        let rel_path = path::join(parent_rel_path, &name);
        Self {
            name,
            sha,
            rel_path,
            children: Vec::new(),
            files: BTreeMap::new(),
            assets: BTreeMap::new(),
        }
    }

    /// This directory's own segment name (empty for the root).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// This directory's own content sha, when the remote reported one.
    pub fn own_sha(&self) -> Option<&ObjectSha> {
        self.sha.as_ref()
    }

    /// Path from the tree root to this node, `./`-rooted.
    pub fn relative_path(&self) -> &str {
        &self.rel_path
    }

    /// Plain tracked files at this level, name to content sha.
    pub fn files(&self) -> &BTreeMap<String, Option<ObjectSha>> {
        &self.files
    }

    /// Binary/miscellaneous content at this level, name to content sha.
    pub fn assets(&self) -> &BTreeMap<String, Option<ObjectSha>> {
        &self.assets
    }

    /// Child directory nodes.
    pub fn child_dirs(&self) -> &[TreeNode] {
        &self.children
    }

    /// Record one discovered entry.
    ///
    /// `content_type` is the three-way wire classification (`"dir"`,
    /// `"file"`, `"misc"`); the caller is responsible for mapping any other
    /// remote type to `"misc"` before calling. Multi-segment paths require
    /// every intermediate directory to have been inserted already —
    /// directories arrive before their descendants, and intermediate levels
    /// are never created implicitly.
    ///
    /// Validation happens before any mutation: the type must be known, the
    /// path must not alias the root, and the sha (when given) must be 40 hex
    /// characters.
    pub fn insert(
        &mut self,
        content_path: &str,
        content_type: &str,
        content_sha: Option<&str>,
    ) -> Result<(), TreeError> {
        let kind: EntryKind =
            content_type
                .parse()
                .map_err(|_| TreeError::InvalidContentType {
                    path: content_path.to_string(),
                    content_type: content_type.to_string(),
                    sha: content_sha.map(str::to_string),
                })?;

        if path::is_root_alias(content_path) {
            return Err(TreeError::EmptyContentPath {
                path: content_path.to_string(),
                content_type: content_type.to_string(),
            });
        }

        let sha = match content_sha {
            Some(raw) => Some(ObjectSha::parse(raw).map_err(|_| TreeError::MalformedHash {
                path: content_path.to_string(),
                sha: raw.to_string(),
            })?),
            None => None,
        };

        self.insert_at(content_path, path::strip_prefix(content_path), kind, sha)
    }

    fn insert_at(
        &mut self,
        full_path: &str,
        remaining: &str,
        kind: EntryKind,
        sha: Option<ObjectSha>,
    ) -> Result<(), TreeError> {
        match path::split_first(remaining) {
            (segment, Some(rest)) => {
                let child = self
                    .children
                    .iter_mut()
                    .find(|c| c.name == segment)
                    .ok_or_else(|| TreeError::MissingParentDirectory {
                        path: full_path.to_string(),
                        segment: segment.to_string(),
                    })?;
                child.insert_at(full_path, rest, kind, sha)
            }
            (name, None) => self.record_leaf(full_path, name, kind, sha),
        }
    }

    fn record_leaf(
        &mut self,
        full_path: &str,
        name: &str,
        kind: EntryKind,
        sha: Option<ObjectSha>,
    ) -> Result<(), TreeError> {
        if name.is_empty() {
            return Err(TreeError::EmptyContentPath {
                path: full_path.to_string(),
                content_type: kind.as_str().to_string(),
            });
        }
        if let Some(existing) = self.kind_of_name(name) {
            if existing != kind {
                return Err(TreeError::ConflictingEntry {
                    path: self.rel_path.clone(),
                    name: name.to_string(),
                    existing,
                });
            }
        }

        debug!(path = full_path, kind = %kind, "recording tree entry");
        match kind {
            EntryKind::Dir => {
                // Re-listing the same directory is idempotent; the newest
                // listing is authoritative for the sha.
                if let Some(existing) = self.children.iter_mut().find(|c| c.name == name) {
                    existing.sha = sha;
                } else {
                    self.children
                        .push(TreeNode::child(name.to_string(), &self.rel_path, sha));
                }
            }
            EntryKind::File => {
                self.files.insert(name.to_string(), sha);
            }
            EntryKind::Misc => {
                self.assets.insert(name.to_string(), sha);
            }
        }
        Ok(())
    }

    fn kind_of_name(&self, name: &str) -> Option<EntryKind> {
        if self.files.contains_key(name) {
            Some(EntryKind::File)
        } else if self.assets.contains_key(name) {
            Some(EntryKind::Misc)
        } else if self.children.iter().any(|c| c.name == name) {
            Some(EntryKind::Dir)
        } else {
            None
        }
    }

    /// True when `path` names this node, or a file, asset, or directory
    /// reachable from it. Accepts `name`, `./name`, `/name`, and `a/b/c`
    /// forms; root aliases are always true.
    pub fn exists(&self, path: &str) -> bool {
        path::is_root_alias(path) || self.descend(path::strip_prefix(path)).is_some()
    }

    /// The kind of the entry at `path`, or `None` when nothing matches.
    ///
    /// Root aliases resolve to [`EntryKind::Dir`]. Multi-segment paths are
    /// resolved by stripping one segment at a time and descending into the
    /// child directory matching it — every child is searched, not just the
    /// first.
    pub fn kind(&self, path: &str) -> Option<EntryKind> {
        if path::is_root_alias(path) {
            return Some(EntryKind::Dir);
        }
        self.descend(path::strip_prefix(path)).map(|(kind, _)| kind)
    }

    /// The content sha recorded for the entry at `path`.
    ///
    /// `None` both when nothing matches and when the entry was inserted
    /// without a sha; absence is a normal outcome for speculative lookups.
    /// The root itself has no sha, so root aliases resolve to `None`.
    pub fn sha(&self, path: &str) -> Option<&ObjectSha> {
        if path::is_root_alias(path) {
            return None;
        }
        self.descend(path::strip_prefix(path))
            .and_then(|(_, sha)| sha)
    }

    fn descend(&self, remaining: &str) -> Option<(EntryKind, Option<&ObjectSha>)> {
        match path::split_first(remaining) {
            (segment, Some(rest)) => self
                .children
                .iter()
                .find(|c| c.name == segment)?
                .descend(rest),
            (name, None) => {
                if let Some(sha) = self.files.get(name) {
                    Some((EntryKind::File, sha.as_ref()))
                } else if let Some(sha) = self.assets.get(name) {
                    Some((EntryKind::Misc, sha.as_ref()))
                } else {
                    self.children
                        .iter()
                        .find(|c| c.name == name)
                        .map(|c| (EntryKind::Dir, c.sha.as_ref()))
                }
            }
        }
    }

    /// Collect every relative path in the subtree whose string ends with
    /// `suffix` (textual match, not segment-aware).
    ///
    /// Walk order is files, then assets, then child directories at each
    /// level, parent before children; deterministic for identical contents.
    pub fn relative_paths(&self, suffix: &str) -> Vec<String> {
        let mut found = Vec::new();
        self.collect_paths(".", suffix, &mut found);
        found
    }

    fn collect_paths(&self, current: &str, suffix: &str, found: &mut Vec<String>) {
        for name in self.files.keys() {
            let candidate = path::join(current, name);
            if candidate.ends_with(suffix) {
                found.push(candidate);
            }
        }
        for name in self.assets.keys() {
            let candidate = path::join(current, name);
            if candidate.ends_with(suffix) {
                found.push(candidate);
            }
        }
        for child in &self.children {
            let candidate = path::join(current, &child.name);
            if candidate.ends_with(suffix) {
                found.push(candidate);
            }
        }
        for child in &self.children {
            child.collect_paths(&path::join(current, &child.name), suffix, found);
        }
    }

    /// Flatten the subtree into a mapping from full path to leaf name and
    /// content sha, covering every file, asset, and directory transitively.
    ///
    /// Read-only projection; consumers use it to probe whether a path
    /// already exists remotely and to obtain its sha for update-in-place.
    pub fn flatten(&self) -> BTreeMap<String, ContentRecord> {
        let mut contents = BTreeMap::new();
        self.flatten_into(&mut contents);
        contents
    }

    fn flatten_into(&self, contents: &mut BTreeMap<String, ContentRecord>) {
        for (name, sha) in &self.files {
            contents.insert(
                path::join(&self.rel_path, name),
                ContentRecord {
                    name: name.clone(),
                    sha: sha.clone(),
                },
            );
        }
        for (name, sha) in &self.assets {
            contents.insert(
                path::join(&self.rel_path, name),
                ContentRecord {
                    name: name.clone(),
                    sha: sha.clone(),
                },
            );
        }
        for child in &self.children {
            contents.insert(
                path::join(&self.rel_path, &child.name),
                ContentRecord {
                    name: child.name.clone(),
                    sha: child.sha.clone(),
                },
            );
            child.flatten_into(contents);
        }
    }

    fn fmt_contents(&self, f: &mut fmt::Formatter<'_>, indent: &str) -> fmt::Result {
        for name in self.files.keys() {
            writeln!(f, "{}file {}", indent, name)?;
        }
        for name in self.assets.keys() {
            writeln!(f, "{}misc {}", indent, name)?;
        }
        for child in &self.children {
            writeln!(f, "{}dir  {}", indent, child.name)?;
            child.fmt_contents(f, &format!("{}  ", indent))?;
        }
        Ok(())
    }
}

impl fmt::Display for TreeNode {
    /// Contents of the node and all children, indenting with each level.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_contents(f, "")
    }
}
