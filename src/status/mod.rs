//! Per-file annotation feeds and their reconciliation onto the tree.
//!
//! Two independent feeds exist: the primary working-tree status, which drives
//! the status badge, and the secondary tracked flag for large objects managed
//! through sidecar files. They are fetched and applied separately and never
//! folded into one another.

pub mod porcelain;
pub mod reconcile;
pub mod sidecar;

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{FennError, Result};

pub use reconcile::{apply_primary, apply_tracked, FeedPaths, ReconcileReport, Scope};

/// Working-tree change status of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryStatus {
    Untracked,
    Modified,
    Staged,
    PartiallyStaged,
    Deleted,
    Conflict,
    Clean,
}

impl PrimaryStatus {
    /// Parse a status name. `pushed` and `committed` are accepted as clean.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "untracked" => Some(PrimaryStatus::Untracked),
            "modified" => Some(PrimaryStatus::Modified),
            "staged" => Some(PrimaryStatus::Staged),
            "partially_staged" | "partially-staged" => Some(PrimaryStatus::PartiallyStaged),
            "deleted" => Some(PrimaryStatus::Deleted),
            "conflict" | "conflicted" => Some(PrimaryStatus::Conflict),
            "clean" | "pushed" | "committed" => Some(PrimaryStatus::Clean),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PrimaryStatus::Untracked => "untracked",
            PrimaryStatus::Modified => "modified",
            PrimaryStatus::Staged => "staged",
            PrimaryStatus::PartiallyStaged => "partially_staged",
            PrimaryStatus::Deleted => "deleted",
            PrimaryStatus::Conflict => "conflict",
            PrimaryStatus::Clean => "clean",
        }
    }

    /// One-letter badge; clean paths show none.
    pub fn badge(&self) -> &'static str {
        match self {
            PrimaryStatus::Untracked => "U",
            PrimaryStatus::Modified => "M",
            PrimaryStatus::Staged => "S",
            PrimaryStatus::PartiallyStaged => "P",
            PrimaryStatus::Deleted => "D",
            PrimaryStatus::Conflict => "C",
            PrimaryStatus::Clean => "",
        }
    }
}

impl fmt::Display for PrimaryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a feed response is authoritative for its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    /// Covers the whole requested scope: in-scope paths it omits are reset.
    Snapshot,
    /// Lists only changed paths: omitted paths keep their annotation.
    Delta,
}

/// One annotation as reported by a feed, keyed in the feed's own path form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry<T> {
    pub path: String,
    pub value: T,
}

impl<T> FeedEntry<T> {
    pub fn new(path: impl Into<String>, value: T) -> Self {
        Self {
            path: path.into(),
            value,
        }
    }
}

/// A feed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusFeed<T> {
    pub kind: FeedKind,
    pub entries: Vec<FeedEntry<T>>,
}

impl<T> StatusFeed<T> {
    pub fn snapshot(entries: Vec<FeedEntry<T>>) -> Self {
        Self {
            kind: FeedKind::Snapshot,
            entries,
        }
    }

    pub fn delta(entries: Vec<FeedEntry<T>>) -> Self {
        Self {
            kind: FeedKind::Delta,
            entries,
        }
    }
}

pub type PrimaryFeed = StatusFeed<PrimaryStatus>;
pub type TrackedFeed = StatusFeed<bool>;

/// Source of working-tree status.
#[async_trait]
pub trait PrimaryStatusProvider: Send + Sync {
    /// Status for the whole root, or only for `paths` when given.
    async fn get_status(&self, root: &Path, paths: Option<&[String]>) -> Result<PrimaryFeed>;
}

/// Source of the tracked flag.
#[async_trait]
pub trait SecondaryStatusProvider: Send + Sync {
    /// Tracked flags for the whole root, or only for `paths` when given.
    async fn get_status(&self, root: &Path, paths: Option<&[String]>) -> Result<TrackedFeed>;
}

/// Primary provider that never reports anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrimaryStatus;

#[async_trait]
impl PrimaryStatusProvider for NoPrimaryStatus {
    async fn get_status(&self, _root: &Path, _paths: Option<&[String]>) -> Result<PrimaryFeed> {
        Ok(StatusFeed::delta(Vec::new()))
    }
}

/// Primary provider reading `git status --porcelain` output from a file.
///
/// The file is re-read on every request so that callers can regenerate it
/// after an external action and then ask for a refresh.
#[derive(Debug, Clone)]
pub struct PorcelainFileProvider {
    file: PathBuf,
}

impl PorcelainFileProvider {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self { file: file.into() }
    }
}

#[async_trait]
impl PrimaryStatusProvider for PorcelainFileProvider {
    async fn get_status(&self, _root: &Path, _paths: Option<&[String]>) -> Result<PrimaryFeed> {
        let text = match tokio::fs::read_to_string(&self.file).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FennError::NotFound(self.file.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        // Porcelain lists every changed path; anything it omits is clean.
        Ok(StatusFeed::snapshot(porcelain::parse_porcelain(&text)))
    }
}
