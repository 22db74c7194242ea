//! The workspace: one tree, its selection and its status overlays, behind a
//! single handle.
//!
//! Each concern has one mutation entry point: [`Workspace::reload`] rebuilds
//! the structure, [`Workspace::toggle`] and [`Workspace::clear`] change the
//! selection, [`Workspace::refresh_status`] re-applies the status feeds in
//! place. Locks are never held across an await; when both are needed the tree
//! lock is taken before the selection lock.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};

use crate::config::AppConfig;
use crate::error::{FennError, Result};
use crate::fs::{FileEntryProvider, WalkDirProvider};
use crate::path;
use crate::selection::{leaf_paths, JsonFilePersistence, SelectionPersistence, SelectionStore, ToggleOutcome};
use crate::status::sidecar::SidecarTrackedProvider;
use crate::status::{
    apply_primary, apply_tracked, FeedPaths, NoPrimaryStatus, PorcelainFileProvider, PrimaryFeed,
    PrimaryStatusProvider, ReconcileReport, Scope, SecondaryStatusProvider, TrackedFeed,
};
use crate::tree::{build_tree, descendant_paths, tri_state, FileTree, SkippedEntry, TriState};

/// External services a workspace talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub entries: Arc<dyn FileEntryProvider>,
    pub persistence: Arc<dyn SelectionPersistence>,
    pub primary: Arc<dyn PrimaryStatusProvider>,
    pub secondary: Arc<dyn SecondaryStatusProvider>,
}

/// Result of applying both status feeds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    pub primary: Option<ReconcileReport>,
    pub tracked: Option<ReconcileReport>,
    /// Feed failures; the affected overlay keeps its previous values.
    pub warnings: Vec<String>,
}

/// Result of a structural rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadReport {
    pub entries: usize,
    pub nodes: usize,
    pub skipped: Vec<SkippedEntry>,
    pub status: StatusReport,
    /// Selected paths dropped because they are no longer in the tree.
    pub pruned: Vec<String>,
}

pub struct Workspace {
    root: PathBuf,
    entries: Arc<dyn FileEntryProvider>,
    primary: Arc<dyn PrimaryStatusProvider>,
    secondary: Arc<dyn SecondaryStatusProvider>,
    primary_paths: FeedPaths,
    secondary_paths: FeedPaths,
    tree: RwLock<FileTree>,
    selection: SelectionStore,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("root", &self.root)
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, collaborators: Collaborators) -> Self {
        let root = root.into();
        let feed_paths = FeedPaths::new(&root);
        Self {
            primary_paths: feed_paths.clone(),
            secondary_paths: feed_paths,
            entries: collaborators.entries,
            primary: collaborators.primary,
            secondary: collaborators.secondary,
            selection: SelectionStore::new(collaborators.persistence),
            tree: RwLock::new(FileTree::empty()),
            root,
        }
    }

    /// Wire up the filesystem-backed collaborators described by `config`.
    pub fn from_config(root: impl Into<PathBuf>, config: &AppConfig) -> Self {
        let root = root.into();
        let suffix = config.sidecar_suffix().to_string();
        let ignore = config.ignore();

        let primary: Arc<dyn PrimaryStatusProvider> = match config.porcelain_file() {
            Some(file) => Arc::new(PorcelainFileProvider::new(root.join(file))),
            None => Arc::new(NoPrimaryStatus),
        };
        let store = config.selection_store_path(&root);
        tracing::debug!(root = %root.display(), store = %store.display(), "opening workspace");

        let collaborators = Collaborators {
            entries: Arc::new(
                WalkDirProvider::new(ignore.clone()).with_sidecar_suffix(Some(suffix.clone())),
            ),
            persistence: Arc::new(JsonFilePersistence::new(store)),
            primary,
            secondary: Arc::new(SidecarTrackedProvider::new(suffix, ignore)),
        };
        Self::new(root, collaborators)
            .with_feed_prefixes(config.primary_prefix(), config.secondary_prefix())
            .with_sidecar_suffix(Some(config.sidecar_suffix()))
    }

    /// Set where the root sits beneath each feed's own base directory.
    pub fn with_feed_prefixes(mut self, primary: Option<&str>, secondary: Option<&str>) -> Self {
        self.primary_paths = self.primary_paths.clone().with_prefix(primary);
        self.secondary_paths = self.secondary_paths.clone().with_prefix(secondary);
        self
    }

    /// Credit primary statuses reported on `<file><suffix>` sidecars to `<file>`.
    pub fn with_sidecar_suffix(mut self, suffix: Option<&str>) -> Self {
        self.primary_paths = self.primary_paths.clone().with_sidecar_suffix(suffix);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Build the tree, then load the selection and drop entries the tree no
    /// longer has.
    pub async fn mount(&self) -> Result<ReloadReport> {
        let mut report = self.reload().await?;
        self.selection.load().await?;
        report.pruned = self.prune_selection();
        Ok(report)
    }

    /// Rebuild the tree from a fresh listing and both status feeds.
    ///
    /// A listing failure leaves the current tree in place. A feed failure only
    /// leaves that overlay unset on the new tree.
    pub async fn reload(&self) -> Result<ReloadReport> {
        let entries = self.entries.list_entries(&self.root).await?;
        let entry_count = entries.len();
        let build = build_tree(entries);
        let mut tree = build.tree;

        let (primary, secondary) = tokio::join!(
            self.primary.get_status(&self.root, None),
            self.secondary.get_status(&self.root, None)
        );
        let status = self.apply_feeds(&mut tree, primary, secondary, &Scope::All);
        let nodes = tree.len();

        *self.tree.write() = tree;
        let pruned = self.prune_selection();

        tracing::info!(
            entries = entry_count,
            nodes,
            skipped = build.skipped.len(),
            pruned = pruned.len(),
            "tree reloaded"
        );
        Ok(ReloadReport {
            entries: entry_count,
            nodes,
            skipped: build.skipped,
            status,
            pruned,
        })
    }

    /// Re-fetch status for `paths` (or the whole tree) and update matching
    /// nodes in place. Structure, selection and everything outside the scope
    /// are left alone.
    pub async fn refresh_status(&self, paths: Option<&[String]>) -> StatusReport {
        let scoped: Option<Vec<String>> = paths.map(|raw| {
            raw.iter()
                .filter_map(|p| {
                    let normalized = path::normalize(p);
                    if normalized.is_none() {
                        tracing::warn!(path = %p, "ignoring invalid refresh path");
                    }
                    normalized
                })
                .collect()
        });
        if matches!(&scoped, Some(list) if list.is_empty()) {
            return StatusReport::default();
        }

        let (primary, secondary) = tokio::join!(
            self.primary.get_status(&self.root, scoped.as_deref()),
            self.secondary.get_status(&self.root, scoped.as_deref())
        );
        let scope = match scoped {
            Some(list) => Scope::Paths(list),
            None => Scope::All,
        };

        let mut tree = self.tree.write();
        let report = self.apply_feeds(&mut tree, primary, secondary, &scope);
        tracing::debug!(?scope, ?report, "status refreshed");
        report
    }

    fn apply_feeds(
        &self,
        tree: &mut FileTree,
        primary: Result<PrimaryFeed>,
        secondary: Result<TrackedFeed>,
        scope: &Scope,
    ) -> StatusReport {
        let mut report = StatusReport::default();
        match primary {
            Ok(feed) => report.primary = Some(apply_primary(tree, &feed, &self.primary_paths, scope)),
            Err(e) => {
                tracing::warn!(error = %e, "primary status unavailable");
                report.warnings.push(format!("status: {}", e));
            }
        }
        match secondary {
            Ok(feed) => {
                report.tracked = Some(apply_tracked(tree, &feed, &self.secondary_paths, scope))
            }
            Err(e) => {
                tracing::warn!(error = %e, "tracked status unavailable");
                report.warnings.push(format!("tracked: {}", e));
            }
        }
        report
    }

    /// Toggle `raw_path` and, for a directory, everything beneath it.
    pub async fn toggle(&self, raw_path: &str) -> Result<ToggleOutcome> {
        let target =
            path::normalize(raw_path).ok_or_else(|| FennError::InvalidPath(raw_path.to_string()))?;
        let descendants = {
            let tree = self.tree.read();
            let node = tree
                .get(&target)
                .ok_or_else(|| FennError::NotFound(self.root.join(&target)))?;
            descendant_paths(node, path::parent(&target))
        };
        self.selection.toggle(&target, descendants).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.selection.clear().await
    }

    fn prune_selection(&self) -> Vec<String> {
        let tree = self.tree.read();
        self.selection.prune(|p| tree.contains(p))
    }

    /// Read-only view of the current tree. Do not hold it across an await.
    pub fn tree(&self) -> RwLockReadGuard<'_, FileTree> {
        self.tree.read()
    }

    pub fn selection(&self) -> &SelectionStore {
        &self.selection
    }

    pub fn selected(&self) -> BTreeSet<String> {
        self.selection.selected()
    }

    pub fn is_pending(&self, path: &str) -> bool {
        self.selection.is_pending(path)
    }

    /// Tri-state of the node at `path`, derived from the current selection.
    pub fn tri_state(&self, path: &str) -> Option<TriState> {
        let tree = self.tree.read();
        let node = tree.get(path)?;
        Some(
            self.selection
                .with_selected(|selected| tri_state(node, path::parent(path), selected)),
        )
    }

    /// The selection reduced to non-overlapping paths, ready for a batch
    /// action.
    pub fn action_paths(&self) -> Vec<String> {
        self.selection.with_selected(|selected| leaf_paths(selected))
    }
}
