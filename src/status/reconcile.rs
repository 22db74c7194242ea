use std::collections::HashSet;
use std::path::Path;

use crate::path;
use crate::status::{FeedKind, PrimaryFeed, PrimaryStatus, StatusFeed, TrackedFeed};
use crate::tree::{descendants, FileTree, TreeNode};

/// Translates feed path keys into the tree's root-relative form.
///
/// Absolute keys have the tree root stripped. Relative keys are taken to be
/// relative to the feed's own base; when that base is an ancestor of the tree
/// root (a repository root above a subdirectory workspace, for instance),
/// `prefix` is the tree root's location beneath it and gets stripped too.
///
/// With a sidecar suffix set, a key naming `<path>.<suffix>` that is not a
/// node itself is credited to `<path>`: the data file is usually ignored by
/// the working-tree tool, so its sidecar carries its status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedPaths {
    root: Option<String>,
    prefix: Option<String>,
    sidecar_suffix: Option<String>,
}

impl FeedPaths {
    pub fn new(root: &Path) -> Self {
        let root = root.to_string_lossy().replace('\\', "/");
        let root = root.trim_end_matches('/').to_string();
        Self {
            root: Some(root),
            prefix: None,
            sidecar_suffix: None,
        }
    }

    pub fn with_prefix(mut self, prefix: Option<&str>) -> Self {
        self.prefix = prefix.and_then(path::normalize);
        self
    }

    pub fn with_sidecar_suffix(mut self, suffix: Option<&str>) -> Self {
        self.sidecar_suffix = suffix
            .map(|s| s.trim_start_matches('.').to_string())
            .filter(|s| !s.is_empty());
        self
    }

    /// Normalize one feed key, or `None` when it cannot name a tree node.
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let unified = raw.replace('\\', "/");
        if is_absolute(&unified) {
            let root = self.root.as_deref()?;
            let rest = unified.strip_prefix(root)?;
            if !rest.is_empty() && !rest.starts_with('/') {
                return None;
            }
            return path::normalize(rest);
        }

        let relative = path::normalize(&unified)?;
        match &self.prefix {
            Some(prefix) if path::is_ancestor(prefix, &relative) => {
                Some(relative[prefix.len() + 1..].to_string())
            }
            Some(_) => None,
            None => Some(relative),
        }
    }

    /// The node a normalized key lands on: the key itself, or the data file
    /// a sidecar key belongs to.
    fn resolve(&self, tree: &FileTree, target: &str) -> Option<String> {
        if tree.contains(target) {
            return Some(target.to_string());
        }
        let suffix = self.sidecar_suffix.as_deref()?;
        let data = target.strip_suffix(suffix)?.strip_suffix('.')?;
        if data.is_empty() || path::file_name(data).is_empty() {
            return None;
        }
        tree.contains(data).then(|| data.to_string())
    }
}

fn is_absolute(p: &str) -> bool {
    let bytes = p.as_bytes();
    p.starts_with('/') || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
}

/// The part of the tree a feed response is applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// The whole tree (structural rebuild).
    All,
    /// The given normalized paths and everything beneath them.
    Paths(Vec<String>),
}

impl Scope {
    pub fn contains(&self, target: &str) -> bool {
        match self {
            Scope::All => true,
            Scope::Paths(paths) => paths.iter().any(|s| path::is_within(s, target)),
        }
    }

    /// Whether some scoped path lies strictly below `ancestor`.
    pub fn is_beneath(&self, ancestor: &str) -> bool {
        match self {
            Scope::All => false,
            Scope::Paths(paths) => paths.iter().any(|s| path::is_ancestor(ancestor, s)),
        }
    }
}

/// Outcome of applying one feed response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Nodes whose annotation was set from a feed entry.
    pub applied: usize,
    /// In-scope nodes reset because a snapshot omitted them.
    pub reset: usize,
    /// Feed entries ignored because they fell outside the requested scope.
    pub out_of_scope: usize,
    /// Raw feed keys that matched no node.
    pub dropped: Vec<String>,
}

/// Apply a primary-status feed. Snapshot omissions reset files to clean.
///
/// A status reported for a directory (`?? scratch/`) also applies to every
/// file beneath it that the feed does not list on its own.
pub fn apply_primary(
    tree: &mut FileTree,
    feed: &PrimaryFeed,
    feed_paths: &FeedPaths,
    scope: &Scope,
) -> ReconcileReport {
    reconcile(tree, feed, feed_paths, scope, ResetPolicy {
        value: PrimaryStatus::Clean,
        include_directories: false,
        inherit_to_leaves: true,
        assign: |node, status| node.primary_status = Some(status),
    })
}

/// Apply a tracked-flag feed. Snapshot omissions reset any node to untracked.
pub fn apply_tracked(
    tree: &mut FileTree,
    feed: &TrackedFeed,
    feed_paths: &FeedPaths,
    scope: &Scope,
) -> ReconcileReport {
    reconcile(tree, feed, feed_paths, scope, ResetPolicy {
        value: false,
        include_directories: true,
        inherit_to_leaves: false,
        assign: |node, tracked| node.tracked = tracked,
    })
}

struct ResetPolicy<T> {
    value: T,
    include_directories: bool,
    /// Directory entries are pushed down to unlisted leaves.
    inherit_to_leaves: bool,
    assign: fn(&mut TreeNode, T),
}

fn reconcile<T: Copy>(
    tree: &mut FileTree,
    feed: &StatusFeed<T>,
    feed_paths: &FeedPaths,
    scope: &Scope,
    policy: ResetPolicy<T>,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    let mut seen: HashSet<String> = HashSet::new();
    let mut directories: Vec<(String, T)> = Vec::new();

    for entry in &feed.entries {
        let Some(normalized) = feed_paths.normalize(&entry.path) else {
            tracing::debug!(path = %entry.path, "status path does not map into the tree");
            report.dropped.push(entry.path.clone());
            continue;
        };
        let target = feed_paths.resolve(tree, &normalized);
        let key = target.as_deref().unwrap_or(&normalized);
        if !scope.contains(key) {
            // A directory above the scope still reaches the leaves inside it.
            let reaches = policy.inherit_to_leaves
                && scope.is_beneath(key)
                && tree.get(key).is_some_and(|n| n.is_directory);
            if reaches {
                directories.push((key.to_string(), entry.value));
            } else {
                report.out_of_scope += 1;
            }
            continue;
        }
        let Some(target) = target else {
            tracing::debug!(path = %entry.path, %normalized, "status path matches no node");
            report.dropped.push(entry.path.clone());
            continue;
        };
        if let Some(node) = tree.get_mut(&target) {
            (policy.assign)(node, entry.value);
            report.applied += 1;
            if policy.inherit_to_leaves && node.is_directory {
                directories.push((target.clone(), entry.value));
            }
            seen.insert(target);
        }
    }

    // Explicit entries win over anything inherited from a directory.
    let mut inherited: HashSet<String> = HashSet::new();
    for (dir, value) in directories {
        let leaves: Vec<String> = match tree.get(&dir) {
            Some(node) => descendants(node, path::parent(&dir))
                .filter(|(p, n)| n.is_leaf() && !seen.contains(p) && scope.contains(p))
                .map(|(p, _)| p)
                .collect(),
            None => continue,
        };
        for leaf in leaves {
            if let Some(node) = tree.get_mut(&leaf) {
                (policy.assign)(node, value);
                inherited.insert(leaf);
            }
        }
    }

    if feed.kind == FeedKind::Snapshot {
        let omitted: Vec<String> = nodes_in_scope(tree, scope, policy.include_directories)
            .into_iter()
            .filter(|p| !seen.contains(p) && !inherited.contains(p))
            .collect();
        for target in omitted {
            if let Some(node) = tree.get_mut(&target) {
                (policy.assign)(node, policy.value);
                report.reset += 1;
            }
        }
    }

    report
}

/// Paths of the nodes covered by `scope`.
fn nodes_in_scope(tree: &FileTree, scope: &Scope, include_directories: bool) -> Vec<String> {
    let keep = |node: &TreeNode| include_directories || node.is_leaf();
    match scope {
        Scope::All => descendants(tree.root(), "")
            .filter(|(_, n)| keep(n))
            .map(|(p, _)| p)
            .collect(),
        Scope::Paths(paths) => {
            let mut out = Vec::new();
            let mut covered: HashSet<String> = HashSet::new();
            for scope_path in paths {
                let Some(node) = tree.get(scope_path) else {
                    continue;
                };
                if keep(node) && covered.insert(scope_path.clone()) {
                    out.push(scope_path.clone());
                }
                for (p, n) in descendants(node, path::parent(scope_path)) {
                    if keep(n) && covered.insert(p.clone()) {
                        out.push(p);
                    }
                }
            }
            out
        }
    }
}
