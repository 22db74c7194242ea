//! Hierarchical file tree built from a flat listing.
//!
//! The tree is owned by a synthetic root node with an empty name. Every
//! directory's children are kept sorted by name so that lookups by path can
//! binary-search each level instead of scanning siblings.

pub mod builder;
pub mod descendants;
pub mod tristate;

use serde::{Deserialize, Serialize};

use crate::path;
use crate::status::PrimaryStatus;

pub use builder::{build_tree, SkipReason, SkippedEntry, TreeBuild};
pub use descendants::{descendant_paths, descendants, Descendants};
pub use tristate::{leaf_count, tri_state, LeafCount, TriState};

/// One entry of a flat listing, as delivered by a `FileEntryProvider`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Root-relative, `/`-separated path.
    pub path: String,
    pub size: u64,
    pub is_directory: bool,
    #[serde(default)]
    pub primary_status: Option<PrimaryStatus>,
    #[serde(default)]
    pub tracked: bool,
}

impl FileEntry {
    /// A plain file entry with no annotations.
    pub fn file(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
            is_directory: false,
            primary_status: None,
            tracked: false,
        }
    }

    /// A plain directory entry with no annotations.
    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            size: 0,
            is_directory: true,
            primary_status: None,
            tracked: false,
        }
    }

    pub fn with_status(mut self, status: PrimaryStatus) -> Self {
        self.primary_status = Some(status);
        self
    }

    pub fn with_tracked(mut self, tracked: bool) -> Self {
        self.tracked = tracked;
        self
    }
}

/// A node in the file tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub name: String,
    pub size: u64,
    pub is_directory: bool,
    /// `Some` (possibly empty) for directories, `None` for files.
    pub children: Option<Vec<TreeNode>>,
    pub primary_status: Option<PrimaryStatus>,
    pub tracked: bool,
}

impl TreeNode {
    /// A bare directory node with no size or status.
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: 0,
            is_directory: true,
            children: Some(Vec::new()),
            primary_status: None,
            tracked: false,
        }
    }

    pub(crate) fn from_entry(name: &str, entry: &FileEntry) -> Self {
        Self {
            name: name.to_string(),
            size: entry.size,
            is_directory: entry.is_directory,
            children: entry.is_directory.then(Vec::new),
            primary_status: entry.primary_status,
            tracked: entry.tracked,
        }
    }

    /// Whether this node is a leaf (a file).
    pub fn is_leaf(&self) -> bool {
        !self.is_directory
    }

    /// Children of a directory; files have none.
    pub fn children(&self) -> &[TreeNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    fn child(&self, name: &str) -> Option<&TreeNode> {
        let children = self.children.as_ref()?;
        children
            .binary_search_by(|c| c.name.as_str().cmp(name))
            .ok()
            .map(|idx| &children[idx])
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut TreeNode> {
        let children = self.children.as_mut()?;
        match children.binary_search_by(|c| c.name.as_str().cmp(name)) {
            Ok(idx) => Some(&mut children[idx]),
            Err(_) => None,
        }
    }
}

/// The whole tree, owned by its synthetic root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTree {
    root: TreeNode,
}

impl Default for FileTree {
    fn default() -> Self {
        Self::empty()
    }
}

impl FileTree {
    /// A tree with no entries.
    pub fn empty() -> Self {
        Self {
            root: TreeNode::directory(""),
        }
    }

    pub(crate) fn from_root(root: TreeNode) -> Self {
        Self { root }
    }

    /// The synthetic root; its children are the top-level entries.
    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.children().is_empty()
    }

    /// Number of nodes, excluding the synthetic root.
    pub fn len(&self) -> usize {
        descendants(&self.root, "").count()
    }

    /// Look up a node by its root-relative path.
    pub fn get(&self, path: &str) -> Option<&TreeNode> {
        if path.is_empty() {
            return None;
        }
        let mut node = &self.root;
        for segment in path.split(path::SEPARATOR) {
            node = node.child(segment)?;
        }
        Some(node)
    }

    /// Mutable lookup by path, used for in-place annotation updates.
    pub fn get_mut(&mut self, path: &str) -> Option<&mut TreeNode> {
        if path.is_empty() {
            return None;
        }
        let mut node = &mut self.root;
        for segment in path.split(path::SEPARATOR) {
            node = node.child_mut(segment)?;
        }
        Some(node)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Every node path in pre-order.
    pub fn paths(&self) -> Vec<String> {
        descendant_paths(&self.root, "")
    }
}
