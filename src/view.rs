//! Flattened, scrollable presentation of a `FileTree`.
//!
//! Expansion state is keyed by path, so it survives rebuilds and status
//! refreshes as long as the paths do. Hidden-name filtering and dirs-first
//! ordering happen here only; the tree itself always holds every entry.

use std::collections::HashSet;

use crate::path;
use crate::status::PrimaryStatus;
use crate::tree::{FileTree, TreeNode};

/// A flattened row ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatItem {
    pub path: String,
    pub name: String,
    pub depth: usize,
    pub is_directory: bool,
    pub is_expanded: bool,
    pub is_last_sibling: bool,
    pub is_hidden: bool,
    pub size: u64,
    pub primary_status: Option<PrimaryStatus>,
    pub tracked: bool,
}

/// State for the tree view.
#[derive(Debug, Clone)]
pub struct TreeView {
    pub flat_items: Vec<FlatItem>,
    pub selected_index: usize,
    pub scroll_offset: usize,
    pub show_hidden: bool,
    pub dirs_first: bool,
    expanded: HashSet<String>,
}

impl TreeView {
    pub fn new(show_hidden: bool, dirs_first: bool) -> Self {
        Self {
            flat_items: Vec::new(),
            selected_index: 0,
            scroll_offset: 0,
            show_hidden,
            dirs_first,
            expanded: HashSet::new(),
        }
    }

    /// Rebuild the rows from `tree`, keeping the cursor on the same path when
    /// it still exists.
    pub fn flatten(&mut self, tree: &FileTree) {
        let keep = self.selected_path().map(str::to_string);
        self.flat_items.clear();

        // (node, parent path, depth, is_last)
        let mut stack: Vec<(&TreeNode, String, usize, bool)> = Vec::new();
        self.push_visible_children(&mut stack, tree.root(), "", 0);

        while let Some((node, parent, depth, is_last)) = stack.pop() {
            let full = path::join(&parent, &node.name);
            let is_expanded = node.is_directory && self.expanded.contains(&full);
            if is_expanded {
                self.push_visible_children(&mut stack, node, &full, depth + 1);
            }
            self.flat_items.push(FlatItem {
                name: node.name.clone(),
                depth,
                is_directory: node.is_directory,
                is_expanded,
                is_last_sibling: is_last,
                is_hidden: node.name.starts_with('.'),
                size: node.size,
                primary_status: node.primary_status,
                tracked: node.tracked,
                path: full,
            });
        }

        match keep.and_then(|p| self.find_index_by_path(&p)) {
            Some(idx) => self.selected_index = idx,
            None => self.clamp_selection(),
        }
    }

    fn push_visible_children<'a>(
        &self,
        stack: &mut Vec<(&'a TreeNode, String, usize, bool)>,
        node: &'a TreeNode,
        base: &str,
        depth: usize,
    ) {
        let mut children: Vec<&TreeNode> = node
            .children()
            .iter()
            .filter(|c| self.show_hidden || !c.name.starts_with('.'))
            .collect();
        let dirs_first = self.dirs_first;
        children.sort_by(|a, b| {
            let mut cmp = std::cmp::Ordering::Equal;
            if dirs_first {
                cmp = b.is_directory.cmp(&a.is_directory);
            }
            cmp.then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
                .then_with(|| a.name.cmp(&b.name))
        });

        let last = children.len().saturating_sub(1);
        // Reverse so the first child is popped first.
        for (i, child) in children.into_iter().enumerate().rev() {
            stack.push((child, base.to_string(), depth, i == last));
        }
    }

    fn clamp_selection(&mut self) {
        if self.flat_items.is_empty() {
            self.selected_index = 0;
        } else if self.selected_index >= self.flat_items.len() {
            self.selected_index = self.flat_items.len() - 1;
        }
    }

    pub fn selected_item(&self) -> Option<&FlatItem> {
        self.flat_items.get(self.selected_index)
    }

    pub fn selected_path(&self) -> Option<&str> {
        self.selected_item().map(|item| item.path.as_str())
    }

    pub fn find_index_by_path(&self, target: &str) -> Option<usize> {
        self.flat_items.iter().position(|item| item.path == target)
    }

    pub fn is_expanded(&self, target: &str) -> bool {
        self.expanded.contains(target)
    }

    /// Expand the selected directory.
    pub fn expand_selected(&mut self, tree: &FileTree) {
        let Some(item) = self.selected_item() else {
            return;
        };
        if !item.is_directory || item.is_expanded {
            return;
        }
        let target = item.path.clone();
        self.expanded.insert(target);
        self.flatten(tree);
    }

    /// Collapse the selected directory, or jump to its parent.
    pub fn collapse_selected(&mut self, tree: &FileTree) {
        let Some(item) = self.selected_item() else {
            return;
        };
        if item.is_directory && item.is_expanded {
            let target = item.path.clone();
            self.expanded.remove(&target);
            self.flatten(tree);
            return;
        }
        let parent = path::parent(&item.path).to_string();
        if let Some(idx) = self.find_index_by_path(&parent) {
            self.selected_index = idx;
        }
    }

    /// Expand every directory in the tree.
    pub fn expand_all(&mut self, tree: &FileTree) {
        self.expanded = crate::tree::descendants(tree.root(), "")
            .filter(|(_, node)| node.is_directory)
            .map(|(p, _)| p)
            .collect();
        self.flatten(tree);
    }

    pub fn collapse_all(&mut self, tree: &FileTree) {
        self.expanded.clear();
        self.selected_index = 0;
        self.scroll_offset = 0;
        self.flatten(tree);
    }

    /// Expand every ancestor of `target` and move the cursor onto it.
    pub fn reveal(&mut self, tree: &FileTree, target: &str) {
        let mut current = path::parent(target);
        while !current.is_empty() {
            self.expanded.insert(current.to_string());
            current = path::parent(current);
        }
        self.flatten(tree);
        if let Some(idx) = self.find_index_by_path(target) {
            self.selected_index = idx;
        }
    }

    pub fn toggle_hidden(&mut self, tree: &FileTree) {
        self.show_hidden = !self.show_hidden;
        self.flatten(tree);
    }

    pub fn toggle_dirs_first(&mut self, tree: &FileTree) {
        self.dirs_first = !self.dirs_first;
        self.flatten(tree);
    }

    pub fn select_next(&mut self) {
        if self.selected_index + 1 < self.flat_items.len() {
            self.selected_index += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }

    pub fn select_first(&mut self) {
        self.selected_index = 0;
    }

    pub fn select_last(&mut self) {
        self.selected_index = self.flat_items.len().saturating_sub(1);
    }

    /// Update the scroll offset so the selected row is visible.
    pub fn update_scroll(&mut self, visible_height: usize) {
        if visible_height == 0 {
            return;
        }
        if self.selected_index < self.scroll_offset {
            self.scroll_offset = self.selected_index;
        } else if self.selected_index >= self.scroll_offset + visible_height {
            self.scroll_offset = self.selected_index - visible_height + 1;
        }
    }
}

/// Human-readable byte size.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
