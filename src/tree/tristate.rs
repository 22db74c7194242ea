use std::collections::BTreeSet;

use crate::path;
use crate::tree::{descendants, TreeNode};

/// Selection summary for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriState {
    Clear,
    Indeterminate,
    Full,
}

/// Leaf totals beneath a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LeafCount {
    pub total: usize,
    pub selected: usize,
}

/// Count the leaf descendants of `node` and how many of them are selected.
pub fn leaf_count(node: &TreeNode, prefix: &str, selection: &BTreeSet<String>) -> LeafCount {
    descendants(node, prefix)
        .filter(|(_, n)| n.is_leaf())
        .fold(LeafCount::default(), |mut acc, (p, _)| {
            acc.total += 1;
            if selection.contains(&p) {
                acc.selected += 1;
            }
            acc
        })
}

/// Derive the tri-state of `node` (living under `prefix`) from the current
/// selection. Files are full or clear by their own membership; directories
/// are summarized from their leaves only.
pub fn tri_state(node: &TreeNode, prefix: &str, selection: &BTreeSet<String>) -> TriState {
    if node.is_leaf() {
        return if selection.contains(&path::join(prefix, &node.name)) {
            TriState::Full
        } else {
            TriState::Clear
        };
    }

    let count = leaf_count(node, prefix, selection);
    if count.selected == 0 {
        TriState::Clear
    } else if count.selected == count.total {
        TriState::Full
    } else {
        TriState::Indeterminate
    }
}
