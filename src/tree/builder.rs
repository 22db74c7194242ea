use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::path;
use crate::tree::{FileEntry, FileTree, TreeNode};

/// Why an entry was left out of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The path has no usable segment, or climbs out of the root.
    Malformed,
    /// An ancestor of the path is a file, not a directory.
    ParentIsFile(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Malformed => write!(f, "malformed path"),
            SkipReason::ParentIsFile(parent) => write!(f, "ancestor '{}' is a file", parent),
        }
    }
}

/// An entry dropped during construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub path: String,
    pub reason: SkipReason,
}

/// Result of building a tree: the tree plus every entry that was dropped.
#[derive(Debug, Clone)]
pub struct TreeBuild {
    pub tree: FileTree,
    pub skipped: Vec<SkippedEntry>,
}

/// Arena slot used while the tree is assembled.
struct Slot {
    node: TreeNode,
    children: Vec<usize>,
}

/// Build a `FileTree` from an unordered flat listing.
///
/// Entries are keyed by their normalized path, so a later duplicate replaces
/// an earlier one. Missing intermediate directories are synthesized as bare
/// directory nodes. Malformed entries are skipped and reported, never fatal.
pub fn build_tree(entries: Vec<FileEntry>) -> TreeBuild {
    let total = entries.len();
    let mut skipped = Vec::new();

    // BTreeMap gives lexicographic order and last-wins on duplicate keys.
    let mut unique: BTreeMap<String, FileEntry> = BTreeMap::new();
    for entry in entries {
        match path::normalize(&entry.path) {
            Some(normalized) => {
                if unique.contains_key(&normalized) {
                    tracing::debug!(path = %normalized, "duplicate entry, keeping the later one");
                }
                unique.insert(normalized, entry);
            }
            None => {
                tracing::warn!(path = %entry.path, "skipping entry with malformed path");
                skipped.push(SkippedEntry {
                    path: entry.path,
                    reason: SkipReason::Malformed,
                });
            }
        }
    }

    let mut arena = vec![Slot {
        node: TreeNode::directory(""),
        children: Vec::new(),
    }];
    let mut index: HashMap<String, usize> = HashMap::new();

    for (full_path, entry) in unique {
        let parent_idx = match ensure_directory(&mut arena, &mut index, path::parent(&full_path)) {
            Ok(idx) => idx,
            Err(blocker) => {
                tracing::warn!(path = %full_path, parent = %blocker, "skipping entry under a file");
                skipped.push(SkippedEntry {
                    path: full_path,
                    reason: SkipReason::ParentIsFile(blocker),
                });
                continue;
            }
        };

        let node = TreeNode::from_entry(path::file_name(&full_path), &entry);
        let idx = arena.len();
        arena.push(Slot {
            node,
            children: Vec::new(),
        });
        arena[parent_idx].children.push(idx);
        index.insert(full_path, idx);
    }

    let node_count = arena.len() - 1;
    let tree = FileTree::from_root(assemble(arena));
    tracing::info!(
        entries = total,
        nodes = node_count,
        skipped = skipped.len(),
        "built file tree"
    );
    TreeBuild { tree, skipped }
}

/// Return the arena index of the directory at `dir_path`, synthesizing any
/// missing directories on the way. Fails with the offending path when some
/// prefix is already a file.
fn ensure_directory(
    arena: &mut Vec<Slot>,
    index: &mut HashMap<String, usize>,
    dir_path: &str,
) -> std::result::Result<usize, String> {
    if dir_path.is_empty() {
        return Ok(0);
    }
    if let Some(&idx) = index.get(dir_path) {
        return if arena[idx].node.is_directory {
            Ok(idx)
        } else {
            Err(dir_path.to_string())
        };
    }

    let mut current = 0;
    let mut walked = String::new();
    for segment in dir_path.split(path::SEPARATOR) {
        walked = path::join(&walked, segment);
        current = match index.get(&walked) {
            Some(&idx) if arena[idx].node.is_directory => idx,
            Some(_) => return Err(walked),
            None => {
                tracing::trace!(path = %walked, "synthesizing implicit directory");
                let idx = arena.len();
                arena.push(Slot {
                    node: TreeNode::directory(segment),
                    children: Vec::new(),
                });
                arena[current].children.push(idx);
                index.insert(walked.clone(), idx);
                idx
            }
        };
    }
    Ok(current)
}

/// Turn the arena into an owned tree.
///
/// A child is always pushed after its parent, so walking the arena backwards
/// finishes every child before its parent needs it.
fn assemble(arena: Vec<Slot>) -> TreeNode {
    let mut built: Vec<Option<TreeNode>> = Vec::with_capacity(arena.len());
    built.resize_with(arena.len(), || None);

    for (idx, slot) in arena.into_iter().enumerate().rev() {
        let Slot { mut node, children } = slot;
        if node.is_directory {
            let mut kids: Vec<TreeNode> = children
                .iter()
                .filter_map(|&child| built[child].take())
                .collect();
            kids.sort_by(|a, b| a.name.cmp(&b.name));
            node.children = Some(kids);
        }
        built[idx] = Some(node);
    }

    built
        .first_mut()
        .and_then(Option::take)
        .unwrap_or_else(|| TreeNode::directory(""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::PrimaryStatus;
    use std::collections::BTreeSet;

    fn names(node: &TreeNode) -> Vec<&str> {
        node.children().iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn empty_input_yields_empty_root() {
        let build = build_tree(Vec::new());
        assert!(build.tree.is_empty());
        assert!(build.skipped.is_empty());
    }

    #[test]
    fn round_trip_preserves_path_set() {
        let input = vec![
            "README.md",
            "data",
            "data/raw",
            "data/raw/a.csv",
            "data/raw/b.csv",
            "database",
            "database/x",
            "models",
            "models/x.pkl",
        ];
        let entries = input
            .iter()
            .map(|p| {
                if p.contains('.') || *p == "database/x" {
                    FileEntry::file(*p, 1)
                } else {
                    FileEntry::directory(*p)
                }
            })
            .collect();

        let build = build_tree(entries);
        let rebuilt: BTreeSet<String> = build.tree.paths().into_iter().collect();
        let expected: BTreeSet<String> = input.iter().map(|s| s.to_string()).collect();
        assert_eq!(rebuilt, expected);
        assert!(build.skipped.is_empty());
    }

    #[test]
    fn unordered_input_builds_same_tree() {
        let ordered = build_tree(vec![
            FileEntry::directory("a"),
            FileEntry::file("a/1.txt", 1),
            FileEntry::file("b.txt", 2),
        ]);
        let shuffled = build_tree(vec![
            FileEntry::file("b.txt", 2),
            FileEntry::file("a/1.txt", 1),
            FileEntry::directory("a"),
        ]);
        assert_eq!(ordered.tree, shuffled.tree);
    }

    #[test]
    fn implicit_directories_are_synthesized() {
        let build = build_tree(vec![FileEntry::file("a/b/c.txt", 7)]);
        let tree = &build.tree;

        let a = tree.get("a").expect("a synthesized");
        assert!(a.is_directory);
        assert_eq!(a.size, 0);
        assert_eq!(a.primary_status, None);

        let b = tree.get("a/b").expect("a/b synthesized");
        assert!(b.is_directory);
        assert_eq!(names(b), vec!["c.txt"]);
        assert_eq!(tree.get("a/b/c.txt").unwrap().size, 7);
    }

    #[test]
    fn duplicate_paths_last_occurrence_wins() {
        let build = build_tree(vec![
            FileEntry::file("x.csv", 1).with_status(PrimaryStatus::Modified),
            FileEntry::file("x.csv", 99).with_status(PrimaryStatus::Staged),
        ]);
        let node = build.tree.get("x.csv").unwrap();
        assert_eq!(node.size, 99);
        assert_eq!(node.primary_status, Some(PrimaryStatus::Staged));
        assert_eq!(build.tree.len(), 1);
    }

    #[test]
    fn duplicate_can_turn_file_into_directory() {
        let build = build_tree(vec![
            FileEntry::file("a", 1),
            FileEntry::directory("a"),
            FileEntry::file("a/b.txt", 1),
        ]);
        assert!(build.tree.get("a").unwrap().is_directory);
        assert!(build.tree.contains("a/b.txt"));
        assert!(build.skipped.is_empty());
    }

    #[test]
    fn malformed_paths_are_skipped_not_fatal() {
        let build = build_tree(vec![
            FileEntry::file("", 1),
            FileEntry::file("/", 1),
            FileEntry::file("../escape.txt", 1),
            FileEntry::file("ok.txt", 1),
        ]);
        assert_eq!(build.tree.paths(), vec!["ok.txt".to_string()]);
        assert_eq!(build.skipped.len(), 3);
        assert!(build
            .skipped
            .iter()
            .all(|s| s.reason == SkipReason::Malformed));
    }

    #[test]
    fn entries_under_a_file_are_skipped() {
        let build = build_tree(vec![
            FileEntry::file("notes", 1),
            FileEntry::file("notes/inner.txt", 1),
        ]);
        assert!(build.tree.get("notes").unwrap().is_leaf());
        assert!(!build.tree.contains("notes/inner.txt"));
        assert_eq!(
            build.skipped,
            vec![SkippedEntry {
                path: "notes/inner.txt".into(),
                reason: SkipReason::ParentIsFile("notes".into()),
            }]
        );
    }

    #[test]
    fn separators_are_normalized() {
        let build = build_tree(vec![
            FileEntry::file("./src\\main.rs", 1),
            FileEntry::file("/src/lib.rs", 1),
        ]);
        let src = build.tree.get("src").unwrap();
        assert_eq!(names(src), vec!["lib.rs", "main.rs"]);
    }

    #[test]
    fn hidden_names_are_kept_in_the_model() {
        let build = build_tree(vec![
            FileEntry::file(".env", 1),
            FileEntry::file(".config/settings.toml", 1),
        ]);
        assert!(build.tree.contains(".env"));
        assert!(build.tree.contains(".config/settings.toml"));
    }

    #[test]
    fn children_sorted_by_name_regardless_of_dash_ordering() {
        // "a-x" sorts before "a/..." bytewise; the implicit "a" must still be
        // found by lookup after assembly.
        let build = build_tree(vec![
            FileEntry::file("a-x", 1),
            FileEntry::file("a/inner.txt", 1),
            FileEntry::file("a.txt", 1),
        ]);
        assert_eq!(names(build.tree.root()), vec!["a", "a-x", "a.txt"]);
        assert!(build.tree.contains("a/inner.txt"));
    }
}
