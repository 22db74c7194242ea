use crate::path;
use crate::tree::TreeNode;

/// Pre-order iterator over every descendant of a node, yielding each
/// descendant's full path alongside the node.
///
/// Uses an explicit stack, so depth is bounded by heap rather than the call
/// stack.
pub struct Descendants<'a> {
    stack: Vec<(String, &'a TreeNode)>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = (String, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (full_path, node) = self.stack.pop()?;
        push_children(&mut self.stack, &full_path, node);
        Some((full_path, node))
    }
}

fn push_children<'a>(stack: &mut Vec<(String, &'a TreeNode)>, base: &str, node: &'a TreeNode) {
    // Reverse so the first child is popped first.
    for child in node.children().iter().rev() {
        stack.push((path::join(base, &child.name), child));
    }
}

/// Iterate the descendants of `node`, which lives under `prefix`.
///
/// `prefix` is the parent's path (empty for top-level nodes and for the
/// synthetic root). The node itself is not yielded.
pub fn descendants<'a>(node: &'a TreeNode, prefix: &str) -> Descendants<'a> {
    let base = path::join(prefix, &node.name);
    let mut stack = Vec::new();
    push_children(&mut stack, &base, node);
    Descendants { stack }
}

/// Full paths of every descendant file and directory of `node`.
pub fn descendant_paths(node: &TreeNode, prefix: &str) -> Vec<String> {
    descendants(node, prefix).map(|(p, _)| p).collect()
}
