//! Root-relative path strings.
//!
//! Every path the engine stores is a root-relative, `/`-separated string with
//! no empty, `.` or `..` segments. These helpers produce and compare paths in
//! that form; they never touch the filesystem.

/// Separator used by all tree paths regardless of platform.
pub const SEPARATOR: char = '/';

/// Normalize a raw path into canonical root-relative form.
///
/// Backslashes become `/`, leading `./` and `/` are dropped, repeated
/// separators collapse. Returns `None` when nothing is left or when the path
/// tries to climb out of the root with `..`.
pub fn normalize(raw: &str) -> Option<String> {
    let unified = raw.replace('\\', "/");
    let mut segments = Vec::new();
    for segment in unified.split(SEPARATOR) {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

/// Join a parent path and a child name. An empty parent is the root.
pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", parent, SEPARATOR, name)
    }
}

/// Parent of a canonical path; the root's direct children return `""`.
pub fn parent(path: &str) -> &str {
    match path.rfind(SEPARATOR) {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Final segment of a canonical path.
pub fn file_name(path: &str) -> &str {
    match path.rfind(SEPARATOR) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Whether `ancestor` contains `path`, anchored on the separator boundary.
///
/// `data` contains `data/raw` but not `database/x`, and a path is not its own
/// ancestor.
pub fn is_ancestor(ancestor: &str, path: &str) -> bool {
    if ancestor.is_empty() {
        return !path.is_empty();
    }
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path[ancestor.len()..].starts_with(SEPARATOR)
}

/// Whether `path` equals `scope` or lies beneath it.
pub fn is_within(scope: &str, path: &str) -> bool {
    scope == path || is_ancestor(scope, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_prefixes_and_separators() {
        assert_eq!(normalize("./a/b.txt").as_deref(), Some("a/b.txt"));
        assert_eq!(normalize("/a//b/").as_deref(), Some("a/b"));
        assert_eq!(normalize("a\\b\\c.csv").as_deref(), Some("a/b/c.csv"));
    }

    #[test]
    fn normalize_rejects_empty_and_parent_segments() {
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("/"), None);
        assert_eq!(normalize("./."), None);
        assert_eq!(normalize("a/../b"), None);
    }

    #[test]
    fn join_and_split() {
        assert_eq!(join("", "a"), "a");
        assert_eq!(join("a/b", "c.txt"), "a/b/c.txt");
        assert_eq!(parent("a/b/c.txt"), "a/b");
        assert_eq!(parent("a"), "");
        assert_eq!(file_name("a/b/c.txt"), "c.txt");
        assert_eq!(file_name("a"), "a");
    }

    #[test]
    fn ancestor_is_separator_anchored() {
        assert!(is_ancestor("data", "data/raw"));
        assert!(is_ancestor("data", "data/raw/x.csv"));
        assert!(!is_ancestor("data", "database/x"));
        assert!(!is_ancestor("data", "data"));
        assert!(!is_ancestor("data/raw", "data"));
        assert!(is_ancestor("", "anything"));
    }

    #[test]
    fn within_includes_self() {
        assert!(is_within("a/b", "a/b"));
        assert!(is_within("a/b", "a/b/c"));
        assert!(!is_within("a/b", "a/bc"));
    }
}
