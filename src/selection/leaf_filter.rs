use std::collections::BTreeSet;

/// Reduce a selection to the paths that have no selected descendant.
///
/// When both a directory and something beneath it are present, only the more
/// specific path survives, so a batch action never receives an overlapping
/// ancestor and descendant. Containment is anchored on the separator: `data`
/// does not contain `database/x`. Output is sorted.
pub fn leaf_paths<I, S>(paths: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let set: BTreeSet<String> = paths
        .into_iter()
        .map(|p| p.as_ref().to_string())
        .filter(|p| !p.is_empty())
        .collect();

    set.iter()
        .filter(|p| {
            // Everything under `p/` sorts contiguously from `p/` onward.
            let prefix = format!("{}/", p);
            !set
                .range(prefix.clone()..)
                .next()
                .is_some_and(|next| next.starts_with(&prefix))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ancestor_dropped_for_descendant() {
        assert_eq!(
            leaf_paths(["data", "data/raw", "models/x.pkl"]),
            vec!["data/raw", "models/x.pkl"]
        );
    }

    #[test]
    fn sibling_with_shared_prefix_is_not_a_descendant() {
        assert_eq!(leaf_paths(["data", "database/x"]), vec!["data", "database/x"]);
    }

    #[test]
    fn deep_chains_keep_only_the_deepest() {
        assert_eq!(leaf_paths(["a", "a/b", "a/b/c", "a/d"]), vec!["a/b/c", "a/d"]);
    }

    #[test]
    fn dash_and_dot_siblings_do_not_hide_descendants() {
        // `a-b` and `a.c` sort between `a` and `a/`; the range lookup must
        // still find `a/x`.
        assert_eq!(leaf_paths(["a", "a-b", "a.c", "a/x"]), vec!["a-b", "a.c", "a/x"]);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(leaf_paths(Vec::<String>::new()).is_empty());
    }
}
