//! Tracked flag derived from sidecar files.
//!
//! A path is tracked when a sibling `<path>.<suffix>` exists next to it, the
//! way large-object tools such as DVC leave a small pointer file beside the
//! data they manage.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use walkdir::WalkDir;

use crate::error::{FennError, Result};
use crate::path;
use crate::status::{FeedEntry, SecondaryStatusProvider, StatusFeed, TrackedFeed};

pub const DEFAULT_SIDECAR_SUFFIX: &str = "dvc";

#[derive(Debug, Clone)]
pub struct SidecarTrackedProvider {
    suffix: String,
    ignore: Vec<String>,
}

impl SidecarTrackedProvider {
    pub fn new(suffix: impl Into<String>, ignore: Vec<String>) -> Self {
        let suffix = suffix.into();
        Self {
            suffix: suffix.trim_start_matches('.').to_string(),
            ignore,
        }
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl Default for SidecarTrackedProvider {
    fn default() -> Self {
        Self::new(DEFAULT_SIDECAR_SUFFIX, Vec::new())
    }
}

#[async_trait]
impl SecondaryStatusProvider for SidecarTrackedProvider {
    async fn get_status(&self, root: &Path, paths: Option<&[String]>) -> Result<TrackedFeed> {
        let root = root.to_path_buf();
        let suffix = self.suffix.clone();
        let ignore = self.ignore.clone();
        let paths = paths.map(|p| p.to_vec());

        let entries = tokio::task::spawn_blocking(move || -> Result<Vec<FeedEntry<bool>>> {
            let Some(paths) = paths else {
                return scan(&root, &root, &suffix, &ignore);
            };
            let mut entries = Vec::new();
            for p in paths {
                if sidecar_for(&root, &p, &suffix).is_file() {
                    entries.push(FeedEntry::new(p.clone(), true));
                }
                let dir = root.join(&p);
                if dir.is_dir() {
                    entries.extend(scan(&root, &dir, &suffix, &ignore)?);
                }
            }
            Ok(entries)
        })
        .await
        .map_err(|e| FennError::Io(std::io::Error::other(e)))??;

        tracing::debug!(tracked = entries.len(), "sidecar scan complete");
        Ok(StatusFeed::snapshot(entries))
    }
}

fn sidecar_for(root: &Path, rel: &str, suffix: &str) -> PathBuf {
    root.join(format!("{}.{}", rel, suffix))
}

/// Walk `base` (inside `root`) and report every path that has a sidecar.
fn scan(root: &Path, base: &Path, suffix: &str, ignore: &[String]) -> Result<Vec<FeedEntry<bool>>> {
    let ending = format!(".{}", suffix);
    let mut entries = Vec::new();

    let walker = WalkDir::new(base)
        .follow_links(false)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            !(e.file_type().is_dir() && ignore.iter().any(|i| i.as_str() == name))
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry during sidecar scan");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let rel = rel.to_string_lossy();
        let Some(data) = rel.strip_suffix(ending.as_str()) else {
            continue;
        };
        if let Some(data) = path::normalize(data) {
            entries.push(FeedEntry::new(data, true));
        }
    }
    Ok(entries)
}
