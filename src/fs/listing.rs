use std::path::{Path, PathBuf};

use async_trait::async_trait;
use walkdir::WalkDir;

use crate::error::{FennError, Result};
use crate::path;
use crate::tree::FileEntry;

/// Directory names skipped while listing a root.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[".git", "node_modules", "target", "dist", "build"];

/// Source of the flat listing a tree is built from.
#[async_trait]
pub trait FileEntryProvider: Send + Sync {
    /// List every entry beneath `root`, as root-relative paths.
    ///
    /// Fails with `NotFound` when the root is missing and `Io` when the
    /// listing cannot be read.
    async fn list_entries(&self, root: &Path) -> Result<Vec<FileEntry>>;
}

/// Lists a directory recursively from the local filesystem.
///
/// Symlinks are not followed and not listed. Sidecar files are left out since
/// they surface as the tracked flag on the path they describe. Dot-files are
/// kept; hiding them is up to the view.
#[derive(Debug, Clone)]
pub struct WalkDirProvider {
    ignore: Vec<String>,
    sidecar_suffix: Option<String>,
}

impl Default for WalkDirProvider {
    fn default() -> Self {
        Self::new(DEFAULT_IGNORE_PATTERNS.iter().map(|s| s.to_string()).collect())
    }
}

impl WalkDirProvider {
    pub fn new(ignore: Vec<String>) -> Self {
        Self {
            ignore,
            sidecar_suffix: None,
        }
    }

    /// Leave out files ending in `.<suffix>`.
    pub fn with_sidecar_suffix(mut self, suffix: Option<String>) -> Self {
        self.sidecar_suffix = suffix
            .map(|s| s.trim_start_matches('.').to_string())
            .filter(|s| !s.is_empty());
        self
    }

    fn list_blocking(&self, root: &Path) -> Result<Vec<FileEntry>> {
        if !root.is_dir() {
            return Err(FennError::NotFound(root.to_path_buf()));
        }

        let sidecar_ending = self.sidecar_suffix.as_ref().map(|s| format!(".{}", s));
        let mut entries = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| {
                let name = e.file_name().to_string_lossy();
                !(e.file_type().is_dir() && self.ignore.iter().any(|i| i.as_str() == name))
            });

        for entry in walker {
            let entry = entry.map_err(|e| {
                let at = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                match e.into_io_error() {
                    Some(io) => FennError::Io(std::io::Error::new(
                        io.kind(),
                        format!("{}: {}", at.display(), io),
                    )),
                    None => FennError::Io(std::io::Error::other(format!(
                        "filesystem loop at {}",
                        at.display()
                    ))),
                }
            })?;

            let file_type = entry.file_type();
            if file_type.is_symlink() {
                continue;
            }
            let is_directory = file_type.is_dir();
            let name = entry.file_name().to_string_lossy();
            if !is_directory {
                if let Some(ending) = &sidecar_ending {
                    if name.ends_with(ending.as_str()) {
                        continue;
                    }
                }
            }

            let Some(rel) = relative(root, entry.path()) else {
                continue;
            };
            if is_directory {
                entries.push(FileEntry::directory(rel));
            } else {
                let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                entries.push(FileEntry::file(rel, size));
            }
        }

        tracing::debug!(root = %root.display(), entries = entries.len(), "listed root");
        Ok(entries)
    }
}

fn relative(root: &Path, full: &Path) -> Option<String> {
    let rel = full.strip_prefix(root).ok()?;
    path::normalize(&rel.to_string_lossy())
}

#[async_trait]
impl FileEntryProvider for WalkDirProvider {
    async fn list_entries(&self, root: &Path) -> Result<Vec<FileEntry>> {
        let provider = self.clone();
        let root: PathBuf = root.to_path_buf();
        tokio::task::spawn_blocking(move || provider.list_blocking(&root))
            .await
            .map_err(|e| FennError::Io(std::io::Error::other(e)))?
    }
}
