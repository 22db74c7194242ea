//! Durable backends for the selection set.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{FennError, Result};

/// The authoritative store of selected paths.
///
/// Mutating calls are not assumed idempotent; callers guard against repeats
/// themselves.
#[async_trait]
pub trait SelectionPersistence: Send + Sync {
    async fn load(&self) -> Result<Vec<String>>;
    async fn select(&self, path: &str) -> Result<()>;
    async fn deselect(&self, path: &str) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// In-process persistence for ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    paths: Mutex<BTreeSet<String>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: Mutex::new(paths.into_iter().map(Into::into).collect()),
        }
    }

    pub fn snapshot(&self) -> BTreeSet<String> {
        self.paths.lock().clone()
    }
}

#[async_trait]
impl SelectionPersistence for MemoryPersistence {
    async fn load(&self) -> Result<Vec<String>> {
        Ok(self.paths.lock().iter().cloned().collect())
    }

    async fn select(&self, path: &str) -> Result<()> {
        self.paths.lock().insert(path.to_string());
        Ok(())
    }

    async fn deselect(&self, path: &str) -> Result<()> {
        self.paths.lock().remove(path);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.paths.lock().clear();
        Ok(())
    }
}

/// On-disk layout of the selection file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SelectionFile {
    #[serde(default)]
    paths: BTreeSet<String>,
}

/// Selection persisted as a JSON document (`{"paths": [...]}`).
///
/// Every mutation is a read-modify-write of the whole file, serialized by an
/// async lock and committed by writing a temp file and renaming it over the
/// target.
#[derive(Debug)]
pub struct JsonFilePersistence {
    file: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFilePersistence {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    async fn read(&self) -> Result<SelectionFile> {
        match tokio::fs::read(&self.file).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(SelectionFile::default()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                FennError::persistence(format!("corrupt selection file {}: {}", self.file.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SelectionFile::default()),
            Err(e) => Err(FennError::persistence(format!(
                "cannot read {}: {}",
                self.file.display(),
                e
            ))),
        }
    }

    async fn write(&self, contents: &SelectionFile) -> Result<()> {
        let data = encode(&self.file, contents)?;
        let tmp = self.file.with_extension("json.tmp");
        let commit = async {
            if let Some(parent) = self.file.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&tmp, &data).await?;
            tokio::fs::rename(&tmp, &self.file).await
        };
        commit.await.map_err(|e| {
            FennError::persistence(format!("cannot write {}: {}", self.file.display(), e))
        })
    }

    async fn update(&self, change: impl FnOnce(&mut BTreeSet<String>) + Send) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut contents = self.read().await?;
        change(&mut contents.paths);
        self.write(&contents).await
    }
}

/// Serialize a document bound for `file`; failures surface as persistence errors.
fn encode<T: Serialize>(file: &Path, contents: &T) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(contents).map_err(|e| {
        FennError::persistence(format!("cannot encode {}: {}", file.display(), e))
    })
}

#[async_trait]
impl SelectionPersistence for JsonFilePersistence {
    async fn load(&self) -> Result<Vec<String>> {
        let _guard = self.write_lock.lock().await;
        Ok(self.read().await?.paths.into_iter().collect())
    }

    async fn select(&self, path: &str) -> Result<()> {
        self.update(|paths| {
            paths.insert(path.to_string());
        })
        .await
    }

    async fn deselect(&self, path: &str) -> Result<()> {
        self.update(|paths| {
            paths.remove(path);
        })
        .await
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write(&SelectionFile::default()).await
    }
}
