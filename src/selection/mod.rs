//! Local cache of the selected paths, kept in step with a persistence
//! backend.
//!
//! The backend is the source of truth. The local set changes only after every
//! backend request of an operation has succeeded, so a failed operation leaves
//! it exactly as it was. Paths with a toggle in flight are tracked in a pending
//! set; a second toggle on a pending path is ignored, not queued.

pub mod leaf_filter;
pub mod persistence;

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{FennError, Result};

pub use leaf_filter::leaf_paths;
pub use persistence::{JsonFilePersistence, MemoryPersistence, SelectionPersistence};

/// What a toggle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The path and this many paths in total were added.
    Selected(usize),
    /// The path and this many paths in total were removed.
    Deselected(usize),
    /// A toggle on the same path was already in flight.
    Ignored,
}

#[derive(Debug, Default)]
struct SelectionState {
    selected: BTreeSet<String>,
    pending: HashSet<String>,
    mounted: bool,
    mutated: bool,
}

pub struct SelectionStore {
    persistence: Arc<dyn SelectionPersistence>,
    state: Mutex<SelectionState>,
}

impl std::fmt::Debug for SelectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionStore")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

/// Clears a pending marker when the toggle finishes, however it finishes.
struct PendingGuard<'a> {
    state: &'a Mutex<SelectionState>,
    path: String,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().pending.remove(&self.path);
    }
}

impl SelectionStore {
    pub fn new(persistence: Arc<dyn SelectionPersistence>) -> Self {
        Self {
            persistence,
            state: Mutex::new(SelectionState::default()),
        }
    }

    /// Fetch the full selection and replace the local set with it.
    ///
    /// Allowed once, before any toggle or clear has started. A failed load
    /// leaves the store unmounted so it can be retried.
    pub async fn load(&self) -> Result<usize> {
        {
            let state = self.state.lock();
            if state.mounted || state.mutated {
                return Err(FennError::AlreadyMounted);
            }
        }

        let paths = self.persistence.load().await?;

        let mut state = self.state.lock();
        if state.mounted || state.mutated {
            tracing::warn!("discarding selection load that raced with a mutation");
            return Err(FennError::AlreadyMounted);
        }
        state.selected = paths.into_iter().collect();
        state.mounted = true;
        tracing::info!(selected = state.selected.len(), "selection loaded");
        Ok(state.selected.len())
    }

    /// Flip the selection of `path`, fanning out to `descendants`.
    ///
    /// Backend requests go out one at a time, `path` first. The local set is
    /// updated only after all of them succeed; on the first failure the error
    /// is returned and requests that already succeeded are left as the backend
    /// recorded them.
    pub async fn toggle(&self, path: &str, descendants: Vec<String>) -> Result<ToggleOutcome> {
        let selecting = {
            let mut state = self.state.lock();
            if !state.pending.insert(path.to_string()) {
                tracing::trace!(path, "toggle already in flight; ignoring");
                return Ok(ToggleOutcome::Ignored);
            }
            state.mutated = true;
            !state.selected.contains(path)
        };
        let _pending = PendingGuard {
            state: &self.state,
            path: path.to_string(),
        };

        let mut targets = Vec::with_capacity(descendants.len() + 1);
        targets.push(path.to_string());
        targets.extend(descendants);

        for target in &targets {
            let sent = if selecting {
                self.persistence.select(target).await
            } else {
                self.persistence.deselect(target).await
            };
            if let Err(e) = sent {
                tracing::warn!(path, failed = %target, error = %e, "toggle aborted");
                return Err(e);
            }
        }

        let count = targets.len();
        let mut state = self.state.lock();
        if selecting {
            state.selected.extend(targets);
            tracing::debug!(path, count, "selected");
            Ok(ToggleOutcome::Selected(count))
        } else {
            for target in &targets {
                state.selected.remove(target);
            }
            tracing::debug!(path, count, "deselected");
            Ok(ToggleOutcome::Deselected(count))
        }
    }

    /// Wipe the selection. The local set is emptied only if the backend agrees.
    pub async fn clear(&self) -> Result<()> {
        self.state.lock().mutated = true;
        self.persistence.clear().await?;
        self.state.lock().selected.clear();
        tracing::info!("selection cleared");
        Ok(())
    }

    /// Drop local entries for paths that no longer exist. The backend is not
    /// told; the entries simply stop being shown.
    pub fn prune(&self, exists: impl Fn(&str) -> bool) -> Vec<String> {
        let mut state = self.state.lock();
        let stale: Vec<String> = state
            .selected
            .iter()
            .filter(|p| !exists(p))
            .cloned()
            .collect();
        for p in &stale {
            state.selected.remove(p);
        }
        if !stale.is_empty() {
            tracing::info!(pruned = stale.len(), "pruned stale selection entries");
        }
        stale
    }

    pub fn selected(&self) -> BTreeSet<String> {
        self.state.lock().selected.clone()
    }

    /// Run `f` against the current selection without cloning it.
    pub fn with_selected<R>(&self, f: impl FnOnce(&BTreeSet<String>) -> R) -> R {
        f(&self.state.lock().selected)
    }

    pub fn is_selected(&self, path: &str) -> bool {
        self.state.lock().selected.contains(path)
    }

    pub fn is_pending(&self, path: &str) -> bool {
        self.state.lock().pending.contains(path)
    }

    pub fn pending(&self) -> HashSet<String> {
        self.state.lock().pending.clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.state.lock().mounted
    }

    pub fn len(&self) -> usize {
        self.state.lock().selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().selected.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Persistence fakes shared by the selection and workspace tests.

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::{Notify, Semaphore};

    use super::*;

    /// Memory persistence that counts requests and can fail on one path.
    #[derive(Default)]
    pub struct CountingPersistence {
        pub inner: MemoryPersistence,
        pub selects: AtomicUsize,
        pub deselects: AtomicUsize,
        pub fail_on: Mutex<Option<String>>,
        pub fail_load: Mutex<bool>,
        pub fail_clear: Mutex<bool>,
    }

    impl CountingPersistence {
        pub fn failing_on(path: &str) -> Self {
            let fake = Self::default();
            *fake.fail_on.lock() = Some(path.to_string());
            fake
        }

        fn check(&self, path: &str) -> Result<()> {
            if self.fail_on.lock().as_deref() == Some(path) {
                return Err(FennError::persistence(format!("rejected {}", path)));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl SelectionPersistence for CountingPersistence {
        async fn load(&self) -> Result<Vec<String>> {
            if *self.fail_load.lock() {
                return Err(FennError::persistence("backend offline"));
            }
            self.inner.load().await
        }

        async fn select(&self, path: &str) -> Result<()> {
            self.selects.fetch_add(1, Ordering::SeqCst);
            self.check(path)?;
            self.inner.select(path).await
        }

        async fn deselect(&self, path: &str) -> Result<()> {
            self.deselects.fetch_add(1, Ordering::SeqCst);
            self.check(path)?;
            self.inner.deselect(path).await
        }

        async fn clear(&self) -> Result<()> {
            if *self.fail_clear.lock() {
                return Err(FennError::persistence("clear rejected"));
            }
            self.inner.clear().await
        }
    }

    /// Persistence whose requests block until the test releases them.
    pub struct GatedPersistence {
        pub inner: CountingPersistence,
        pub entered: Notify,
        pub release: Semaphore,
    }

    impl GatedPersistence {
        pub fn new() -> Self {
            Self {
                inner: CountingPersistence::default(),
                entered: Notify::new(),
                release: Semaphore::new(0),
            }
        }

        async fn gate(&self) -> Result<()> {
            self.entered.notify_one();
            self.release
                .acquire()
                .await
                .map_err(FennError::persistence)?
                .forget();
            Ok(())
        }
    }

    #[async_trait]
    impl SelectionPersistence for GatedPersistence {
        async fn load(&self) -> Result<Vec<String>> {
            self.gate().await?;
            self.inner.load().await
        }

        async fn select(&self, path: &str) -> Result<()> {
            self.gate().await?;
            self.inner.select(path).await
        }

        async fn deselect(&self, path: &str) -> Result<()> {
            self.gate().await?;
            self.inner.deselect(path).await
        }

        async fn clear(&self) -> Result<()> {
            self.gate().await?;
            self.inner.clear().await
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::testing::{CountingPersistence, GatedPersistence};
    use super::*;

    fn store_with(persistence: Arc<dyn SelectionPersistence>) -> SelectionStore {
        SelectionStore::new(persistence)
    }

    fn children() -> Vec<String> {
        vec!["dir/a".into(), "dir/b".into()]
    }

    #[tokio::test]
    async fn load_replaces_local_set_once() {
        let backend = Arc::new(MemoryPersistence::with_paths(["x", "y"]));
        let store = store_with(backend);
        assert_eq!(store.load().await.unwrap(), 2);
        assert!(store.is_selected("x"));
        assert!(matches!(store.load().await, Err(FennError::AlreadyMounted)));
    }

    #[tokio::test]
    async fn failed_load_can_be_retried() {
        let backend = Arc::new(CountingPersistence::default());
        *backend.fail_load.lock() = true;
        let store = store_with(backend.clone());
        assert!(matches!(store.load().await, Err(FennError::Persistence(_))));
        assert!(!store.is_mounted());

        *backend.fail_load.lock() = false;
        store.load().await.unwrap();
        assert!(store.is_mounted());
    }

    #[tokio::test]
    async fn load_after_a_toggle_is_rejected() {
        let store = store_with(Arc::new(MemoryPersistence::new()));
        store.toggle("a", Vec::new()).await.unwrap();
        assert!(matches!(store.load().await, Err(FennError::AlreadyMounted)));
        assert!(store.is_selected("a"));
    }

    #[tokio::test]
    async fn load_racing_a_toggle_does_not_clobber_it() {
        let backend = Arc::new(GatedPersistence::new());
        backend.inner.inner.select("stale").await.unwrap();
        let store = Arc::new(store_with(backend.clone()));

        let loading = tokio::spawn({
            let store = store.clone();
            async move { store.load().await }
        });
        backend.entered.notified().await;

        let toggling = tokio::spawn({
            let store = store.clone();
            async move { store.toggle("fresh", Vec::new()).await }
        });
        backend.entered.notified().await;
        backend.release.add_permits(2);

        assert!(matches!(loading.await.unwrap(), Err(FennError::AlreadyMounted)));
        assert_eq!(toggling.await.unwrap().unwrap(), ToggleOutcome::Selected(1));
        assert_eq!(store.selected(), BTreeSet::from(["fresh".to_string()]));
    }

    #[tokio::test]
    async fn toggle_directory_fans_out_to_descendants() {
        let backend = Arc::new(CountingPersistence::default());
        let store = store_with(backend.clone());

        let outcome = store.toggle("dir", children()).await.unwrap();
        assert_eq!(outcome, ToggleOutcome::Selected(3));
        assert_eq!(backend.selects.load(Ordering::SeqCst), 3);
        assert_eq!(
            store.selected(),
            BTreeSet::from(["dir".to_string(), "dir/a".to_string(), "dir/b".to_string()])
        );
        assert_eq!(backend.inner.snapshot(), store.selected());
    }

    #[tokio::test]
    async fn toggle_twice_restores_prior_selection() {
        let backend = Arc::new(MemoryPersistence::with_paths(["other"]));
        let store = store_with(backend.clone());
        store.load().await.unwrap();
        let before = store.selected();

        store.toggle("dir", children()).await.unwrap();
        let outcome = store.toggle("dir", children()).await.unwrap();

        assert_eq!(outcome, ToggleOutcome::Deselected(3));
        assert_eq!(store.selected(), before);
        assert_eq!(backend.snapshot(), before);
    }

    #[tokio::test]
    async fn partial_failure_leaves_local_set_unchanged() {
        let backend = Arc::new(CountingPersistence::failing_on("dir/b"));
        let store = store_with(backend.clone());

        let err = store.toggle("dir", children()).await.unwrap_err();
        assert!(matches!(err, FennError::Persistence(_)));
        assert!(store.selected().is_empty());
        assert!(!store.is_pending("dir"));
        // Requests acknowledged before the failure stay as the backend left them.
        assert_eq!(
            backend.inner.snapshot(),
            BTreeSet::from(["dir".to_string(), "dir/a".to_string()])
        );
    }

    #[tokio::test]
    async fn failed_deselect_keeps_selection() {
        let backend = Arc::new(CountingPersistence::default());
        let store = store_with(backend.clone());
        store.toggle("dir", children()).await.unwrap();

        *backend.fail_on.lock() = Some("dir/a".into());
        assert!(store.toggle("dir", children()).await.is_err());
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn reentrant_toggle_on_pending_path_is_ignored() {
        let backend = Arc::new(GatedPersistence::new());
        let store = Arc::new(store_with(backend.clone()));

        let first = tokio::spawn({
            let store = store.clone();
            async move { store.toggle("file", Vec::new()).await }
        });
        backend.entered.notified().await;
        assert!(store.is_pending("file"));

        let second = store.toggle("file", Vec::new()).await.unwrap();
        assert_eq!(second, ToggleOutcome::Ignored);

        backend.release.add_permits(1);
        assert_eq!(first.await.unwrap().unwrap(), ToggleOutcome::Selected(1));
        assert_eq!(backend.inner.selects.load(Ordering::SeqCst), 1);
        assert!(store.is_selected("file"));
        assert!(store.pending().is_empty());
    }

    #[tokio::test]
    async fn toggles_on_different_paths_run_concurrently() {
        let backend = Arc::new(GatedPersistence::new());
        let store = Arc::new(store_with(backend.clone()));

        let a = tokio::spawn({
            let store = store.clone();
            async move { store.toggle("a", Vec::new()).await }
        });
        backend.entered.notified().await;
        let b = tokio::spawn({
            let store = store.clone();
            async move { store.toggle("b", Vec::new()).await }
        });
        backend.entered.notified().await;

        assert!(store.is_pending("a") && store.is_pending("b"));
        backend.release.add_permits(2);
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn clear_empties_only_on_success() {
        let backend = Arc::new(CountingPersistence::default());
        let store = store_with(backend.clone());
        store.toggle("a", Vec::new()).await.unwrap();

        *backend.fail_clear.lock() = true;
        assert!(store.clear().await.is_err());
        assert!(store.is_selected("a"));

        *backend.fail_clear.lock() = false;
        store.clear().await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn prune_drops_missing_paths_locally() {
        let backend = Arc::new(MemoryPersistence::with_paths(["keep", "gone"]));
        let store = store_with(backend.clone());
        store.load().await.unwrap();

        let removed = store.prune(|p| p == "keep");
        assert_eq!(removed, vec!["gone".to_string()]);
        assert_eq!(store.selected(), BTreeSet::from(["keep".to_string()]));
        assert_eq!(backend.snapshot().len(), 2);
    }
}
