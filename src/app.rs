use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedSender;

use crate::event::{Event, TaskResult};
use crate::selection::ToggleOutcome;
use crate::theme::ThemeColors;
use crate::view::TreeView;
use crate::workspace::{ReloadReport, StatusReport, Workspace};

/// How long a status message stays on screen.
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(3);

/// A transient message shown in the status bar.
#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
    pub created: Instant,
}

/// Main application state.
pub struct App {
    pub workspace: Arc<Workspace>,
    pub view: TreeView,
    pub theme: ThemeColors,
    pub should_quit: bool,
    pub status_message: Option<StatusMessage>,
    /// Workspace operations spawned and not yet reported back.
    pub busy: usize,
    mounting: bool,
}

impl App {
    pub fn new(workspace: Arc<Workspace>, view: TreeView, theme: ThemeColors) -> Self {
        Self {
            workspace,
            view,
            theme,
            should_quit: false,
            status_message: None,
            busy: 0,
            mounting: false,
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn set_status_message(&mut self, text: impl Into<String>) {
        self.status_message = Some(StatusMessage {
            text: text.into(),
            is_error: false,
            created: Instant::now(),
        });
    }

    pub fn set_error_message(&mut self, text: impl Into<String>) {
        self.status_message = Some(StatusMessage {
            text: text.into(),
            is_error: true,
            created: Instant::now(),
        });
    }

    /// Drop the status message once it has been shown long enough.
    pub fn clear_expired_status(&mut self) {
        if let Some(msg) = &self.status_message {
            if msg.created.elapsed() > STATUS_MESSAGE_TTL {
                self.status_message = None;
            }
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy > 0
    }

    // ── Background operations ────────────────────────────────────────────────

    fn spawn<F>(&mut self, tx: &UnboundedSender<Event>, task: F)
    where
        F: Future<Output = TaskResult> + Send + 'static,
    {
        self.busy += 1;
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = task.await;
            if tx.send(Event::Task(result)).is_err() {
                tracing::debug!("event loop gone; dropping task result");
            }
        });
    }

    pub fn start_mount(&mut self, tx: &UnboundedSender<Event>) {
        self.mounting = true;
        let workspace = Arc::clone(&self.workspace);
        self.spawn(tx, async move { TaskResult::Mounted(workspace.mount().await) });
    }

    /// Rebuild the tree. Until the selection has loaded this retries the
    /// whole mount instead.
    pub fn start_reload(&mut self, tx: &UnboundedSender<Event>) {
        if !self.workspace.selection().is_mounted() {
            if self.mounting {
                self.set_status_message("Still loading");
            } else {
                self.start_mount(tx);
            }
            return;
        }
        let workspace = Arc::clone(&self.workspace);
        self.spawn(tx, async move { TaskResult::Reloaded(workspace.reload().await) });
    }

    /// Selection edits made before the stored selection loads would be lost
    /// or block the load, so they are refused.
    fn ensure_selection_loaded(&mut self) -> bool {
        if self.workspace.selection().is_mounted() {
            return true;
        }
        let text = if self.mounting {
            "Selection still loading"
        } else {
            "Selection not loaded; press F5 to retry"
        };
        self.set_error_message(text);
        false
    }

    /// Toggle the row under the cursor.
    pub fn toggle_selected(&mut self, tx: &UnboundedSender<Event>) {
        let Some(path) = self.view.selected_path().map(str::to_string) else {
            return;
        };
        if !self.ensure_selection_loaded() {
            return;
        }
        if self.workspace.is_pending(&path) {
            self.set_status_message(format!("{} is still updating", path));
            return;
        }
        let workspace = Arc::clone(&self.workspace);
        self.spawn(tx, async move {
            let result = workspace.toggle(&path).await;
            TaskResult::Toggled { path, result }
        });
    }

    pub fn clear_selection(&mut self, tx: &UnboundedSender<Event>) {
        if !self.ensure_selection_loaded() {
            return;
        }
        let workspace = Arc::clone(&self.workspace);
        self.spawn(tx, async move { TaskResult::Cleared(workspace.clear().await) });
    }

    /// Refresh status for the row under the cursor, or everything when
    /// `all` is set.
    pub fn refresh_status(&mut self, tx: &UnboundedSender<Event>, all: bool) {
        let scope = if all {
            None
        } else {
            match self.view.selected_path() {
                Some(path) => Some(path.to_string()),
                None => return,
            }
        };
        let workspace = Arc::clone(&self.workspace);
        self.spawn(tx, async move {
            let paths = scope.clone().map(|p| vec![p]);
            let report = workspace.refresh_status(paths.as_deref()).await;
            TaskResult::Refreshed { scope, report }
        });
    }

    /// Apply a finished background operation to the view and status bar.
    pub fn handle_task(&mut self, result: TaskResult) {
        self.busy = self.busy.saturating_sub(1);
        if matches!(result, TaskResult::Mounted(_)) {
            self.mounting = false;
        }
        match result {
            TaskResult::Mounted(Ok(report)) => {
                self.refresh_view();
                let selected = self.workspace.selection().len();
                self.report_reload(&report, &format!("{} selected", selected));
            }
            TaskResult::Reloaded(Ok(report)) => {
                self.refresh_view();
                self.report_reload(&report, "reloaded");
            }
            TaskResult::Mounted(Err(e)) | TaskResult::Reloaded(Err(e)) => {
                tracing::error!(error = %e, "tree load failed");
                // The tree may have been rebuilt before the selection failed.
                self.refresh_view();
                self.set_error_message(format!("Load failed: {}", e));
            }
            TaskResult::Toggled { path, result } => match result {
                Ok(ToggleOutcome::Selected(n)) => {
                    self.set_status_message(format!("Selected {} ({} paths)", path, n))
                }
                Ok(ToggleOutcome::Deselected(n)) => {
                    self.set_status_message(format!("Deselected {} ({} paths)", path, n))
                }
                Ok(ToggleOutcome::Ignored) => {
                    self.set_status_message(format!("{} is still updating", path))
                }
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "toggle failed");
                    self.set_error_message(format!("Toggle failed for {}: {}", path, e));
                }
            },
            TaskResult::Cleared(Ok(())) => self.set_status_message("Selection cleared"),
            TaskResult::Cleared(Err(e)) => {
                tracing::warn!(error = %e, "clear failed");
                self.set_error_message(format!("Clear failed: {}", e));
            }
            TaskResult::Refreshed { scope, report } => {
                self.refresh_view();
                let target = scope.as_deref().unwrap_or("all");
                self.report_status(&report, &format!("Status refreshed: {}", target));
            }
        }
    }

    fn report_reload(&mut self, report: &ReloadReport, suffix: &str) {
        let mut text = format!("{} entries, {}", report.entries, suffix);
        if !report.skipped.is_empty() {
            text.push_str(&format!(", {} skipped", report.skipped.len()));
        }
        if !report.pruned.is_empty() {
            text.push_str(&format!(", {} stale selections dropped", report.pruned.len()));
        }
        self.report_status(&report.status, &text);
    }

    fn report_status(&mut self, report: &StatusReport, text: &str) {
        if report.warnings.is_empty() {
            self.set_status_message(text);
        } else {
            self.set_error_message(format!("{} ({})", text, report.warnings.join("; ")));
        }
    }

    /// Show how many non-overlapping paths a batch action would receive and
    /// move the cursor onto the first one.
    pub fn show_action_paths(&mut self) {
        let paths = self.workspace.action_paths();
        if let Some(first) = paths.first() {
            let tree = self.workspace.tree();
            self.view.reveal(&tree, first);
        }
        let text = match paths.as_slice() {
            [] => "Nothing selected".to_string(),
            [only] => format!("1 action path: {}", only),
            [first, rest @ ..] => format!("{} action paths: {}, +{}", paths.len(), first, rest.len()),
        };
        self.set_status_message(text);
    }

    // ── Navigation ───────────────────────────────────────────────────────────

    /// Re-flatten the view from the current tree.
    pub fn refresh_view(&mut self) {
        let tree = self.workspace.tree();
        self.view.flatten(&tree);
    }

    pub fn select_next(&mut self) {
        self.view.select_next();
    }

    pub fn select_previous(&mut self) {
        self.view.select_previous();
    }

    pub fn select_first(&mut self) {
        self.view.select_first();
    }

    pub fn select_last(&mut self) {
        self.view.select_last();
    }

    pub fn expand_selected(&mut self) {
        let tree = self.workspace.tree();
        self.view.expand_selected(&tree);
    }

    pub fn collapse_selected(&mut self) {
        let tree = self.workspace.tree();
        self.view.collapse_selected(&tree);
    }

    pub fn expand_all(&mut self) {
        let tree = self.workspace.tree();
        self.view.expand_all(&tree);
    }

    pub fn collapse_all(&mut self) {
        let tree = self.workspace.tree();
        self.view.collapse_all(&tree);
    }

    pub fn toggle_hidden(&mut self) {
        let tree = self.workspace.tree();
        self.view.toggle_hidden(&tree);
        let state = if self.view.show_hidden { "shown" } else { "hidden" };
        drop(tree);
        self.set_status_message(format!("Hidden files {}", state));
    }

    pub fn toggle_dirs_first(&mut self) {
        let tree = self.workspace.tree();
        self.view.toggle_dirs_first(&tree);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use tempfile::TempDir;
    use tokio::sync::mpsc;

    use crate::config::AppConfig;
    use crate::theme::dark_theme;
    use crate::tree::TriState;

    fn setup_app() -> (TempDir, App) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("repo");
        fs::create_dir_all(root.join("data/raw")).unwrap();
        fs::write(root.join("data/raw/a.csv"), "1").unwrap();
        fs::write(root.join("data/raw/b.csv"), "2").unwrap();
        fs::write(root.join("README.md"), "# repo").unwrap();
        fs::write(root.join(".env"), "X=1").unwrap();

        let mut config = AppConfig::default();
        config.selection.store_path = Some(dir.path().join("selection.json"));
        let workspace = Arc::new(Workspace::from_config(&root, &config));
        let app = App::new(workspace, TreeView::new(false, true), dark_theme());
        (dir, app)
    }

    async fn run(app: &mut App, rx: &mut mpsc::UnboundedReceiver<Event>) {
        match rx.recv().await {
            Some(Event::Task(result)) => app.handle_task(result),
            other => panic!("expected a task result, got {:?}", other),
        }
    }

    async fn mounted() -> (TempDir, App, UnboundedSender<Event>, mpsc::UnboundedReceiver<Event>) {
        let (dir, mut app) = setup_app();
        let (tx, mut rx) = mpsc::unbounded_channel();
        app.start_mount(&tx);
        assert!(app.is_busy());
        run(&mut app, &mut rx).await;
        (dir, app, tx, rx)
    }

    #[tokio::test]
    async fn mount_populates_view() {
        let (_dir, app, _tx, _rx) = mounted().await;
        assert!(!app.is_busy());
        let names: Vec<&str> = app.view.flat_items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["data", "README.md"]);
        let msg = app.status_message.as_ref().unwrap();
        assert!(!msg.is_error);
        assert!(msg.text.contains("0 selected"));
    }

    #[tokio::test]
    async fn toggle_directory_selects_subtree() {
        let (_dir, mut app, tx, mut rx) = mounted().await;
        app.select_first();
        app.toggle_selected(&tx);
        run(&mut app, &mut rx).await;

        assert_eq!(app.workspace.tri_state("data"), Some(TriState::Full));
        assert_eq!(
            app.workspace.action_paths(),
            vec!["data/raw/a.csv".to_string(), "data/raw/b.csv".to_string()]
        );
        assert!(app.status_message.as_ref().unwrap().text.starts_with("Selected data"));
    }

    #[tokio::test]
    async fn toggle_leaf_makes_parent_partial() {
        let (_dir, mut app, tx, mut rx) = mounted().await;
        app.expand_selected();
        app.select_next();
        app.expand_selected();
        app.select_next();
        assert_eq!(app.view.selected_path(), Some("data/raw/a.csv"));

        app.toggle_selected(&tx);
        run(&mut app, &mut rx).await;
        assert_eq!(app.workspace.tri_state("data/raw"), Some(TriState::Indeterminate));
        assert_eq!(app.workspace.tri_state("data"), Some(TriState::Indeterminate));
    }

    #[tokio::test]
    async fn clear_reports_success() {
        let (_dir, mut app, tx, mut rx) = mounted().await;
        app.toggle_selected(&tx);
        run(&mut app, &mut rx).await;
        app.clear_selection(&tx);
        run(&mut app, &mut rx).await;
        assert!(app.workspace.selection().is_empty());
        assert_eq!(app.status_message.as_ref().unwrap().text, "Selection cleared");
    }

    #[tokio::test]
    async fn reload_keeps_cursor_on_same_path() {
        let (dir, mut app, tx, mut rx) = mounted().await;
        app.select_last();
        assert_eq!(app.view.selected_path(), Some("README.md"));
        fs::write(dir.path().join("repo/CHANGELOG.md"), "").unwrap();

        app.start_reload(&tx);
        run(&mut app, &mut rx).await;
        assert_eq!(app.view.selected_path(), Some("README.md"));
        assert_eq!(app.view.flat_items.len(), 3);
    }

    #[tokio::test]
    async fn scoped_refresh_reports_target() {
        let (_dir, mut app, tx, mut rx) = mounted().await;
        app.refresh_status(&tx, false);
        run(&mut app, &mut rx).await;
        let msg = app.status_message.as_ref().unwrap();
        assert_eq!(msg.text, "Status refreshed: data");
    }

    #[tokio::test]
    async fn toggle_on_empty_view_is_noop() {
        let (_dir, mut app) = setup_app();
        let (tx, _rx) = mpsc::unbounded_channel();
        app.toggle_selected(&tx);
        assert!(!app.is_busy());
    }

    #[tokio::test]
    async fn action_paths_message() {
        let (_dir, mut app, tx, mut rx) = mounted().await;
        app.show_action_paths();
        assert_eq!(app.status_message.as_ref().unwrap().text, "Nothing selected");

        app.expand_selected();
        app.select_next();
        app.toggle_selected(&tx);
        run(&mut app, &mut rx).await;
        app.collapse_all();
        app.select_last();

        app.show_action_paths();
        assert_eq!(
            app.status_message.as_ref().unwrap().text,
            "2 action paths: data/raw/a.csv, +1"
        );
        assert_eq!(app.view.selected_path(), Some("data/raw/a.csv"));
    }

    #[tokio::test]
    async fn toggle_hidden_reveals_dotfiles() {
        let (_dir, mut app, _tx, _rx) = mounted().await;
        let before = app.view.flat_items.len();
        app.toggle_hidden();
        assert_eq!(app.view.flat_items.len(), before + 1);
    }

    #[test]
    fn clear_expired_status_removes_old() {
        let (_dir, mut app) = setup_app();
        app.set_status_message("fresh");
        app.clear_expired_status();
        assert!(app.status_message.is_some());

        app.status_message = Some(StatusMessage {
            text: "old".into(),
            is_error: false,
            created: Instant::now() - Duration::from_secs(5),
        });
        app.clear_expired_status();
        assert!(app.status_message.is_none());
    }

    #[test]
    fn failed_load_sets_error_message() {
        let (_dir, mut app) = setup_app();
        app.busy = 1;
        app.handle_task(TaskResult::Reloaded(Err(crate::error::FennError::NotFound(
            "/gone".into(),
        ))));
        assert!(!app.is_busy());
        assert!(app.status_message.as_ref().unwrap().is_error);
    }

    #[tokio::test]
    async fn reload_after_failed_mount_retries_the_mount() {
        let (dir, mut app) = setup_app();
        let store = dir.path().join("selection.json");
        fs::write(&store, "{not json").unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        app.start_mount(&tx);
        run(&mut app, &mut rx).await;
        assert!(app.status_message.as_ref().unwrap().is_error);
        assert!(!app.workspace.selection().is_mounted());

        fs::write(&store, r#"{"paths": ["README.md"]}"#).unwrap();
        app.start_reload(&tx);
        run(&mut app, &mut rx).await;
        assert!(app.workspace.selection().is_mounted());
        assert!(app.workspace.selection().is_selected("README.md"));
        assert!(app.status_message.as_ref().unwrap().text.contains("1 selected"));

        // Once mounted, F5 is a plain rebuild again.
        app.start_reload(&tx);
        run(&mut app, &mut rx).await;
        assert!(app.status_message.as_ref().unwrap().text.contains("reloaded"));
    }

    #[tokio::test]
    async fn selection_edits_wait_for_the_stored_selection() {
        let (dir, mut app) = setup_app();
        fs::write(dir.path().join("selection.json"), "{not json").unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        app.start_mount(&tx);

        app.clear_selection(&tx);
        assert_eq!(app.busy, 1);
        assert_eq!(app.status_message.as_ref().unwrap().text, "Selection still loading");
        app.start_reload(&tx);
        assert_eq!(app.busy, 1);
        assert_eq!(app.status_message.as_ref().unwrap().text, "Still loading");

        run(&mut app, &mut rx).await;
        assert_eq!(app.view.selected_path(), Some("data"));
        app.toggle_selected(&tx);
        app.clear_selection(&tx);
        assert!(!app.is_busy());
        let msg = app.status_message.as_ref().unwrap();
        assert!(msg.is_error);
        assert_eq!(msg.text, "Selection not loaded; press F5 to retry");
        assert!(app.workspace.selection().is_empty());
    }
}
