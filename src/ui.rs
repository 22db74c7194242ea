use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::Style,
    widgets::{Block, Borders},
    Frame,
};

use crate::app::App;
use crate::components::status_bar::StatusBarWidget;
use crate::components::tree::{RowMark, TreeWidget};
use crate::path;
use crate::tree::{tri_state, TriState};
use crate::view::{format_size, FlatItem};

/// Render the application UI.
pub fn render(app: &mut App, frame: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    // Account for the border.
    let visible_height = chunks[0].height.saturating_sub(2) as usize;
    app.view.update_scroll(visible_height);
    let marks = visible_marks(app, visible_height);

    let root_name = app
        .workspace
        .root()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| app.workspace.root().display().to_string());
    let block = Block::default()
        .title(format!(" {} ", root_name))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.border_fg));
    frame.render_widget(
        TreeWidget::new(&app.view, &app.theme, &marks).block(block),
        chunks[0],
    );

    app.clear_expired_status();
    let item = app.view.selected_item();
    let path_str = item.map(|i| i.path.as_str()).unwrap_or("");
    let file_info = item.map(describe).unwrap_or_default();
    let selected = app.workspace.selection().len();
    let selection_info = format!("{} selected", selected);

    let mut status_bar = StatusBarWidget::new(path_str, &file_info, &app.theme)
        .selection_info(&selection_info)
        .busy(app.is_busy());
    if let Some(msg) = &app.status_message {
        status_bar = status_bar.status_message(&msg.text, msg.is_error);
    }
    frame.render_widget(status_bar, chunks[1]);
}

/// Tri-state and pending flag for each row currently on screen.
fn visible_marks(app: &App, visible_height: usize) -> Vec<RowMark> {
    let pending = app.workspace.selection().pending();
    let tree = app.workspace.tree();
    app.workspace.selection().with_selected(|selected| {
        app.view
            .flat_items
            .iter()
            .skip(app.view.scroll_offset)
            .take(visible_height)
            .map(|item| RowMark {
                state: tree
                    .get(&item.path)
                    .map(|node| tri_state(node, path::parent(&item.path), selected))
                    .unwrap_or(TriState::Clear),
                pending: pending.contains(&item.path),
            })
            .collect()
    })
}

fn describe(item: &FlatItem) -> String {
    let mut parts = Vec::new();
    if !item.is_directory {
        parts.push(format_size(item.size));
    }
    if let Some(status) = item.primary_status {
        parts.push(status.to_string());
    }
    if item.tracked {
        parts.push("tracked".to_string());
    }
    parts.join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use ratatui::{backend::TestBackend, Terminal};

    use crate::config::AppConfig;
    use crate::status::PrimaryStatus;
    use crate::theme::dark_theme;
    use crate::view::TreeView;
    use crate::workspace::Workspace;

    #[test]
    fn describe_joins_known_fields() {
        let item = FlatItem {
            path: "data/a.csv".into(),
            name: "a.csv".into(),
            depth: 1,
            is_directory: false,
            is_expanded: false,
            is_last_sibling: true,
            is_hidden: false,
            size: 2048,
            primary_status: Some(PrimaryStatus::Modified),
            tracked: true,
        };
        assert_eq!(describe(&item), "2.0 KB | modified | tracked");
    }

    #[tokio::test]
    async fn render_shows_root_title_and_selection_count() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("project");
        std::fs::create_dir_all(root.join("data")).unwrap();
        std::fs::write(root.join("data/a.csv"), "x").unwrap();
        let mut config = AppConfig::default();
        config.selection.store_path = Some(dir.path().join("selection.json"));

        let workspace = Arc::new(Workspace::from_config(&root, &config));
        workspace.mount().await.unwrap();
        workspace.toggle("data").await.unwrap();
        let mut app = App::new(workspace, TreeView::new(false, true), dark_theme());
        app.refresh_view();

        let mut terminal = Terminal::new(TestBackend::new(60, 6)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains(" project "));
        assert!(text.contains("[x] data/"));
        assert!(text.contains("2 selected"));
    }
}
