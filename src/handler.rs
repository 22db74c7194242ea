use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use tokio::sync::mpsc::UnboundedSender;

use crate::app::App;
use crate::event::Event;

/// Handle a key event.
pub fn handle_key_event(app: &mut App, key: KeyEvent, tx: &UnboundedSender<Event>) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('c') if ctrl => app.quit(),
        KeyCode::Char('r') if ctrl => app.start_reload(tx),
        KeyCode::F(5) => app.start_reload(tx),

        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_previous(),
        KeyCode::Char('g') | KeyCode::Home => app.select_first(),
        KeyCode::Char('G') | KeyCode::End => app.select_last(),
        KeyCode::Char('l') | KeyCode::Right | KeyCode::Enter => app.expand_selected(),
        KeyCode::Char('h') | KeyCode::Left => app.collapse_selected(),
        KeyCode::Char('E') => app.expand_all(),
        KeyCode::Char('W') => app.collapse_all(),

        KeyCode::Char(' ') => app.toggle_selected(tx),
        KeyCode::Char('C') => app.clear_selection(tx),
        KeyCode::Char('p') => app.show_action_paths(),
        KeyCode::Char('r') => app.refresh_status(tx, false),
        KeyCode::Char('R') => app.refresh_status(tx, true),

        KeyCode::Char('.') => app.toggle_hidden(),
        KeyCode::Char('d') => app.toggle_dirs_first(),
        _ => {}
    }
}

/// Handle a mouse event. Only the wheel is bound.
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.select_next(),
        MouseEventKind::ScrollUp => app.select_previous(),
        _ => {}
    }
}
