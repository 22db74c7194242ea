use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::theme::ThemeColors;

const KEY_HINTS: &str = " space:toggle  C:clear  r/R:status  F5:reload  q:quit ";

/// Status bar: the cursor path, row info, selection count and key hints, or a
/// transient message in their place.
pub struct StatusBarWidget<'a> {
    path_str: &'a str,
    file_info: &'a str,
    theme: &'a ThemeColors,
    status_message: Option<&'a str>,
    is_error: bool,
    selection_info: Option<&'a str>,
    busy: bool,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(path_str: &'a str, file_info: &'a str, theme: &'a ThemeColors) -> Self {
        Self {
            path_str,
            file_info,
            theme,
            status_message: None,
            is_error: false,
            selection_info: None,
            busy: false,
        }
    }

    pub fn status_message(mut self, msg: &'a str, is_error: bool) -> Self {
        self.status_message = Some(msg);
        self.is_error = is_error;
        self
    }

    pub fn selection_info(mut self, info: &'a str) -> Self {
        self.selection_info = Some(info);
        self
    }

    pub fn busy(mut self, busy: bool) -> Self {
        self.busy = busy;
        self
    }
}

/// Keep the last `budget` characters of `s`, prefixed with an ellipsis when
/// anything was cut.
fn truncate_left(s: &str, budget: usize) -> String {
    let len = s.chars().count();
    if len <= budget {
        return s.to_string();
    }
    if budget <= 3 {
        return s.chars().take(budget).collect();
    }
    let tail: String = s.chars().skip(len - (budget - 3)).collect();
    format!("...{}", tail)
}

impl<'a> Widget for StatusBarWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        let width = area.width as usize;

        if let Some(msg) = self.status_message {
            let style = if self.is_error {
                Style::default()
                    .bg(self.theme.error_fg)
                    .fg(self.theme.status_bg)
            } else {
                Style::default()
                    .bg(self.theme.status_bg)
                    .fg(self.theme.success_fg)
            };
            let display: String = msg.chars().take(width).collect();
            let line = Line::from(Span::styled(format!("{:<width$}", display), style));
            buf.set_line(area.x, area.y, &line, area.width);
            return;
        }

        let base = Style::default().bg(self.theme.status_bg);
        let mut right: Vec<Span> = Vec::new();
        if self.busy {
            right.push(Span::styled(
                " working… ",
                base.fg(self.theme.warning_fg).add_modifier(Modifier::BOLD),
            ));
        }
        if let Some(info) = self.selection_info {
            right.push(Span::styled(
                format!(" {} ", info),
                base.fg(self.theme.accent_fg).add_modifier(Modifier::BOLD),
            ));
        }
        right.push(Span::styled(
            KEY_HINTS,
            base.fg(self.theme.dim_fg).add_modifier(Modifier::DIM),
        ));
        let right_len: usize = right.iter().map(|s| s.content.chars().count()).sum();

        let remaining = width.saturating_sub(right_len);
        let info_len = self.file_info.chars().count();
        let path_display = truncate_left(self.path_str, remaining.saturating_sub(info_len + 1));
        let info_budget = remaining.saturating_sub(path_display.chars().count());
        let info_display: String = self.file_info.chars().take(info_budget).collect();
        let gap = remaining
            .saturating_sub(path_display.chars().count())
            .saturating_sub(info_display.chars().count());

        let mut spans = vec![
            Span::styled(path_display, base.fg(self.theme.status_fg)),
            Span::styled(" ".repeat(gap), base),
            Span::styled(info_display, base.fg(self.theme.info_fg)),
        ];
        spans.extend(right);

        buf.set_line(area.x, area.y, &Line::from(spans), area.width);
    }
}
