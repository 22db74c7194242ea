use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::theme::ThemeColors;
use crate::tree::TriState;
use crate::view::{FlatItem, TreeView};

/// Selection state of one rendered row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowMark {
    pub state: TriState,
    /// A toggle for this path is still being written.
    pub pending: bool,
}

impl RowMark {
    fn checkbox(&self) -> &'static str {
        if self.pending {
            return "[~] ";
        }
        match self.state {
            TriState::Clear => "[ ] ",
            TriState::Indeterminate => "[-] ",
            TriState::Full => "[x] ",
        }
    }
}

/// Tree widget with box-drawing guides, checkboxes and status badges.
pub struct TreeWidget<'a> {
    view: &'a TreeView,
    theme: &'a ThemeColors,
    /// Marks for the visible rows, starting at the view's scroll offset.
    marks: &'a [RowMark],
    block: Option<Block<'a>>,
}

impl<'a> TreeWidget<'a> {
    pub fn new(view: &'a TreeView, theme: &'a ThemeColors, marks: &'a [RowMark]) -> Self {
        Self {
            view,
            theme,
            marks,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    /// Indentation guides for `items[item_index]`, derived from whether each
    /// ancestor was the last of its siblings.
    fn build_prefix(item: &FlatItem, items: &[FlatItem], item_index: usize) -> String {
        let mut prefix = String::new();
        for d in 0..item.depth {
            let mut ancestor_is_last = false;
            for j in (0..item_index).rev() {
                if items[j].depth == d {
                    ancestor_is_last = items[j].is_last_sibling;
                    break;
                }
                if items[j].depth < d {
                    break;
                }
            }
            prefix.push_str(if ancestor_is_last { "   " } else { "│  " });
        }
        prefix.push_str(if item.is_last_sibling { "└─ " } else { "├─ " });
        prefix
    }

    fn name_style(&self, item: &FlatItem, is_cursor: bool) -> Style {
        if is_cursor {
            Style::default()
                .bg(self.theme.tree_selected_bg)
                .fg(self.theme.tree_selected_fg)
                .add_modifier(Modifier::BOLD)
        } else if item.is_hidden {
            Style::default().fg(self.theme.tree_hidden_fg)
        } else if item.is_directory {
            Style::default()
                .fg(self.theme.tree_dir_fg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.theme.tree_fg)
        }
    }

    fn checkbox_style(&self, mark: RowMark) -> Style {
        if mark.pending {
            return Style::default()
                .fg(self.theme.warning_fg)
                .add_modifier(Modifier::SLOW_BLINK);
        }
        match mark.state {
            TriState::Clear => Style::default().fg(self.theme.dim_fg),
            TriState::Indeterminate => Style::default().fg(self.theme.accent_fg),
            TriState::Full => Style::default()
                .fg(self.theme.success_fg)
                .add_modifier(Modifier::BOLD),
        }
    }
}

impl<'a> Widget for TreeWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner_area = match &self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.clone().render(area, buf);
                inner
            }
            None => area,
        };

        let items = &self.view.flat_items;
        let visible_height = inner_area.height as usize;
        if items.is_empty() || visible_height == 0 {
            return;
        }

        let scroll = self.view.scroll_offset;
        let rows = items.iter().enumerate().skip(scroll).take(visible_height);

        for (i, (idx, item)) in rows.enumerate() {
            let y = inner_area.y + i as u16;
            let mark = self.marks.get(i).copied().unwrap_or(RowMark {
                state: TriState::Clear,
                pending: false,
            });

            let mut spans = vec![
                Span::styled(
                    Self::build_prefix(item, items, idx),
                    Style::default().fg(self.theme.border_fg),
                ),
                Span::styled(mark.checkbox(), self.checkbox_style(mark)),
            ];
            let name = if item.is_directory {
                format!("{}/", item.name)
            } else {
                item.name.clone()
            };
            spans.push(Span::styled(name, self.name_style(item, idx == self.view.selected_index)));

            if let Some(status) = item.primary_status {
                let badge = status.badge();
                if !badge.is_empty() {
                    spans.push(Span::styled(
                        format!(" {}", badge),
                        Style::default()
                            .fg(self.theme.badge_fg(status))
                            .add_modifier(Modifier::BOLD),
                    ));
                }
            }
            if item.tracked {
                spans.push(Span::styled(" ◆", Style::default().fg(self.theme.info_fg)));
            }

            buf.set_line(inner_area.x, y, &Line::from(spans), inner_area.width);
        }
    }
}
