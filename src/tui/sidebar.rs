//! Sidebar widget: forum topics, then the user directory with a search filter.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};

use crate::models::{ChatUser, Topic};
use crate::sync::filter_users;

/// Sidebar state: owns the user list and tracks navigation.
pub struct SidebarState {
    pub users: Vec<ChatUser>,
    /// Search filter over user names and emails.
    pub filter: String,
    /// Typing goes into `filter` while set.
    pub searching: bool,
    /// Index into the flat item list.
    pub selected: usize,
    pub loading: bool,
}

impl Default for SidebarState {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            filter: String::new(),
            searching: false,
            selected: 1,
            loading: true,
        }
    }
}

/// One row in the sidebar's flat list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidebarItem {
    TopicsHeader,
    Topic(&'static Topic),
    UsersHeader,
    User(ChatUser),
}

impl SidebarItem {
    fn is_header(&self) -> bool {
        matches!(self, SidebarItem::TopicsHeader | SidebarItem::UsersHeader)
    }
}

impl SidebarState {
    pub fn set_users(&mut self, users: Vec<ChatUser>) {
        self.users = users;
        self.loading = false;
        self.clamp_selection();
    }

    /// Rows in display order. Users are narrowed by the current filter.
    pub fn flat_items(&self) -> Vec<SidebarItem> {
        let mut items = vec![SidebarItem::TopicsHeader];
        items.extend(Topic::all().iter().map(SidebarItem::Topic));
        items.push(SidebarItem::UsersHeader);
        items.extend(
            filter_users(&self.users, &self.filter)
                .into_iter()
                .cloned()
                .map(SidebarItem::User),
        );
        items
    }

    pub fn selected_item(&self) -> Option<SidebarItem> {
        self.flat_items()
            .into_iter()
            .nth(self.selected)
            .filter(|item| !item.is_header())
    }

    pub fn move_up(&mut self) {
        let items = self.flat_items();
        let mut next = self.selected;
        while next > 0 {
            next -= 1;
            if !items[next].is_header() {
                self.selected = next;
                return;
            }
        }
    }

    pub fn move_down(&mut self) {
        let items = self.flat_items();
        let mut next = self.selected;
        while next + 1 < items.len() {
            next += 1;
            if !items[next].is_header() {
                self.selected = next;
                return;
            }
        }
    }

    pub fn push_filter(&mut self, c: char) {
        self.filter.push(c);
        self.clamp_selection();
    }

    pub fn pop_filter(&mut self) {
        self.filter.pop();
        self.clamp_selection();
    }

    pub fn clear_filter(&mut self) {
        self.filter.clear();
        self.searching = false;
        self.clamp_selection();
    }

    /// Keep the selection on a selectable row after the list changed.
    pub fn clamp_selection(&mut self) {
        let items = self.flat_items();
        if self.selected >= items.len() {
            self.selected = items.len().saturating_sub(1);
        }
        if items
            .get(self.selected)
            .map_or(true, SidebarItem::is_header)
        {
            self.move_up();
            if items.get(self.selected).map_or(true, SidebarItem::is_header) {
                self.move_down();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

pub fn render(area: Rect, buf: &mut Buffer, state: &SidebarState, focused: bool) {
    let border_style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let border_type = if focused {
        BorderType::Double
    } else {
        BorderType::Plain
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(border_style);
    let inner = block.inner(area);
    block.render(area, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    // Search line takes the last row while a filter is active.
    let show_search = state.searching || !state.filter.is_empty();
    let list_height = if show_search {
        inner.height.saturating_sub(1)
    } else {
        inner.height
    } as usize;

    let items = state.flat_items();
    let scroll = compute_scroll_offset(state.selected, list_height, items.len());
    for (row, idx) in (scroll..items.len()).take(list_height).enumerate() {
        let row_area = Rect::new(inner.x, inner.y + row as u16, inner.width, 1);
        render_item(buf, row_area, &items[idx], idx == state.selected, state);
    }

    if show_search {
        let y = inner.y + inner.height - 1;
        let style = if state.searching {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let line = Line::from(Span::styled(format!(" / {}", state.filter), style));
        Paragraph::new(line).render(Rect::new(inner.x, y, inner.width, 1), buf);
    }
}

/// Keep the selected row visible.
fn compute_scroll_offset(selected: usize, height: usize, total: usize) -> usize {
    if total <= height || selected < height {
        return 0;
    }
    selected
        .saturating_sub(height - 1)
        .min(total.saturating_sub(height))
}

fn row_style(selected: bool) -> Style {
    if selected {
        Style::default()
            .fg(Color::White)
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    }
}

fn render_item(buf: &mut Buffer, area: Rect, item: &SidebarItem, selected: bool, state: &SidebarState) {
    let cursor = if selected { "\u{25BA}" } else { " " };
    let (label, style) = match item {
        SidebarItem::TopicsHeader => (
            " TOPICS".to_string(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        SidebarItem::Topic(topic) => (
            format!("{}{} {}", cursor, topic.icon, topic.name),
            row_style(selected),
        ),
        SidebarItem::UsersHeader => {
            let label = if state.loading {
                " -- USERS (loading) ".to_string()
            } else if state.users.is_empty() {
                " -- USERS (none) ".to_string()
            } else {
                " -- USERS ".to_string()
            };
            let dashes = (area.width as usize).saturating_sub(label.chars().count());
            (
                format!("{}{}", label, "-".repeat(dashes)),
                Style::default().fg(Color::DarkGray),
            )
        }
        SidebarItem::User(user) => (
            format!("{}({}) {}", cursor, user.initial(), user.display_name),
            row_style(selected),
        ),
    };

    let text: String = label.chars().take(area.width as usize).collect();
    let pad = (area.width as usize).saturating_sub(unicode_width::UnicodeWidthStr::width(text.as_str()));
    let line = Line::from(vec![
        Span::styled(text, style),
        Span::styled(" ".repeat(pad), style),
    ]);
    Paragraph::new(line).render(area, buf);
}
