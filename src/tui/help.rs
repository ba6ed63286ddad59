//! Help popup overlay listing the keyboard shortcuts.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

const POPUP_WIDTH: u16 = 72;
const POPUP_HEIGHT: u16 = 21;

struct Shortcut {
    key: &'static str,
    desc: &'static str,
}

struct Category {
    title: &'static str,
    shortcuts: &'static [Shortcut],
}

const NAVIGATION: Category = Category {
    title: "NAVIGATION",
    shortcuts: &[
        Shortcut { key: "Tab", desc: "Cycle focus" },
        Shortcut { key: "Up/Down", desc: "Move / scroll" },
        Shortcut { key: "Enter", desc: "Open topic or chat" },
        Shortcut { key: "/", desc: "Search users" },
        Shortcut { key: "Esc", desc: "Clear search / close" },
        Shortcut { key: "End", desc: "Jump to newest" },
    ],
};

const MESSAGING: Category = Category {
    title: "MESSAGING",
    shortcuts: &[
        Shortcut { key: "Enter", desc: "Send message" },
        Shortcut { key: "Alt+Enter", desc: "New line" },
        Shortcut { key: "Ctrl+A", desc: "Attach a file" },
        Shortcut { key: "Ctrl+X", desc: "Remove attachment" },
        Shortcut { key: "Ctrl+U", desc: "Clear compose box" },
    ],
};

const SESSION: Category = Category {
    title: "SESSION",
    shortcuts: &[
        Shortcut { key: "Ctrl+R", desc: "Reload users" },
        Shortcut { key: "Ctrl+O", desc: "Sign out" },
        Shortcut { key: "q / Ctrl+C", desc: "Quit" },
        Shortcut { key: "?", desc: "Toggle this help" },
        Shortcut { key: "F12", desc: "Toggle log" },
    ],
};

pub fn render_help_popup(frame: &mut Frame) {
    let area = frame.area();
    let popup_w = POPUP_WIDTH.min(area.width.saturating_sub(2));
    let popup_h = POPUP_HEIGHT.min(area.height.saturating_sub(2));
    let popup_area = centered_rect(popup_w, popup_h, area);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Line::from(vec![
            Span::styled(
                " HELP ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled("(? to close) ", Style::default().fg(Color::Gray)),
        ]));
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let [left_col, right_col] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(inner);
    frame.render_widget(
        Paragraph::new(column_lines(&[&NAVIGATION])),
        inset(left_col, 1, 1),
    );
    frame.render_widget(
        Paragraph::new(column_lines(&[&MESSAGING, &SESSION])),
        inset(right_col, 1, 1),
    );
}

/// Recent captured log lines, newest at the bottom.
pub fn render_log_popup<'a>(frame: &mut Frame, lines: impl Iterator<Item = &'a str>) {
    let area = frame.area();
    let popup_area = centered_rect(
        area.width.saturating_sub(4),
        area.height.saturating_sub(4),
        area,
    );
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            " LOG (F12 to close) ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let lines: Vec<&str> = lines.collect();
    let skip = lines.len().saturating_sub(inner.height as usize);
    let text: Vec<Line> = lines[skip..]
        .iter()
        .map(|line| {
            let color = if line.contains(" ERROR ") {
                Color::Red
            } else if line.contains(" WARN ") {
                Color::Yellow
            } else {
                Color::Gray
            };
            Line::from(Span::styled(line.to_string(), Style::default().fg(color)))
        })
        .collect();
    frame.render_widget(Paragraph::new(text), inner);
}

fn column_lines(categories: &[&Category]) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (i, cat) in categories.iter().enumerate() {
        if i > 0 {
            lines.push(Line::from(""));
        }
        lines.push(Line::from(Span::styled(
            cat.title,
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            "\u{2500}".repeat(30),
            Style::default().fg(Color::DarkGray),
        )));
        for sc in cat.shortcuts {
            lines.push(Line::from(vec![
                Span::styled(format!("{:<12}", sc.key), Style::default().fg(Color::Yellow)),
                Span::styled(sc.desc, Style::default().fg(Color::Gray)),
            ]));
        }
    }
    lines
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width, height)
}

fn inset(area: Rect, h: u16, v: u16) -> Rect {
    Rect::new(
        area.x + h,
        area.y + v,
        area.width.saturating_sub(h * 2),
        area.height.saturating_sub(v * 2),
    )
}
