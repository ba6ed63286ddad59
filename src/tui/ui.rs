//! UI rendering for the TUI

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
    Frame,
};

use super::app::{App, Pane};
use super::compose::{self, ComposeProps};
use super::help;
use super::messages;
use super::sidebar;
use crate::notice::{Notice, Severity};

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Layout: header (1 line) + main content + status bar (1 line)
    let [header_area, main_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(header_area, frame.buffer_mut(), app);

    let [sidebar_area, content_area] =
        Layout::horizontal([Constraint::Length(28), Constraint::Fill(1)]).areas(main_area);

    sidebar::render(
        sidebar_area,
        frame.buffer_mut(),
        &app.sidebar,
        app.active_pane == Pane::Sidebar,
    );

    let [messages_area, compose_area] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(compose::COMPOSE_HEIGHT),
    ])
    .areas(content_area);

    messages::render(
        messages_area,
        frame.buffer_mut(),
        &app.messages,
        &app.me().uid,
        app.active_pane == Pane::Messages,
    );

    let target = app.target();
    compose::render(
        compose_area,
        frame,
        &app.compose,
        &ComposeProps {
            target: target.as_deref(),
            attachment: app.composer.attachment(),
            uploading: app.composer.is_uploading(),
            focused: app.active_pane == Pane::Compose,
        },
    );

    render_status(status_area, frame.buffer_mut(), app);

    if app.show_logs {
        help::render_log_popup(frame, app.logs.lines());
    }
    if app.show_help {
        help::render_help_popup(frame);
    }
}

fn render_header(area: Rect, buf: &mut Buffer, app: &App) {
    let title = " chatapp";
    let help = " [?] Help ";
    let user = format!(" {} ", app.me().display_name());

    let used = title.len() + help.len() + unicode_width::UnicodeWidthStr::width(user.as_str());
    let padding = (area.width as usize).saturating_sub(used);

    let line = Line::from(vec![
        Span::styled(
            title,
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" ".repeat(padding)),
        Span::styled(help, Style::default().fg(Color::Gray)),
        Span::styled(user, Style::default().fg(Color::Cyan)),
    ]);
    Paragraph::new(line)
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}

fn notice_color(notice: &Notice) -> Color {
    match notice.severity {
        Severity::Info => Color::Cyan,
        Severity::Success => Color::Green,
        Severity::Destructive => Color::Red,
    }
}

/// Status bar: the last notice, else the last logged warning, else hints.
fn render_status(area: Rect, buf: &mut Buffer, app: &App) {
    let line = if let Some(ref notice) = app.notice {
        Line::from(Span::styled(
            format!(" {} ", notice),
            Style::default().fg(notice_color(notice)),
        ))
    } else if let Some(warning) = app.logs.last_warning() {
        Line::from(Span::styled(
            format!(" {} ", warning),
            Style::default().fg(Color::Yellow),
        ))
    } else {
        let sep = Span::styled(" | ", Style::default().fg(Color::DarkGray));
        let target = app.target().unwrap_or_else(|| "(none)".to_string());
        Line::from(vec![
            Span::styled(format!(" {}", target), Style::default().fg(Color::Yellow)),
            sep.clone(),
            Span::styled(
                format!("Tab: {}", app.active_pane.as_str()),
                Style::default().fg(Color::Cyan),
            ),
            sep.clone(),
            Span::styled("/: search", Style::default().fg(Color::Gray)),
            sep,
            Span::styled("?: help", Style::default().fg(Color::Gray)),
        ])
    };

    Paragraph::new(line)
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}
