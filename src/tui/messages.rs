//! Messages pane: the open channel's message list.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};

use crate::models::{ChatMessage, MediaKind, EMPTY_FEED_PROMPT};

/// State for the messages pane.
#[derive(Default)]
pub struct MessagesState {
    /// Channel header text; empty when nothing is open.
    pub header: String,
    pub messages: Vec<ChatMessage>,
    /// Lines scrolled up from the bottom (0 = follow newest).
    pub scroll_back: usize,
    /// A first snapshot arrived for the open channel.
    pub loaded: bool,
}

impl MessagesState {
    /// Switch to a new channel; the list stays empty until its first snapshot.
    pub fn open(&mut self, header: String) {
        self.header = header;
        self.messages.clear();
        self.scroll_back = 0;
        self.loaded = false;
    }

    /// Replace the list with a pushed snapshot.
    pub fn replace(&mut self, snapshot: Vec<ChatMessage>) {
        self.messages = snapshot;
        self.loaded = true;
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_back = self.scroll_back.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_back = self.scroll_back.saturating_sub(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_back = 0;
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

pub fn render(area: Rect, buf: &mut Buffer, state: &MessagesState, me: &str, focused: bool) {
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

    let header_area = Rect::new(inner.x, inner.y, inner.width, 1);
    render_header(header_area, buf, &state.header);

    let body = Rect::new(
        inner.x,
        inner.y + 1,
        inner.width,
        inner.height.saturating_sub(1),
    );
    if body.height == 0 {
        return;
    }

    if state.header.is_empty() {
        render_hint(body, buf, "Select a topic or a user from the sidebar");
        return;
    }
    if !state.loaded {
        render_hint(body, buf, "Loading...");
        return;
    }
    if state.messages.is_empty() {
        render_hint(body, buf, EMPTY_FEED_PROMPT);
        return;
    }

    let lines = build_lines(&state.messages, me, body.width as usize);
    let height = body.height as usize;
    let max_back = lines.len().saturating_sub(height);
    let back = state.scroll_back.min(max_back);
    let start = lines.len().saturating_sub(height + back);

    for (row, line) in lines.iter().skip(start).take(height).enumerate() {
        let line_area = Rect::new(body.x, body.y + row as u16, body.width, 1);
        Paragraph::new(line.clone()).render(line_area, buf);
    }

    if back > 0 {
        let x = body.x + body.width.saturating_sub(1);
        let y = body.y + body.height.saturating_sub(1);
        let cell = &mut buf[(x, y)];
        cell.set_char('v');
        cell.set_style(Style::default().fg(Color::DarkGray));
    }
}

fn render_header(area: Rect, buf: &mut Buffer, header: &str) {
    let line = Line::from(Span::styled(
        format!(" {} ", header),
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    ));
    Paragraph::new(line)
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}

fn render_hint(area: Rect, buf: &mut Buffer, text: &str) {
    let y = area.y + area.height / 2;
    let width = unicode_width::UnicodeWidthStr::width(text) as u16;
    let x = area.x + area.width.saturating_sub(width) / 2;
    let line = Line::from(Span::styled(text.to_string(), Style::default().fg(Color::DarkGray)));
    Paragraph::new(line).render(Rect::new(x, y, area.width.saturating_sub(x - area.x), 1), buf);
}

fn media_style(kind: &MediaKind) -> Style {
    match kind {
        MediaKind::Image => Style::default().fg(Color::Magenta),
        MediaKind::Video => Style::default().fg(Color::Blue),
        MediaKind::File => Style::default().fg(Color::Cyan).add_modifier(Modifier::UNDERLINED),
    }
}

/// Render every message to display lines: a name/time line, the wrapped
/// body and a media line, separated by blank lines.
fn build_lines(messages: &[ChatMessage], me: &str, width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let body_width = width.saturating_sub(2).max(1);

    for (i, msg) in messages.iter().enumerate() {
        if i > 0 {
            lines.push(Line::from(""));
        }

        let (name, name_style) = if msg.is_from(me) {
            ("You".to_string(), Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        } else {
            (
                msg.author_name.clone(),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )
        };
        lines.push(Line::from(vec![
            Span::styled(format!(" {}", name), name_style),
            Span::styled(format!("  {}", msg.time_label()), Style::default().fg(Color::DarkGray)),
        ]));

        for text_line in msg.text.lines() {
            for chunk in wrap(text_line, body_width) {
                lines.push(Line::from(Span::styled(
                    format!("  {}", chunk),
                    Style::default().fg(Color::White),
                )));
            }
        }

        if let Some(ref media) = msg.media {
            lines.push(Line::from(Span::styled(
                format!("  {}", media.marker()),
                media_style(&media.kind),
            )));
        }
    }
    lines
}

/// Greedy word wrap by display width. Words longer than `width` are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    use unicode_width::UnicodeWidthChar;

    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_w = 0;

    for word in text.split(' ') {
        let word_w: usize = word.chars().map(|c| c.width().unwrap_or(0)).sum();
        let sep = usize::from(!current.is_empty());
        if current_w + sep + word_w <= width {
            if sep == 1 {
                current.push(' ');
            }
            current.push_str(word);
            current_w += sep + word_w;
            continue;
        }
        if !current.is_empty() {
            out.push(std::mem::take(&mut current));
            current_w = 0;
        }
        for c in word.chars() {
            let cw = c.width().unwrap_or(0);
            if current_w + cw > width && !current.is_empty() {
                out.push(std::mem::take(&mut current));
                current_w = 0;
            }
            current.push(c);
            current_w += cw;
        }
    }
    out.push(current);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Media;

    fn message(author: &str, text: &str) -> ChatMessage {
        ChatMessage {
            id: "1".to_string(),
            text: text.to_string(),
            author_id: author.to_string(),
            author_name: author.to_uppercase(),
            author_photo_url: String::new(),
            recipient_id: None,
            timestamp: None,
            media: None,
        }
    }

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("hello world", 20), vec!["hello world"]);
        assert_eq!(wrap("hello world", 7), vec!["hello", "world"]);
        assert_eq!(wrap("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert_eq!(wrap("", 5), vec![""]);
    }

    #[test]
    fn test_lines_mark_own_messages_and_media() {
        let mut theirs = message("bob", "look");
        theirs.media = Some(Media {
            url: "https://cdn/cat.png".to_string(),
            kind: MediaKind::Image,
        });
        let mine = message("me", "nice\nreally");

        let lines = build_lines(&[theirs, mine], "me", 40);
        let text: Vec<String> = lines.iter().map(plain).collect();
        assert_eq!(
            text,
            vec![
                " BOB  ",
                "  look",
                "  [image] https://cdn/cat.png",
                "",
                " You  ",
                "  nice",
                "  really",
            ]
        );
    }

    #[test]
    fn test_open_resets_and_replace_loads() {
        let mut state = MessagesState::default();
        state.replace(vec![message("a", "old")]);
        state.scroll_up(3);

        state.open("Bob".to_string());
        assert!(!state.loaded);
        assert!(state.messages.is_empty());
        assert_eq!(state.scroll_back, 0);

        state.replace(Vec::new());
        assert!(state.loaded);
    }
}
