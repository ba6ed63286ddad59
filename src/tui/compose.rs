//! Compose box: editable input line plus an attachment line.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
    Frame,
};

use crate::sync::Attachment;

/// Cursor-aware text buffer. Used for the message input and the attach prompt.
#[derive(Default)]
pub struct InputLine {
    pub text: String,
    /// Character offset into `text`.
    pub cursor: usize,
}

impl InputLine {
    pub fn with_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            cursor: text.chars().count(),
        }
    }

    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_at(self.cursor);
        self.text.insert(at, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let end = self.byte_at(self.cursor);
        let start = self.byte_at(self.cursor - 1);
        self.text.drain(start..end);
        self.cursor -= 1;
    }

    pub fn delete(&mut self) {
        if self.cursor < self.text.chars().count() {
            let start = self.byte_at(self.cursor);
            let end = self.byte_at(self.cursor + 1);
            self.text.drain(start..end);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.text.chars().count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.text.chars().count();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    fn byte_at(&self, char_pos: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }
}

/// Compose pane state as the UI sees it.
#[derive(Default)]
pub struct ComposeView {
    pub input: InputLine,
    /// Open while the user types an attachment path.
    pub attach_prompt: Option<InputLine>,
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Border + input line + attachment line + border.
pub const COMPOSE_HEIGHT: u16 = 4;

/// What the compose box needs from the app besides its own view state.
pub struct ComposeProps<'a> {
    pub target: Option<&'a str>,
    pub attachment: Option<&'a Attachment>,
    pub uploading: bool,
    pub focused: bool,
}

pub fn render(area: Rect, frame: &mut Frame, view: &ComposeView, props: &ComposeProps) {
    let border_style = if props.uploading {
        Style::default().fg(Color::DarkGray)
    } else if props.focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let border_type = if props.focused {
        BorderType::Double
    } else {
        BorderType::Plain
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(border_style);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let input_area = Rect::new(inner.x, inner.y, inner.width, 1);
    let (line, cursor) = match view.attach_prompt {
        Some(ref prompt) => prompt_line(prompt, input_area.width as usize),
        None => input_line(view, props, input_area.width as usize),
    };
    Paragraph::new(line).render(input_area, frame.buffer_mut());
    if props.focused && !props.uploading {
        if let Some(offset) = cursor {
            frame.set_cursor_position((input_area.x + offset as u16, input_area.y));
        }
    }

    if inner.height >= 2 {
        let info_area = Rect::new(inner.x, inner.y + 1, inner.width, 1);
        render_attachment_line(info_area, frame.buffer_mut(), props);
    }
}

fn input_line(view: &ComposeView, props: &ComposeProps, width: usize) -> (Line<'static>, Option<usize>) {
    let Some(target) = props.target else {
        return (
            Line::from(Span::styled(
                " Pick a topic or a user to start chatting",
                Style::default().fg(Color::DarkGray),
            )),
            None,
        );
    };

    if view.input.text.is_empty() {
        let placeholder: String = format!(" Message {}...", target).chars().take(width).collect();
        return (
            Line::from(Span::styled(placeholder, Style::default().fg(Color::DarkGray))),
            Some(1),
        );
    }

    let display = scroll_to_cursor(&view.input.text, view.input.cursor, width.saturating_sub(1));
    let style = if props.uploading {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::White)
    };
    (
        Line::from(Span::styled(format!(" {}", display.visible), style)),
        Some(1 + display.cursor_offset),
    )
}

fn prompt_line(prompt: &InputLine, width: usize) -> (Line<'static>, Option<usize>) {
    const LABEL: &str = " Attach file: ";
    let avail = width.saturating_sub(LABEL.len());
    let display = scroll_to_cursor(&prompt.text, prompt.cursor, avail);
    (
        Line::from(vec![
            Span::styled(LABEL, Style::default().fg(Color::Cyan)),
            Span::styled(display.visible, Style::default().fg(Color::White)),
        ]),
        Some(LABEL.len() + display.cursor_offset),
    )
}

fn render_attachment_line(area: Rect, buf: &mut Buffer, props: &ComposeProps) {
    let line = match (props.attachment, props.uploading) {
        (Some(a), true) => Line::from(Span::styled(
            format!(" Uploading {}...", a.file_name),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        (Some(a), false) => Line::from(vec![
            Span::styled(" \u{1F4CE} ", Style::default().fg(Color::Cyan)),
            Span::styled(
                format!("{} ({}, {} bytes)", a.file_name, a.content_type, a.bytes.len()),
                Style::default().fg(Color::White),
            ),
            Span::styled("  C-x: remove", Style::default().fg(Color::DarkGray)),
        ]),
        (None, _) => Line::from(Span::styled(
            " Enter: send  Alt-Enter: newline  C-a: attach",
            Style::default().fg(Color::DarkGray),
        )),
    };
    Paragraph::new(line).render(area, buf);
}

struct DisplayText {
    visible: String,
    /// Cursor column within `visible`.
    cursor_offset: usize,
}

/// Flatten newlines to " | " and scroll horizontally so the cursor stays in view.
fn scroll_to_cursor(input: &str, cursor: usize, width: usize) -> DisplayText {
    if width == 0 {
        return DisplayText {
            visible: String::new(),
            cursor_offset: 0,
        };
    }

    let mut flat: Vec<char> = Vec::with_capacity(input.len());
    let mut flat_cursor = 0;
    for (i, ch) in input.chars().enumerate() {
        if i == cursor {
            flat_cursor = flat.len();
        }
        if ch == '\n' {
            flat.extend([' ', '|', ' ']);
        } else {
            flat.push(ch);
        }
    }
    if cursor >= input.chars().count() {
        flat_cursor = flat.len();
    }

    let start = if flat_cursor < width {
        0
    } else {
        flat_cursor + 1 - width
    };
    let end = (start + width).min(flat.len());
    DisplayText {
        visible: flat[start..end].iter().collect(),
        cursor_offset: flat_cursor - start,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_multibyte() {
        let mut line = InputLine::default();
        for c in "héllo".chars() {
            line.insert_char(c);
        }
        line.move_left();
        line.move_left();
        line.backspace();
        assert_eq!(line.text, "hélo");
        assert_eq!(line.cursor, 2);
        line.delete();
        assert_eq!(line.text, "héo");
        line.move_end();
        line.insert_char('!');
        assert_eq!(line.text, "héo!");
        line.move_home();
        line.backspace();
        assert_eq!(line.text, "héo!");
    }

    #[test]
    fn test_with_text_puts_cursor_at_end() {
        let line = InputLine::with_text("draft text");
        assert_eq!(line.cursor, 10);
    }

    #[test]
    fn test_scroll_keeps_cursor_visible() {
        let d = scroll_to_cursor("abcdefghij", 10, 4);
        assert_eq!(d.visible, "hij");
        assert_eq!(d.cursor_offset, 3);

        let d = scroll_to_cursor("abcdefghij", 0, 4);
        assert_eq!(d.visible, "abcd");
        assert_eq!(d.cursor_offset, 0);
    }

    #[test]
    fn test_newlines_flattened() {
        let d = scroll_to_cursor("a\nb", 3, 20);
        assert_eq!(d.visible, "a | b");
        assert_eq!(d.cursor_offset, 5);
    }
}
