//! Compose box: reply banner plus a single-line text input.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::hub::{ComposeState, HubSession, ReplyTarget};

/// Height of the compose box: 1 border + 1 banner + 1 input + 1 border = 4 lines.
pub const COMPOSE_HEIGHT: u16 = 4;

/// Render the compose box into the given area.
///
/// Uses `Frame` directly so we can both write to the buffer and set cursor.
pub fn render(area: Rect, frame: &mut Frame, session: &HubSession, focused: bool) {
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
    frame.render_widget(block, area);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let banner_area = Rect::new(inner.x, inner.y, inner.width, 1);
    render_banner(banner_area, frame.buffer_mut(), session.reply_target(), focused);

    if inner.height >= 2 {
        let input_area = Rect::new(inner.x, inner.y + 1, inner.width, 1);
        let state = session.compose();
        let cursor = compute_cursor_position(input_area, state, focused);

        let channel_name = session
            .selected_channel()
            .and_then(|id| session.channel(id))
            .map(|c| format!("#{}", c.name));
        render_input(input_area, frame.buffer_mut(), state, channel_name.as_deref());

        if let Some((cx, cy)) = cursor {
            frame.set_cursor_position((cx, cy));
        }
    }
}

/// Compute the cursor position if the compose box is focused.
fn compute_cursor_position(
    input_area: Rect,
    state: &ComposeState,
    focused: bool,
) -> Option<(u16, u16)> {
    if !focused {
        return None;
    }

    if state.is_empty() {
        Some((input_area.x + 1, input_area.y))
    } else {
        let w = input_area.width as usize;
        let display = compose_display_text(state.text(), state.cursor(), w);
        let cursor_x = input_area.x + 1 + display.cursor_offset as u16;
        Some((cursor_x, input_area.y))
    }
}

/// Reply banner when replying, otherwise the key hints.
fn render_banner(area: Rect, buf: &mut Buffer, reply: Option<&ReplyTarget>, focused: bool) {
    let w = area.width as usize;

    let line = match reply {
        Some(target) => {
            let label = " Replying to: ";
            let hint = " Esc cancels ";
            let room = w.saturating_sub(label.len() + hint.len());
            let preview = truncate_to_width(&target.preview, room);
            let pad = room.saturating_sub(preview.width());
            Line::from(vec![
                Span::styled(
                    label,
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(preview, Style::default().fg(Color::Gray)),
                Span::raw(" ".repeat(pad)),
                Span::styled(hint, Style::default().fg(Color::DarkGray)),
            ])
        }
        None => {
            let style = if focused {
                Style::default().fg(Color::Gray)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let hint = " Enter send  Alt+Enter newline  Ctrl+U clear";
            Line::from(Span::styled(truncate_to_width(hint, w), style))
        }
    };

    Paragraph::new(line).render(area, buf);
}

/// Render the input line (with placeholder or text).
fn render_input(area: Rect, buf: &mut Buffer, state: &ComposeState, channel: Option<&str>) {
    let w = area.width as usize;

    if state.is_empty() {
        let placeholder = match channel {
            Some(name) => format!(" Type a message to {}...", name),
            None => " Select a channel to start typing".to_string(),
        };
        let style = Style::default().fg(Color::DarkGray);
        let truncated: String = placeholder.chars().take(w).collect();
        Paragraph::new(Line::from(Span::styled(truncated, style))).render(area, buf);
    } else {
        let display = compose_display_text(state.text(), state.cursor(), w);
        let line = Line::from(Span::styled(
            format!(" {}", display.visible),
            Style::default().fg(Color::White),
        ));
        Paragraph::new(line).render(area, buf);
    }
}

fn truncate_to_width(text: &str, max: usize) -> String {
    let mut out = String::new();
    for ch in text.chars() {
        if out.width() + unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0) > max {
            break;
        }
        out.push(ch);
    }
    out
}

/// Information about what text to display and where the cursor is.
struct DisplayText {
    visible: String,
    /// Cursor offset within the visible text (in columns).
    cursor_offset: usize,
}

/// Compute the visible text and cursor offset for display.
///
/// Newlines are shown as " | " separators on the single display line.
/// Horizontal scrolling keeps the cursor visible.
fn compose_display_text(input: &str, cursor_pos: usize, width: usize) -> DisplayText {
    let flat: String = input.replace('\n', " | ");

    // Newline expands to three columns.
    let flat_cursor: usize = input
        .chars()
        .take(cursor_pos)
        .map(|ch| if ch == '\n' { 3 } else { 1 })
        .sum();

    // One column is the leading margin.
    let avail = width.saturating_sub(1);
    if avail == 0 {
        return DisplayText {
            visible: String::new(),
            cursor_offset: 0,
        };
    }

    let flat_chars: Vec<char> = flat.chars().collect();
    if flat_chars.len() <= avail {
        return DisplayText {
            visible: flat,
            cursor_offset: flat_cursor,
        };
    }

    let scroll_start = if flat_cursor < avail {
        0
    } else {
        flat_cursor - avail + 1
    };
    let end = (scroll_start + avail).min(flat_chars.len());
    DisplayText {
        visible: flat_chars[scroll_start..end].iter().collect(),
        cursor_offset: flat_cursor - scroll_start,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_short_text_unscrolled() {
        let d = compose_display_text("hello", 5, 20);
        assert_eq!(d.visible, "hello");
        assert_eq!(d.cursor_offset, 5);
    }

    #[test]
    fn test_display_newline_expands() {
        let d = compose_display_text("a\nb", 3, 20);
        assert_eq!(d.visible, "a | b");
        assert_eq!(d.cursor_offset, 5);
    }

    #[test]
    fn test_display_scrolls_to_cursor() {
        let text = "abcdefghijklmnopqrstuvwxyz";
        let d = compose_display_text(text, 26, 11);
        assert_eq!(d.visible, "rstuvwxyz");
        assert_eq!(d.cursor_offset, 9);
    }

    #[test]
    fn test_cursor_hidden_when_unfocused() {
        let area = Rect::new(2, 5, 30, 1);
        let state = ComposeState::default();
        assert_eq!(compute_cursor_position(area, &state, false), None);
        assert_eq!(compute_cursor_position(area, &state, true), Some((3, 5)));
    }

    #[test]
    fn test_truncate_to_width() {
        assert_eq!(truncate_to_width("grades posted", 6), "grades");
        assert_eq!(truncate_to_width("short", 20), "short");
    }
}
