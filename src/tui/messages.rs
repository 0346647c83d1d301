//! Messages pane: renders the open channel view.

use chrono::Local;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};

use crate::hub::{Bubble, ConnectionState, Delivery, Entry, HubSession};
use crate::models::MessageId;

/// Navigation state for the messages pane.
pub struct MessagesState {
    /// Index of the highlighted bubble (notices are not selectable).
    pub selected: usize,
    /// Keep the newest message highlighted as new ones arrive.
    pub follow: bool,
}

impl Default for MessagesState {
    fn default() -> Self {
        Self {
            selected: 0,
            follow: true,
        }
    }
}

impl MessagesState {
    pub fn select_previous(&mut self) {
        self.follow = false;
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self, bubble_count: usize) {
        if self.selected + 1 < bubble_count {
            self.selected += 1;
        }
        self.follow = self.selected + 1 >= bubble_count;
    }

    /// Re-anchor after the timeline changed.
    pub fn sync(&mut self, bubble_count: usize) {
        if self.follow || self.selected >= bubble_count {
            self.selected = bubble_count.saturating_sub(1);
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Server id of the highlighted message, if it is confirmed.
    pub fn selected_message_id(&self, session: &HubSession) -> Option<MessageId> {
        session
            .view()?
            .timeline
            .bubbles()
            .nth(self.selected)?
            .message
            .server_id()
    }
}

/// Render the messages pane into the given area.
pub fn render(
    area: Rect,
    buf: &mut Buffer,
    session: &HubSession,
    state: &MessagesState,
    focused: bool,
) {
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

    // Reserve the first line for the channel header.
    let header_area = Rect::new(inner.x, inner.y, inner.width, 1);
    let header = session
        .selected_channel()
        .and_then(|id| session.channel(id))
        .map(|c| format!("#{}  ({} members)", c.name, c.member_count))
        .unwrap_or_else(|| "No channel selected".to_string());
    render_channel_header(header_area, buf, &header);

    let messages_area = Rect::new(
        inner.x,
        inner.y + 1,
        inner.width,
        inner.height.saturating_sub(1),
    );
    if messages_area.height == 0 {
        return;
    }

    let Some(view) = session.view() else {
        let text = if session.connection() == ConnectionState::Offline {
            " Offline - the hub cannot be reached. Messages will not be delivered."
        } else {
            " Pick a channel on the left and press Enter."
        };
        render_placeholder(messages_area, buf, text);
        return;
    };

    if view.loading {
        render_placeholder(messages_area, buf, " Loading messages...");
        return;
    }

    if view.timeline.is_empty() {
        render_placeholder(messages_area, buf, " No messages yet. Say hello!");
        return;
    }

    let (mut all_lines, msg_line_ranges) =
        build_message_lines(session, view.timeline.entries(), state, messages_area.width as usize);

    let typing = session.typing_names();
    if !typing.is_empty() {
        let who = typing.join(", ");
        let verb = if typing.len() == 1 { "is" } else { "are" };
        all_lines.push(Line::from(Span::styled(
            format!(" {} {} typing...", who, verb),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )));
    }

    let total_lines = all_lines.len();
    let visible_height = messages_area.height as usize;
    let scroll = compute_auto_scroll(
        state.selected,
        state.follow,
        &msg_line_ranges,
        visible_height,
        total_lines,
    );

    for (row, line) in all_lines
        .into_iter()
        .skip(scroll)
        .take(visible_height)
        .enumerate()
    {
        let line_area = Rect::new(
            messages_area.x,
            messages_area.y + row as u16,
            messages_area.width,
            1,
        );
        Paragraph::new(line).render(line_area, buf);
    }

    // Scroll indicators.
    if total_lines > visible_height {
        let indicator_x = messages_area.x + messages_area.width.saturating_sub(1);
        if scroll > 0 {
            let cell = &mut buf[(indicator_x, messages_area.y)];
            cell.set_char('^');
            cell.set_style(Style::default().fg(Color::DarkGray));
        }
        if scroll + visible_height < total_lines {
            let bottom_y = messages_area.y + messages_area.height.saturating_sub(1);
            let cell = &mut buf[(indicator_x, bottom_y)];
            cell.set_char('v');
            cell.set_style(Style::default().fg(Color::DarkGray));
        }
    }
}

fn render_channel_header(area: Rect, buf: &mut Buffer, header: &str) {
    let line = Line::from(vec![Span::styled(
        format!(" {} ", header),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    )]);
    Paragraph::new(line)
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}

fn render_placeholder(area: Rect, buf: &mut Buffer, text: &str) {
    let line = Line::from(Span::styled(
        text.to_string(),
        Style::default().fg(Color::DarkGray),
    ));
    Paragraph::new(line).render(Rect::new(area.x, area.y, area.width, 1), buf);
}

/// Build the flat line buffer and per-bubble line ranges in a single pass.
fn build_message_lines(
    session: &HubSession,
    entries: &[Entry],
    state: &MessagesState,
    width: usize,
) -> (Vec<Line<'static>>, Vec<(usize, usize)>) {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut ranges: Vec<(usize, usize)> = Vec::new();

    for entry in entries {
        match entry {
            Entry::Notice(text) => {
                let pad = width.saturating_sub(text.chars().count() + 4) / 2;
                lines.push(Line::from(Span::styled(
                    format!("{}-- {} --", " ".repeat(pad), text),
                    Style::default().fg(Color::DarkGray),
                )));
                lines.push(Line::from(""));
            }
            Entry::Message(bubble) => {
                let start = lines.len();
                let is_selected = ranges.len() == state.selected;
                let sender = session.display_name(&bubble.message);
                render_message_card(&mut lines, bubble, &sender, width, is_selected);
                lines.push(Line::from(""));
                ranges.push((start, lines.len()));
            }
        }
    }

    (lines, ranges)
}

/// Render a single message card into the line buffer.
fn render_message_card(
    lines: &mut Vec<Line<'static>>,
    bubble: &Bubble,
    sender: &str,
    width: usize,
    is_selected: bool,
) {
    let card_inner_width = width.saturating_sub(2);
    if card_inner_width < 10 {
        return;
    }

    let border_style = if is_selected {
        Style::default().fg(Color::Yellow)
    } else if bubble.delivery == Delivery::Failed {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::Gray)
    };

    let sender_style = Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD);
    let timestamp_style = Style::default().fg(Color::DarkGray);

    let timestamp = bubble
        .message
        .timestamp
        .map(|t| t.with_timezone(&Local).format("%b %d %H:%M").to_string())
        .unwrap_or_default();

    lines.push(Line::from(Span::styled(
        format!("+-{}-+", "-".repeat(card_inner_width.saturating_sub(2))),
        border_style,
    )));

    // Sender line: "| sender              timestamp |"
    let sender_ts_pad = card_inner_width
        .saturating_sub(sender.chars().count())
        .saturating_sub(timestamp.len())
        .saturating_sub(2);
    lines.push(Line::from(vec![
        Span::styled("| ".to_string(), border_style),
        Span::styled(sender.to_string(), sender_style),
        Span::raw(" ".repeat(sender_ts_pad)),
        Span::styled(timestamp, timestamp_style),
        Span::styled(" |".to_string(), border_style),
    ]));

    let content_width = card_inner_width.saturating_sub(2);

    if let Some(parent) = bubble.message.reply_to {
        let text = format!("re: message {}", parent);
        let pad = content_width.saturating_sub(text.len());
        lines.push(Line::from(vec![
            Span::styled("| ".to_string(), border_style),
            Span::styled(text, Style::default().fg(Color::Cyan).add_modifier(Modifier::DIM)),
            Span::raw(" ".repeat(pad)),
            Span::styled(" |".to_string(), border_style),
        ]));
    }

    for cl in wrap_text(&bubble.message.content, content_width) {
        let pad = content_width.saturating_sub(cl.chars().count());
        lines.push(Line::from(vec![
            Span::styled("| ".to_string(), border_style),
            Span::raw(format!("{}{}", cl, " ".repeat(pad))),
            Span::styled(" |".to_string(), border_style),
        ]));
    }

    let status = match bubble.delivery {
        Delivery::Pending => Some(("sending...", Style::default().fg(Color::DarkGray))),
        Delivery::Failed => Some((
            "! not delivered",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Delivery::Confirmed => None,
    };
    if let Some((text, style)) = status {
        let pad = content_width.saturating_sub(text.len());
        lines.push(Line::from(vec![
            Span::styled("| ".to_string(), border_style),
            Span::raw(" ".repeat(pad)),
            Span::styled(text.to_string(), style),
            Span::styled(" |".to_string(), border_style),
        ]));
    }

    lines.push(Line::from(Span::styled(
        format!("+-{}-+", "-".repeat(card_inner_width.saturating_sub(2))),
        border_style,
    )));
}

/// Simple word-wrapping: split content by newlines first, then wrap long lines.
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![];
    }
    let mut result = Vec::new();
    for line in text.lines() {
        if line.chars().count() <= max_width {
            result.push(line.to_string());
            continue;
        }
        let mut current = String::new();
        for word in line.split_whitespace() {
            if current.is_empty() {
                current = word.to_string();
            } else if current.chars().count() + 1 + word.chars().count() <= max_width {
                current.push(' ');
                current.push_str(word);
            } else {
                result.push(std::mem::take(&mut current));
                current = word.to_string();
            }
        }
        if !current.is_empty() {
            result.push(current);
        }
    }
    result
}

/// Scroll offset that keeps the highlighted message visible, or pins the view
/// to the bottom while following new messages.
fn compute_auto_scroll(
    selected: usize,
    follow: bool,
    ranges: &[(usize, usize)],
    visible_height: usize,
    total_lines: usize,
) -> usize {
    let max_scroll = total_lines.saturating_sub(visible_height);
    if total_lines <= visible_height {
        return 0;
    }
    if follow {
        return max_scroll;
    }

    let Some(&(sel_start, sel_end)) = ranges.get(selected) else {
        return max_scroll;
    };

    // Tall messages show their start; others are scrolled fully into view
    // with as much history above them as fits.
    let scroll = if sel_end.saturating_sub(sel_start) >= visible_height {
        sel_start
    } else {
        sel_end.saturating_sub(visible_height)
    };
    scroll.min(max_scroll)
}
