//! Sidebar widget: channel list with unread badges, then the news feed.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};

use crate::hub::{ConnectionState, HubSession};
use crate::models::{Channel, ChannelId};

/// Sidebar navigation state. The channel data itself lives in the session.
#[derive(Default)]
pub struct SidebarState {
    /// Index into the session's channel list
    pub selected: usize,
}

impl SidebarState {
    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn move_down(&mut self, channel_count: usize) {
        if self.selected + 1 < channel_count {
            self.selected += 1;
        }
    }

    /// Clamp the selection after the channel list was replaced.
    pub fn clamp(&mut self, channel_count: usize) {
        if self.selected >= channel_count {
            self.selected = channel_count.saturating_sub(1);
        }
    }

    pub fn selected_id(&self, channels: &[Channel]) -> Option<ChannelId> {
        channels.get(self.selected).map(|c| c.id)
    }
}

/// One row in the sidebar's flat list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SidebarRow {
    ChannelsHeader,
    Channel(usize),
    NewsHeader,
    News(usize),
}

fn flat_rows(session: &HubSession) -> Vec<SidebarRow> {
    let mut rows = vec![SidebarRow::ChannelsHeader];
    rows.extend((0..session.channels().len()).map(SidebarRow::Channel));
    if !session.news().is_empty() {
        rows.push(SidebarRow::NewsHeader);
        rows.extend((0..session.news().len()).map(SidebarRow::News));
    }
    rows
}

/// Render the sidebar into the given area.
pub fn render(
    area: Rect,
    buf: &mut Buffer,
    session: &HubSession,
    state: &SidebarState,
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

    if session.channels().is_empty() {
        let text = match session.connection() {
            ConnectionState::Offline => " Offline",
            _ => " Loading...",
        };
        let line = Line::from(Span::styled(text, Style::default().fg(Color::DarkGray)));
        Paragraph::new(line).render(Rect::new(inner.x, inner.y, inner.width, 1), buf);
        return;
    }

    let rows = flat_rows(session);
    let available_height = inner.height as usize;
    // Row 0 is the header, so channel `n` sits on row `n + 1`.
    let scroll_offset = compute_scroll_offset(state.selected + 1, available_height, rows.len());

    for (row_idx, row) in rows
        .iter()
        .skip(scroll_offset)
        .take(available_height)
        .enumerate()
    {
        let row_area = Rect::new(inner.x, inner.y + row_idx as u16, inner.width, 1);
        render_item(buf, row_area, *row, session, state, focused);
    }
}

/// Simple scroll offset: keep selected item visible.
fn compute_scroll_offset(selected: usize, height: usize, total: usize) -> usize {
    if total <= height || selected < height {
        return 0;
    }
    let max_offset = total.saturating_sub(height);
    let offset = selected.saturating_sub(height - 1);
    offset.min(max_offset)
}

/// Style for a channel row based on selection and unread state.
fn item_style(selected: bool, has_unread: bool) -> Style {
    if selected {
        Style::default()
            .fg(Color::White)
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    } else if has_unread {
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    }
}

fn badge_style(selected: bool) -> Style {
    let style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    if selected {
        style.bg(Color::DarkGray)
    } else {
        style
    }
}

fn render_item(
    buf: &mut Buffer,
    area: Rect,
    row: SidebarRow,
    session: &HubSession,
    state: &SidebarState,
    focused: bool,
) {
    let w = area.width as usize;
    match row {
        SidebarRow::ChannelsHeader => {
            let label = if focused { ">> CHANNELS" } else { "   CHANNELS" };
            let style = Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD);
            render_row(buf, area, label, "", style, style);
        }

        SidebarRow::Channel(idx) => {
            let channel = &session.channels()[idx];
            let cursor_here = idx == state.selected;
            let open = session.selected_channel() == Some(channel.id);
            let cursor = if cursor_here { "\u{25BA}" } else { " " };
            let marker = if open { "#" } else { " " };
            let label = format!("{}{} {}", cursor, marker, channel.name);
            let badge = if channel.unread > 0 {
                channel.unread.to_string()
            } else {
                String::new()
            };

            let style = item_style(cursor_here, channel.unread > 0);
            let bstyle = if channel.unread > 0 {
                badge_style(cursor_here)
            } else {
                style
            };
            render_row(buf, area, &label, &badge, style, bstyle);
        }

        SidebarRow::NewsHeader => {
            let prefix = " -- NEWS ";
            let label = format!("{}{}", prefix, "-".repeat(w.saturating_sub(prefix.len())));
            let style = Style::default().fg(Color::DarkGray);
            render_row(buf, area, &label, "", style, style);
        }

        SidebarRow::News(idx) => {
            let item = &session.news()[idx];
            let label = format!("  {}", item.headline);
            let style = Style::default().fg(Color::Cyan).add_modifier(Modifier::DIM);
            render_row(buf, area, &label, "", style, style);
        }
    }
}

/// Render a row with left-aligned text and an optional right-aligned badge.
fn render_row(
    buf: &mut Buffer,
    area: Rect,
    left: &str,
    badge: &str,
    text_style: Style,
    badge_style: Style,
) {
    let width = area.width as usize;
    if width == 0 {
        return;
    }

    // Truncate left text if needed, leaving room for badge + 1 space
    let badge_len = badge.len();
    let max_left = if badge_len > 0 {
        width.saturating_sub(badge_len + 1)
    } else {
        width
    };

    let left_truncated: String = left.chars().take(max_left).collect();
    let left_len = left_truncated.chars().count();
    let pad = width.saturating_sub(left_len + badge_len);

    let line = Line::from(vec![
        Span::styled(left_truncated, text_style),
        Span::styled(" ".repeat(pad), text_style),
        Span::styled(badge.to_string(), badge_style),
    ]);

    Paragraph::new(line).render(area, buf);
}
