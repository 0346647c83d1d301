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
use super::compose;
use super::messages;
use super::sidebar;
use crate::hub::ConnectionState;

/// Status indicator symbol, label and color for the push connection
fn connection_indicator(state: ConnectionState) -> (&'static str, String, Color) {
    match state {
        ConnectionState::Online => ("*", "online".to_string(), Color::Green),
        ConnectionState::Connecting => ("~", "connecting".to_string(), Color::Yellow),
        ConnectionState::Reconnecting { attempt } => {
            ("~", format!("reconnecting ({})", attempt), Color::Yellow)
        }
        ConnectionState::Offline => ("o", "offline".to_string(), Color::Red),
    }
}

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
        Layout::horizontal([Constraint::Length(26), Constraint::Fill(1)]).areas(main_area);

    sidebar::render(
        sidebar_area,
        frame.buffer_mut(),
        &app.session,
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
        &app.session,
        &app.messages,
        app.active_pane == Pane::Messages,
    );

    compose::render(
        compose_area,
        frame,
        &app.session,
        app.active_pane == Pane::Compose,
    );

    render_status(status_area, frame.buffer_mut(), app);
}

fn render_header(area: Rect, buf: &mut Buffer, app: &App) {
    let title = " Heronix Hub";
    let (symbol, label, color) = connection_indicator(app.session.connection());
    let right = format!(" {} {} ", symbol, label);

    let padding_width = (area.width as usize).saturating_sub(title.len() + right.len());

    let header_line = Line::from(vec![
        Span::styled(
            title,
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" ".repeat(padding_width)),
        Span::styled(right, Style::default().fg(color)),
    ]);

    Paragraph::new(header_line)
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}

fn render_status(area: Rect, buf: &mut Buffer, app: &App) {
    // An alert takes over the whole bar until dismissed.
    if let Some(alert) = app.session.alert() {
        let style = if alert.is_error {
            Style::default().fg(Color::Red).bg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Yellow).bg(Color::DarkGray)
        };
        let line = Line::from(vec![
            Span::styled(format!(" {} ", alert.text), style),
            Span::styled(" (Esc to dismiss)", Style::default().fg(Color::Gray)),
        ]);
        Paragraph::new(line)
            .style(Style::default().bg(Color::DarkGray))
            .render(area, buf);
        return;
    }

    let sep_style = Style::default().fg(Color::Gray);

    let channel_display = app
        .session
        .selected_channel()
        .and_then(|id| app.session.channel(id))
        .map(|c| format!(" #{}", c.name))
        .unwrap_or_else(|| " (no channel)".to_string());

    let pending = app.session.pending();
    let pending_span = if pending.is_empty() {
        Span::styled("all sent", Style::default().fg(Color::Gray))
    } else {
        Span::styled(
            format!("{} unconfirmed", pending.len()),
            Style::default().fg(Color::Yellow),
        )
    };

    let status_line = Line::from(vec![
        Span::styled(channel_display, Style::default().fg(Color::Yellow)),
        Span::styled(" | ", sep_style),
        pending_span,
        Span::styled(" | ", sep_style),
        Span::styled(
            format!("Tab: {} ", app.active_pane.as_str()),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(" | ", sep_style),
        Span::styled("r: reply  q: quit", Style::default().fg(Color::Gray)),
    ]);

    Paragraph::new(status_line)
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}
