//! TUI application state and main event loop

use anyhow::{Context, Result};
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::DefaultTerminal;
use tokio::time::{sleep_until, Instant};
use tokio_stream::StreamExt;

use super::messages::MessagesState;
use super::sidebar::SidebarState;
use super::ui;
use crate::backend::{Backend, BackendCommand, BackendResponse};
use crate::config::Config;
use crate::hub::HubSession;

/// Active pane in the TUI
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    #[default]
    Sidebar,
    Messages,
    Compose,
}

impl Pane {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pane::Sidebar => "sidebar",
            Pane::Messages => "messages",
            Pane::Compose => "compose",
        }
    }

    fn next(self) -> Self {
        match self {
            Pane::Sidebar => Pane::Messages,
            Pane::Messages => Pane::Compose,
            Pane::Compose => Pane::Sidebar,
        }
    }

    fn previous(self) -> Self {
        match self {
            Pane::Sidebar => Pane::Compose,
            Pane::Messages => Pane::Sidebar,
            Pane::Compose => Pane::Messages,
        }
    }
}

/// Application state
pub struct App {
    pub session: HubSession,
    pub sidebar: SidebarState,
    pub messages: MessagesState,
    pub active_pane: Pane,
    pub should_exit: bool,
}

impl App {
    pub fn new(session: HubSession) -> Self {
        Self {
            session,
            sidebar: SidebarState::default(),
            messages: MessagesState::default(),
            active_pane: Pane::default(),
            should_exit: false,
        }
    }

    fn bubble_count(&self) -> usize {
        self.session
            .view()
            .map(|v| v.timeline.message_count())
            .unwrap_or(0)
    }

    fn focus(&mut self, pane: Pane) {
        if pane == Pane::Compose && self.active_pane != Pane::Compose {
            self.session.on_compose_focus();
        }
        self.active_pane = pane;
    }

    /// Apply a backend result and re-anchor the navigation state.
    pub fn on_response(&mut self, response: BackendResponse) {
        let channels_changed = matches!(response, BackendResponse::Channels(_));
        self.session.handle_response(response);

        if channels_changed {
            let channels = self.session.channels();
            match self
                .session
                .selected_channel()
                .and_then(|id| channels.iter().position(|c| c.id == id))
            {
                Some(idx) => self.sidebar.selected = idx,
                None => self.sidebar.clamp(channels.len()),
            }
        }
        let count = self.bubble_count();
        self.messages.sync(count);
    }

    /// Handle a key press.
    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_exit = true;
            return;
        }

        match key.code {
            KeyCode::Tab => {
                self.focus(self.active_pane.next());
                return;
            }
            KeyCode::BackTab => {
                self.focus(self.active_pane.previous());
                return;
            }
            KeyCode::Esc => {
                if self.session.reply_target().is_some() {
                    self.session.cancel_reply();
                } else {
                    self.session.dismiss_alert();
                }
                return;
            }
            _ => {}
        }

        match self.active_pane {
            Pane::Sidebar => self.handle_sidebar_key(key),
            Pane::Messages => self.handle_messages_key(key),
            Pane::Compose => self.handle_compose_key(key, now),
        }
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent) {
        let count = self.session.channels().len();
        match key.code {
            KeyCode::Char('q') => self.should_exit = true,
            KeyCode::Up | KeyCode::Char('k') => self.sidebar.move_up(),
            KeyCode::Down | KeyCode::Char('j') => self.sidebar.move_down(count),
            KeyCode::Enter => {
                if let Some(id) = self.sidebar.selected_id(self.session.channels()) {
                    if self.session.selected_channel() != Some(id) {
                        self.session.select_channel(id);
                        self.messages.reset();
                    }
                    self.focus(Pane::Compose);
                }
            }
            _ => {}
        }
    }

    fn handle_messages_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_exit = true,
            KeyCode::Up | KeyCode::Char('k') => self.messages.select_previous(),
            KeyCode::Down | KeyCode::Char('j') => {
                let count = self.bubble_count();
                self.messages.select_next(count);
            }
            KeyCode::Char('r') => {
                if let Some(id) = self.messages.selected_message_id(&self.session) {
                    self.session.start_reply(id);
                    self.focus(Pane::Compose);
                }
            }
            _ => {}
        }
    }

    fn handle_compose_key(&mut self, key: KeyEvent, now: Instant) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        match key.code {
            KeyCode::Enter if alt => self.session.edit_compose(now, |c| c.insert_newline()),
            KeyCode::Enter => {
                self.session.submit_compose();
                self.messages.follow = true;
                let count = self.bubble_count();
                self.messages.sync(count);
            }
            KeyCode::Char('u') if ctrl => self.session.edit_compose(now, |c| c.clear()),
            KeyCode::Char(ch) if !ctrl => self.session.edit_compose(now, |c| c.insert_char(ch)),
            KeyCode::Backspace => self.session.edit_compose(now, |c| c.backspace()),
            KeyCode::Delete => self.session.edit_compose(now, |c| c.delete()),
            KeyCode::Left => self.session.edit_compose(now, |c| c.move_left()),
            KeyCode::Right => self.session.edit_compose(now, |c| c.move_right()),
            KeyCode::Home => self.session.edit_compose(now, |c| c.move_home()),
            KeyCode::End => self.session.edit_compose(now, |c| c.move_end()),
            _ => {}
        }
    }
}

/// Run the TUI application.
pub async fn run() -> Result<()> {
    let config = Config::load()?;
    let user_id = config
        .user_id
        .context("user_id is not configured; run `heronix-hub configure --user-id <ID>`")?;
    let session = HubSession::new(user_id, config.history_limit);

    let backend = Backend::start(config);
    let mut terminal = ratatui::init();
    let result = run_app(&mut terminal, App::new(session), backend).await;
    ratatui::restore();
    result
}

async fn run_app(terminal: &mut DefaultTerminal, mut app: App, mut backend: Backend) -> Result<()> {
    let mut events = EventStream::new();
    let mut backend_alive = true;

    for cmd in [
        BackendCommand::LoadChannels,
        BackendCommand::LoadUsers,
        BackendCommand::LoadNews,
    ] {
        backend.send(cmd);
    }

    while !app.should_exit {
        terminal.draw(|frame| ui::render(frame, &app))?;

        let deadline = app.session.typing_deadline();
        tokio::select! {
            maybe_event = events.next() => match maybe_event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    app.handle_key(key, Instant::now());
                }
                // Resize and other events just trigger a redraw.
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("Failed to read terminal event"),
                None => break,
            },
            response = backend.recv(), if backend_alive => match response {
                Some(response) => app.on_response(response),
                None => {
                    tracing::warn!("Backend stopped");
                    backend_alive = false;
                }
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                app.session.on_typing_deadline(Instant::now());
            }
        }

        for cmd in app.session.take_commands() {
            backend.send(cmd);
        }
    }

    Ok(())
}
