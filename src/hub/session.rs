//! Hub session: the view-model behind the messaging screen.
//!
//! The session owns every piece of rendering state (channel list, open channel
//! view, pending sends, drafts, typing debounce, compose buffer). It performs
//! no I/O itself: operations queue [`BackendCommand`]s that the UI loop drains
//! and hands to the backend, and backend results come back through
//! [`HubSession::handle_response`]. Only the UI loop owns a session, so every
//! mutation happens on that one task.

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

use crate::backend::{BackendCommand, BackendResponse};
use crate::models::{Channel, ChannelId, ChatMessage, MessageId, NewsItem, User, UserId};
use crate::push::{ConnectionEvent, PushEvent};

use super::compose::ComposeState;
use super::drafts::Drafts;
use super::message::{Bubble, Delivery, Message};
use super::pending::{PendingSends, PendingState};
use super::timeline::Timeline;
use super::typing::{TypingDebounce, TypingSignal};

/// Why a send was refused before reaching the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendRejected {
    #[error("Type a message before sending.")]
    EmptyMessage,
    #[error("Select a channel before sending a message.")]
    NoChannelSelected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Online,
    Reconnecting { attempt: u32 },
    /// Reconnection gave up. The UI shows placeholder text instead of data.
    Offline,
}

/// User-facing message shown in the status bar until dismissed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub text: String,
    pub is_error: bool,
}

/// The message the next send replies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTarget {
    pub message_id: MessageId,
    pub preview: String,
}

/// The open channel: what the messages pane renders.
#[derive(Debug)]
pub struct ChannelView {
    pub channel_id: ChannelId,
    pub timeline: Timeline,
    /// Waiting for the history snapshot.
    pub loading: bool,
    /// Other users currently typing here.
    pub typing: BTreeSet<UserId>,
}

impl ChannelView {
    fn open(channel_id: ChannelId) -> Self {
        Self {
            channel_id,
            timeline: Timeline::new(),
            loading: true,
            typing: BTreeSet::new(),
        }
    }
}

pub struct HubSession {
    user_id: UserId,
    history_limit: usize,
    channels: Vec<Channel>,
    users: HashMap<UserId, User>,
    news: Vec<NewsItem>,
    selected: Option<ChannelId>,
    view: Option<ChannelView>,
    pending: PendingSends,
    drafts: Drafts,
    typing: TypingDebounce,
    compose: ComposeState,
    reply_target: Option<ReplyTarget>,
    connection: ConnectionState,
    alert: Option<Alert>,
    commands: Vec<BackendCommand>,
}

impl HubSession {
    pub fn new(user_id: UserId, history_limit: usize) -> Self {
        Self {
            user_id,
            history_limit,
            channels: Vec::new(),
            users: HashMap::new(),
            news: Vec::new(),
            selected: None,
            view: None,
            pending: PendingSends::new(),
            drafts: Drafts::new(),
            typing: TypingDebounce::new(),
            compose: ComposeState::default(),
            reply_target: None,
            connection: ConnectionState::Connecting,
            alert: None,
            commands: Vec::new(),
        }
    }

    // -- Accessors --

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == id)
    }

    pub fn news(&self) -> &[NewsItem] {
        &self.news
    }

    pub fn selected_channel(&self) -> Option<ChannelId> {
        self.selected
    }

    pub fn view(&self) -> Option<&ChannelView> {
        self.view.as_ref()
    }

    pub fn compose(&self) -> &ComposeState {
        &self.compose
    }

    pub fn reply_target(&self) -> Option<&ReplyTarget> {
        self.reply_target.as_ref()
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn alert(&self) -> Option<&Alert> {
        self.alert.as_ref()
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    pub fn pending(&self) -> &PendingSends {
        &self.pending
    }

    pub fn typing_deadline(&self) -> Option<Instant> {
        self.typing.deadline()
    }

    /// Display name for a sender, falling back to the user directory.
    pub fn display_name(&self, message: &Message) -> String {
        if message.sender_id == self.user_id {
            return "You".to_string();
        }
        message
            .sender_name
            .clone()
            .or_else(|| {
                self.users
                    .get(&message.sender_id)
                    .map(|u| u.display_name.clone())
            })
            .unwrap_or_else(|| format!("user {}", message.sender_id))
    }

    /// Names of the users typing in the open channel.
    pub fn typing_names(&self) -> Vec<String> {
        let Some(view) = &self.view else {
            return Vec::new();
        };
        view.typing
            .iter()
            .map(|id| {
                self.users
                    .get(id)
                    .map(|u| u.display_name.clone())
                    .unwrap_or_else(|| format!("user {}", id))
            })
            .collect()
    }

    /// Commands queued since the last call, in issue order.
    pub fn take_commands(&mut self) -> Vec<BackendCommand> {
        std::mem::take(&mut self.commands)
    }

    // -- Sending --

    /// Send the compose text to the selected channel.
    ///
    /// Rejections become an alert; nothing propagates to the caller's loop.
    pub fn submit_compose(&mut self) {
        let text = self.compose.text().to_string();
        match self.send(&text) {
            Ok(_) => {
                self.compose.clear();
                if let Some(channel) = self.selected {
                    self.drafts.clear(channel);
                }
            }
            Err(e) => {
                tracing::debug!("Send rejected: {}", e);
                self.alert = Some(Alert {
                    text: e.to_string(),
                    is_error: false,
                });
            }
        }
    }

    /// Optimistically send `content` to the selected channel.
    ///
    /// The message is rendered and registered as pending before the network
    /// command is queued. Returns the correlation id.
    pub fn send(&mut self, content: &str) -> Result<Uuid, SendRejected> {
        let content = content.trim();
        if content.is_empty() {
            return Err(SendRejected::EmptyMessage);
        }
        let channel_id = self.selected.ok_or(SendRejected::NoChannelSelected)?;

        let correlation_id = Uuid::new_v4();
        let now = Utc::now();
        let reply_to = self.reply_target.as_ref().map(|r| r.message_id);

        self.stop_typing();

        self.pending
            .register(correlation_id, channel_id, content.to_string(), reply_to, now);

        if let Some(view) = self.view.as_mut().filter(|v| v.channel_id == channel_id) {
            let message = Message::pending(
                correlation_id,
                channel_id,
                self.user_id,
                content.to_string(),
                reply_to,
                now,
            );
            view.timeline.insert(Bubble::pending(message));
        }

        tracing::debug!(
            "Sending {} to channel {} (reply_to={:?})",
            correlation_id,
            channel_id,
            reply_to
        );

        let command = match reply_to {
            Some(parent) => BackendCommand::SendReply {
                channel_id,
                parent_id: parent,
                content: content.to_string(),
                correlation_id,
            },
            None => BackendCommand::SendMessage {
                channel_id,
                content: content.to_string(),
                correlation_id,
            },
        };
        self.commands.push(command);

        Ok(correlation_id)
    }

    /// Completion of a send or reply.
    ///
    /// Failure flags the optimistic bubble; it is never retried or removed.
    pub fn on_send_result(
        &mut self,
        correlation_id: Uuid,
        reply_to: Option<MessageId>,
        result: anyhow::Result<Option<ChatMessage>>,
    ) {
        match result {
            Ok(Some(mut message)) => {
                // The returned message is the echo of this send.
                message.client_message_id.get_or_insert(correlation_id);
                self.on_incoming(message);
            }
            Ok(None) => {
                tracing::debug!("Send {} accepted, waiting for echo", correlation_id);
            }
            Err(e) => {
                tracing::warn!("Send {} failed: {:#}", correlation_id, e);
                if self.pending.fail(correlation_id) {
                    if let Some(view) = self.view.as_mut() {
                        view.timeline.mark_failed(correlation_id);
                    }
                } else {
                    tracing::debug!("Send {} already echoed; ignoring failure", correlation_id);
                }
            }
        }

        if let Some(parent) = reply_to {
            if self.reply_target.as_ref().map(|r| r.message_id) == Some(parent) {
                self.reply_target = None;
            }
        }
    }

    // -- Incoming --

    /// Process a message pushed by the server (including echoes of our own).
    pub fn on_incoming(&mut self, message: ChatMessage) {
        let echo = message
            .client_message_id
            .and_then(|cid| self.pending.confirm(cid).map(|_| cid));

        let channel_id = message.channel_id;
        let sender_id = message.sender_id;
        let shown = self.selected == Some(channel_id);

        if let Some(view) = self.view.as_mut() {
            if let Some(cid) = echo {
                view.timeline.remove_pending(cid);
            }
            if view.channel_id == channel_id {
                view.typing.remove(&sender_id);
            }
        }

        if shown {
            if let Some(view) = self.view.as_mut() {
                view.timeline.insert(Bubble::confirmed(message.into()));
            }
            return;
        }

        if echo.is_some() || sender_id == self.user_id {
            return;
        }
        match self.channels.iter_mut().find(|c| c.id == channel_id) {
            Some(channel) => channel.unread += 1,
            None => tracing::debug!("Message for unknown channel {}", channel_id),
        }
    }

    /// Another user started or stopped typing.
    pub fn on_typing(&mut self, channel_id: ChannelId, user_id: UserId, typing: bool) {
        if user_id == self.user_id {
            return;
        }
        let Some(view) = self.view.as_mut().filter(|v| v.channel_id == channel_id) else {
            return;
        };
        if typing {
            view.typing.insert(user_id);
        } else {
            view.typing.remove(&user_id);
        }
    }

    // -- Compose and typing --

    /// Apply an edit to the compose box. Edits that change the text count as
    /// keystrokes for the typing indicator.
    pub fn edit_compose(&mut self, now: Instant, edit: impl FnOnce(&mut ComposeState)) {
        let before = self.compose.text().to_string();
        edit(&mut self.compose);
        if self.compose.text() == before {
            return;
        }
        if let Some(channel_id) = self.selected {
            if let Some(signal) = self.typing.keystroke(channel_id, now) {
                self.queue_typing(signal);
            }
        }
    }

    /// The typing deadline fired.
    pub fn on_typing_deadline(&mut self, now: Instant) {
        if let Some(signal) = self.typing.expire(now) {
            self.queue_typing(signal);
        }
    }

    /// The compose box regained focus.
    pub fn on_compose_focus(&mut self) {
        self.stop_typing();
    }

    fn stop_typing(&mut self) {
        if let Some(signal) = self.typing.force_idle() {
            self.queue_typing(signal);
        }
    }

    fn queue_typing(&mut self, signal: TypingSignal) {
        let (channel_id, typing) = match signal {
            TypingSignal::Start(c) => (c, true),
            TypingSignal::Stop(c) => (c, false),
        };
        self.commands
            .push(BackendCommand::SendTyping { channel_id, typing });
    }

    // -- Replies --

    pub fn start_reply(&mut self, message_id: MessageId) {
        let preview = self
            .view
            .as_ref()
            .and_then(|v| {
                v.timeline
                    .bubbles()
                    .find(|b| b.message.server_id() == Some(message_id))
            })
            .map(|b| b.message.content.lines().next().unwrap_or("").to_string())
            .unwrap_or_default();
        self.reply_target = Some(ReplyTarget {
            message_id,
            preview,
        });
    }

    pub fn cancel_reply(&mut self) {
        self.reply_target = None;
    }

    // -- Channel selection --

    /// Switch the open channel.
    pub fn select_channel(&mut self, channel_id: ChannelId) {
        if self.selected == Some(channel_id) {
            return;
        }

        if let Some(left) = self.selected {
            self.drafts.save(left, self.compose.text());
        }
        self.stop_typing();
        self.close_view();
        self.reply_target = None;

        self.selected = Some(channel_id);
        if let Some(channel) = self.channels.iter_mut().find(|c| c.id == channel_id) {
            channel.unread = 0;
        }

        match self.drafts.get(channel_id) {
            Some(draft) => self.compose.set_text(draft),
            None => self.compose.clear(),
        }

        self.open_view(channel_id);
    }

    fn open_view(&mut self, channel_id: ChannelId) {
        self.view = Some(ChannelView::open(channel_id));
        self.commands.push(BackendCommand::LoadMessages {
            channel_id,
            limit: self.history_limit,
        });
    }

    fn close_view(&mut self) {
        if let Some(view) = self.view.take() {
            self.pending.forget_failed(view.channel_id);
        }
    }

    /// History snapshot for a channel view.
    pub fn on_history(&mut self, channel_id: ChannelId, result: anyhow::Result<Vec<ChatMessage>>) {
        if self.view.as_ref().map(|v| v.channel_id) != Some(channel_id) {
            tracing::debug!("Dropping stale history for channel {}", channel_id);
            return;
        }

        let messages = match result {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Failed to load channel {}: {:#}", channel_id, e);
                if let Some(view) = self.view.as_mut() {
                    view.loading = false;
                }
                self.alert = Some(Alert {
                    text: "Could not load messages for this channel.".to_string(),
                    is_error: true,
                });
                return;
            }
        };

        let mut timeline = Timeline::new();
        if messages.len() < self.history_limit {
            let name = self
                .channel(channel_id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| channel_id.to_string());
            timeline.push_notice(format!("Start of #{}", name));
        }

        // Pushes that arrived while loading are kept; the snapshot may predate them.
        if let Some(view) = self.view.as_ref() {
            for bubble in view
                .timeline
                .bubbles()
                .filter(|b| b.delivery == Delivery::Confirmed)
            {
                timeline.insert(bubble.clone());
            }
        }

        for message in messages {
            if let Some(cid) = message.client_message_id {
                self.pending.confirm(cid);
            }
            timeline.insert(Bubble::confirmed(message.into()));
        }

        for (cid, p) in self.pending.for_channel(channel_id) {
            let message = Message::pending(
                cid,
                channel_id,
                self.user_id,
                p.content.clone(),
                p.reply_to,
                p.sent_at,
            );
            timeline.insert(match p.state {
                PendingState::InFlight => Bubble::pending(message),
                PendingState::Failed => Bubble::failed(message),
            });
        }

        if let Some(view) = self.view.as_mut() {
            view.timeline = timeline;
            view.loading = false;
        }
    }

    // -- Bulk snapshots --

    /// Replace the channel list wholesale.
    pub fn on_channels(&mut self, result: anyhow::Result<Vec<Channel>>) {
        let mut channels = match result {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Failed to load channels: {:#}", e);
                return;
            }
        };

        if let Some(selected) = self.selected {
            match channels.iter_mut().find(|c| c.id == selected) {
                Some(c) => c.unread = 0,
                None => {
                    tracing::info!("Channel {} is gone; closing view", selected);
                    self.stop_typing();
                    self.close_view();
                    self.selected = None;
                    self.reply_target = None;
                    self.compose.clear();
                }
            }
        }
        self.channels = channels;
    }

    pub fn on_users(&mut self, result: anyhow::Result<Vec<User>>) {
        match result {
            Ok(users) => self.users = users.into_iter().map(|u| (u.id, u)).collect(),
            Err(e) => tracing::warn!("Failed to load users: {:#}", e),
        }
    }

    pub fn on_news(&mut self, result: anyhow::Result<Vec<NewsItem>>) {
        match result {
            Ok(news) => self.news = news,
            Err(e) => tracing::warn!("Failed to load news: {:#}", e),
        }
    }

    // -- Connection --

    pub fn on_connection(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Connected => {
                tracing::info!("Connected; reloading channel state");
                self.connection = ConnectionState::Online;
                self.commands.push(BackendCommand::LoadChannels);
                self.commands.push(BackendCommand::LoadUsers);
                self.commands.push(BackendCommand::LoadNews);
                if let Some(channel_id) = self.selected {
                    self.close_view();
                    self.open_view(channel_id);
                }
            }
            ConnectionEvent::Disconnected { attempt } => {
                self.connection = ConnectionState::Reconnecting { attempt };
                if let Some(view) = self.view.as_mut() {
                    view.typing.clear();
                }
            }
            ConnectionEvent::GaveUp => {
                tracing::warn!("Push connection gave up; switching to offline mode");
                self.connection = ConnectionState::Offline;
                if let Some(view) = self.view.as_mut() {
                    view.typing.clear();
                }
            }
        }
    }

    /// Route a backend response to the matching handler.
    pub fn handle_response(&mut self, response: BackendResponse) {
        match response {
            BackendResponse::Channels(r) => self.on_channels(r),
            BackendResponse::Users(r) => self.on_users(r),
            BackendResponse::News(r) => self.on_news(r),
            BackendResponse::Messages { channel_id, result } => self.on_history(channel_id, result),
            BackendResponse::MessageSent {
                correlation_id,
                reply_to,
                result,
            } => self.on_send_result(correlation_id, reply_to, result),
            BackendResponse::TypingSent(Err(e)) => {
                tracing::debug!("Typing notification failed: {:#}", e);
            }
            BackendResponse::TypingSent(Ok(())) => {}
            BackendResponse::Push(PushEvent::Message { message }) => self.on_incoming(message),
            BackendResponse::Push(PushEvent::Typing {
                channel_id,
                user_id,
                typing,
            }) => self.on_typing(channel_id, user_id, typing),
            BackendResponse::Push(PushEvent::Ping) => {}
            BackendResponse::Connection(event) => self.on_connection(event),
            BackendResponse::ClientError(e) => {
                tracing::error!("Backend unavailable: {}", e);
                self.connection = ConnectionState::Offline;
                self.alert = Some(Alert {
                    text: e,
                    is_error: true,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::anyhow;
    use chrono::{DateTime, TimeZone};

    use super::*;
    use crate::hub::message::{Delivery, MessageKey};
    use crate::hub::typing::TYPING_STOP_DELAY;

    const ME: UserId = 1;
    const COLLEAGUE: UserId = 2;

    fn channel(id: ChannelId, name: &str) -> Channel {
        Channel {
            id,
            name: name.to_string(),
            member_count: 20,
            unread: 0,
        }
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, 2, 10, minute, 0).unwrap()
    }

    fn incoming(id: i64, channel_id: ChannelId, minute: u32) -> ChatMessage {
        ChatMessage {
            id,
            client_message_id: None,
            channel_id,
            sender_id: COLLEAGUE,
            sender_name: Some("Mr. Patel".to_string()),
            content: format!("message {}", id),
            timestamp: Some(at(minute)),
            reply_to_id: None,
        }
    }

    /// A session with two channels and channel 1 open and loaded.
    fn session() -> HubSession {
        let mut s = HubSession::new(ME, 50);
        s.on_channels(Ok(vec![channel(1, "homeroom"), channel(2, "staff-room")]));
        s.select_channel(1);
        s.on_history(1, Ok(vec![]));
        s.take_commands();
        s
    }

    fn type_text(s: &mut HubSession, text: &str, now: Instant) {
        for c in text.chars() {
            s.edit_compose(now, |compose| compose.insert_char(c));
        }
    }

    fn bubbles(s: &HubSession) -> Vec<Bubble> {
        s.view().unwrap().timeline.bubbles().cloned().collect()
    }

    #[test]
    fn test_send_renders_pending_before_network() {
        let mut s = session();
        let cid = s.send("  Quiz moved to Thursday  ").unwrap();

        let b = bubbles(&s);
        assert_eq!(b.len(), 1);
        assert_eq!(b[0].delivery, Delivery::Pending);
        assert_eq!(b[0].message.key, MessageKey::Pending(cid));
        assert_eq!(b[0].message.content, "Quiz moved to Thursday");
        assert!(s.pending().get(cid).is_some());

        match s.take_commands().as_slice() {
            [BackendCommand::SendMessage {
                channel_id: 1,
                content,
                correlation_id,
            }] => {
                assert_eq!(content, "Quiz moved to Thursday");
                assert_eq!(*correlation_id, cid);
            }
            _ => panic!("expected a single SendMessage"),
        }
    }

    #[test]
    fn test_send_rejects_empty_and_unselected() {
        let mut s = session();
        assert_eq!(s.send("   "), Err(SendRejected::EmptyMessage));

        let mut fresh = HubSession::new(ME, 50);
        assert_eq!(fresh.send("hi"), Err(SendRejected::NoChannelSelected));
        assert_eq!(fresh.send(""), Err(SendRejected::EmptyMessage));
        assert!(fresh.take_commands().is_empty());
    }

    #[test]
    fn test_submit_rejection_raises_alert() {
        let mut s = HubSession::new(ME, 50);
        s.edit_compose(Instant::now(), |c| c.set_text("hello"));
        s.submit_compose();
        let alert = s.alert().unwrap();
        assert!(!alert.is_error);
        assert_eq!(alert.text, SendRejected::NoChannelSelected.to_string());
        assert_eq!(s.compose().text(), "hello");
    }

    #[test]
    fn test_echo_replaces_pending_without_duplicate() {
        let mut s = session();
        s.on_incoming(incoming(10, 1, 0));
        let cid = s.send("on my way").unwrap();
        s.on_incoming(incoming(11, 1, 59));

        let mut echo = incoming(12, 1, 30);
        echo.sender_id = ME;
        echo.client_message_id = Some(cid);
        echo.content = "on my way".to_string();
        s.on_incoming(echo);
        s.on_send_result(cid, None, Ok(None));

        let b = bubbles(&s);
        let mine: Vec<_> = b
            .iter()
            .filter(|b| b.message.content == "on my way")
            .collect();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].message.key, MessageKey::Confirmed(12));
        assert_eq!(mine[0].delivery, Delivery::Confirmed);
        assert!(s.pending().is_empty());
        let ids: Vec<_> = b.iter().filter_map(|b| b.message.server_id()).collect();
        assert_eq!(ids, vec![10, 12, 11]);
    }

    #[test]
    fn test_echo_before_send_completion_then_failure_is_ignored() {
        let mut s = session();
        let cid = s.send("hi").unwrap();
        let mut echo = incoming(5, 1, 1);
        echo.client_message_id = Some(cid);
        s.on_incoming(echo);
        s.on_send_result(cid, None, Err(anyhow!("timeout")));

        let b = bubbles(&s);
        assert_eq!(b.len(), 1);
        assert_eq!(b[0].delivery, Delivery::Confirmed);
    }

    #[test]
    fn test_failed_send_stays_flagged() {
        let mut s = session();
        let cid = s.send("test").unwrap();
        s.take_commands();
        s.on_send_result(cid, None, Err(anyhow!("503 Service Unavailable")));
        s.on_incoming(incoming(20, 1, 59));
        s.on_incoming(incoming(21, 2, 59));

        let b = bubbles(&s);
        let failed: Vec<_> = b
            .iter()
            .filter(|b| b.delivery == Delivery::Failed)
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].message.content, "test");
        assert!(s.take_commands().iter().all(|c| !matches!(
            c,
            BackendCommand::SendMessage { .. } | BackendCommand::SendReply { .. }
        )));
    }

    #[test]
    fn test_failed_send_dropped_when_view_reloads() {
        let mut s = session();
        let cid = s.send("test").unwrap();
        s.on_send_result(cid, None, Err(anyhow!("down")));
        s.select_channel(2);
        s.select_channel(1);
        s.on_history(1, Ok(vec![]));
        assert!(bubbles(&s).is_empty());
        assert!(s.pending().get(cid).is_none());
    }

    #[test]
    fn test_failure_while_away_shows_on_return() {
        let mut s = session();
        let cid = s.send("test").unwrap();
        s.select_channel(2);
        s.on_send_result(cid, None, Err(anyhow!("down")));
        s.select_channel(1);
        s.on_history(1, Ok(vec![]));

        let b = bubbles(&s);
        assert_eq!(b.len(), 1);
        assert_eq!(b[0].message.key, MessageKey::Pending(cid));
        assert_eq!(b[0].delivery, Delivery::Failed);
    }

    #[test]
    fn test_push_while_loading_survives_snapshot() {
        let mut s = session();
        s.select_channel(2);
        s.select_channel(1);
        s.on_incoming(incoming(77, 1, 5));
        s.on_history(1, Ok(vec![incoming(76, 1, 4)]));

        let keys: Vec<MessageKey> = bubbles(&s).iter().map(|b| b.message.key).collect();
        assert_eq!(keys, vec![MessageKey::Confirmed(76), MessageKey::Confirmed(77)]);
        assert!(!s.view().unwrap().loading);
    }

    #[test]
    fn test_own_echo_while_loading_survives_snapshot() {
        let mut s = session();
        let cid = s.send("hello").unwrap();
        s.select_channel(2);
        s.select_channel(1);

        let mut echo = incoming(80, 1, 6);
        echo.sender_id = ME;
        echo.client_message_id = Some(cid);
        s.on_incoming(echo.clone());
        s.on_history(1, Ok(vec![]));

        let b = bubbles(&s);
        assert_eq!(b.len(), 1);
        assert_eq!(b[0].message.key, MessageKey::Confirmed(80));
        assert!(s.pending().is_empty());

        // The same echo later appearing in a snapshot still renders once.
        s.on_connection(ConnectionEvent::Connected);
        s.on_incoming(echo.clone());
        s.on_history(1, Ok(vec![echo]));
        assert_eq!(bubbles(&s).len(), 1);
    }

    #[test]
    fn test_unread_counts_other_channels() {
        let mut s = session();
        for i in 0..3 {
            s.on_incoming(incoming(100 + i, 2, i as u32));
        }
        assert_eq!(s.channel(2).unwrap().unread, 3);
        assert_eq!(s.channel(1).unwrap().unread, 0);
        assert_eq!(bubbles(&s).len(), 0);

        s.select_channel(2);
        assert_eq!(s.channel(2).unwrap().unread, 0);
    }

    #[test]
    fn test_own_echo_in_other_channel_not_unread() {
        let mut s = session();
        let cid = s.send("bye").unwrap();
        s.select_channel(2);
        let mut echo = incoming(30, 1, 5);
        echo.client_message_id = Some(cid);
        s.on_incoming(echo);
        assert_eq!(s.channel(1).unwrap().unread, 0);
        assert!(s.pending().is_empty());
    }

    #[test]
    fn test_draft_round_trip() {
        let mut s = session();
        type_text(&mut s, "hello", Instant::now());
        s.select_channel(2);
        assert_eq!(s.compose().text(), "");
        s.select_channel(1);
        assert_eq!(s.compose().text(), "hello");
        assert_eq!(s.compose().cursor(), 5);
    }

    #[test]
    fn test_empty_input_clears_stale_draft() {
        let mut s = session();
        type_text(&mut s, "hello", Instant::now());
        s.select_channel(2);
        s.select_channel(1);
        s.edit_compose(Instant::now(), |c| c.clear());
        s.select_channel(2);
        s.select_channel(1);
        assert_eq!(s.compose().text(), "");
        assert_eq!(s.compose().cursor(), 0);
    }

    #[test]
    fn test_typing_start_once_and_stop_after_quiet_period() {
        let mut s = session();
        let t0 = Instant::now();
        let mut now = t0;
        let mut last = t0;
        while now <= t0 + Duration::from_secs(10) {
            s.on_typing_deadline(now);
            s.edit_compose(now, |c| c.insert_char('x'));
            last = now;
            now += Duration::from_millis(1900);
        }
        s.on_typing_deadline(last + Duration::from_millis(1500));
        s.on_typing_deadline(last + TYPING_STOP_DELAY);

        let typing: Vec<bool> = s
            .take_commands()
            .into_iter()
            .filter_map(|c| match c {
                BackendCommand::SendTyping { typing, .. } => Some(typing),
                _ => None,
            })
            .collect();
        assert_eq!(typing, vec![true, false]);
    }

    #[test]
    fn test_send_and_channel_switch_force_typing_stop() {
        let mut s = session();
        type_text(&mut s, "hi", Instant::now());
        s.submit_compose();
        let cmds = s.take_commands();
        assert!(matches!(
            cmds[0],
            BackendCommand::SendTyping {
                channel_id: 1,
                typing: true
            }
        ));
        assert!(matches!(
            cmds[1],
            BackendCommand::SendTyping {
                channel_id: 1,
                typing: false
            }
        ));
        assert!(matches!(cmds[2], BackendCommand::SendMessage { .. }));
        assert!(s.typing_deadline().is_none());
        assert_eq!(s.compose().text(), "");

        type_text(&mut s, "x", Instant::now());
        s.select_channel(2);
        let cmds = s.take_commands();
        assert!(cmds.iter().any(|c| matches!(
            c,
            BackendCommand::SendTyping {
                channel_id: 1,
                typing: false
            }
        )));
    }

    #[test]
    fn test_caret_moves_are_not_keystrokes() {
        let mut s = session();
        s.edit_compose(Instant::now(), |c| c.move_left());
        assert!(s.take_commands().is_empty());
        assert!(s.typing_deadline().is_none());
    }

    #[test]
    fn test_compose_refocus_stops_typing() {
        let mut s = session();
        type_text(&mut s, "a", Instant::now());
        s.take_commands();
        s.on_compose_focus();
        assert!(matches!(
            s.take_commands().as_slice(),
            [BackendCommand::SendTyping { typing: false, .. }]
        ));
    }

    #[test]
    fn test_reply_cleared_after_completion() {
        let mut s = session();
        s.on_incoming(incoming(40, 1, 1));
        s.start_reply(40);
        assert_eq!(s.reply_target().unwrap().preview, "message 40");

        let cid = s.send("agreed").unwrap();
        assert!(matches!(
            s.take_commands().last(),
            Some(BackendCommand::SendReply { parent_id: 40, .. })
        ));
        assert!(s.reply_target().is_some());

        s.on_send_result(cid, Some(40), Err(anyhow!("boom")));
        assert!(s.reply_target().is_none());
    }

    #[test]
    fn test_reply_result_message_counts_as_echo() {
        let mut s = session();
        s.on_incoming(incoming(40, 1, 1));
        s.start_reply(40);
        let cid = s.send("agreed").unwrap();

        let mut reply = incoming(41, 1, 2);
        reply.client_message_id = Some(cid);
        reply.reply_to_id = Some(40);
        s.on_send_result(cid, Some(40), Ok(Some(reply.clone())));
        // The push echo of the same reply arrives afterwards.
        s.on_incoming(reply);

        let b = bubbles(&s);
        assert_eq!(b.len(), 2);
        assert_eq!(b[1].message.key, MessageKey::Confirmed(41));
        assert_eq!(b[1].message.reply_to, Some(40));
    }

    #[test]
    fn test_reply_result_without_client_id_still_reconciles() {
        let mut s = session();
        s.on_incoming(incoming(40, 1, 1));
        s.start_reply(40);
        let cid = s.send("see you there").unwrap();

        let mut reply = incoming(42, 1, 3);
        reply.sender_id = ME;
        reply.reply_to_id = Some(40);
        s.on_send_result(cid, Some(40), Ok(Some(reply)));

        assert!(s.pending().is_empty());
        let b = bubbles(&s);
        assert_eq!(b.len(), 2);
        assert!(b.iter().all(|b| b.delivery == Delivery::Confirmed));
    }

    #[test]
    fn test_history_merges_in_flight_sends() {
        let mut s = session();
        let confirmed = s.send("first").unwrap();
        let waiting = s.send("second").unwrap();
        s.select_channel(2);
        s.select_channel(1);

        let mut echoed = incoming(50, 1, 1);
        echoed.client_message_id = Some(confirmed);
        s.on_history(1, Ok(vec![incoming(49, 1, 0), echoed]));

        let b = bubbles(&s);
        assert_eq!(b.len(), 3);
        assert_eq!(b[2].message.key, MessageKey::Pending(waiting));
        assert!(s.pending().get(confirmed).is_none());
        assert!(matches!(
            s.view().unwrap().timeline.entries()[0],
            crate::hub::timeline::Entry::Notice(_)
        ));
    }

    #[test]
    fn test_stale_history_is_ignored() {
        let mut s = session();
        s.select_channel(2);
        s.on_history(1, Ok(vec![incoming(1, 1, 0)]));
        assert!(s.view().unwrap().loading);
        assert_eq!(s.view().unwrap().channel_id, 2);
    }

    #[test]
    fn test_history_failure_raises_alert() {
        let mut s = session();
        s.select_channel(2);
        s.on_history(2, Err(anyhow!("500")));
        assert!(!s.view().unwrap().loading);
        assert!(s.alert().unwrap().is_error);
    }

    #[test]
    fn test_remote_typing_indicator() {
        let mut s = session();
        s.on_users(Ok(vec![User {
            id: COLLEAGUE,
            display_name: "Mr. Patel".to_string(),
            online: true,
        }]));
        s.on_typing(1, COLLEAGUE, true);
        s.on_typing(1, ME, true);
        s.on_typing(2, 3, true);
        assert_eq!(s.typing_names(), vec!["Mr. Patel".to_string()]);

        s.on_incoming(incoming(60, 1, 3));
        assert!(s.typing_names().is_empty());
    }

    #[test]
    fn test_reconnect_reloads_everything() {
        let mut s = session();
        s.on_connection(ConnectionEvent::Disconnected { attempt: 1 });
        assert_eq!(s.connection(), ConnectionState::Reconnecting { attempt: 1 });

        s.on_connection(ConnectionEvent::Connected);
        assert_eq!(s.connection(), ConnectionState::Online);
        let cmds = s.take_commands();
        assert!(matches!(cmds[0], BackendCommand::LoadChannels));
        assert!(matches!(cmds[1], BackendCommand::LoadUsers));
        assert!(matches!(cmds[2], BackendCommand::LoadNews));
        assert!(matches!(
            cmds[3],
            BackendCommand::LoadMessages { channel_id: 1, .. }
        ));
        assert!(s.view().unwrap().loading);
    }

    #[test]
    fn test_gave_up_goes_offline_without_alert() {
        let mut s = session();
        s.on_connection(ConnectionEvent::GaveUp);
        assert_eq!(s.connection(), ConnectionState::Offline);
        assert!(s.alert().is_none());
    }

    #[test]
    fn test_channel_snapshot_drops_missing_selection() {
        let mut s = session();
        s.on_channels(Ok(vec![channel(2, "staff-room")]));
        assert_eq!(s.selected_channel(), None);
        assert!(s.view().is_none());
        assert_eq!(s.send("hi"), Err(SendRejected::NoChannelSelected));
    }

    #[test]
    fn test_display_names() {
        let mut s = session();
        s.on_users(Ok(vec![User {
            id: 7,
            display_name: "Coach Kim".to_string(),
            online: false,
        }]));
        let mut m: Message = incoming(1, 1, 0).into();
        assert_eq!(s.display_name(&m), "Mr. Patel");
        m.sender_name = None;
        m.sender_id = 7;
        assert_eq!(s.display_name(&m), "Coach Kim");
        m.sender_id = ME;
        assert_eq!(s.display_name(&m), "You");
    }
}
