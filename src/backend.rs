//! Async backend: bridges the UI event loop with the hub's REST and push APIs.
//!
//! Uses an mpsc channel pair. The UI loop sends `BackendCommand` values, and a
//! background tokio task executes them and sends `BackendResponse` values back.
//! The push connection feeds the same response channel, so every network
//! result reaches the session through the UI loop and nowhere else.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::api;
use crate::api::client::HubClient;
use crate::config::Config;
use crate::models::{Channel, ChannelId, ChatMessage, MessageId, NewsItem, User};
use crate::push::{self, ConnectionEvent, PushEvent};

/// Commands sent from the UI loop to the async backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCommand {
    LoadChannels,
    LoadUsers,
    LoadNews,
    LoadMessages {
        channel_id: ChannelId,
        limit: usize,
    },
    SendMessage {
        channel_id: ChannelId,
        content: String,
        correlation_id: Uuid,
    },
    SendReply {
        channel_id: ChannelId,
        parent_id: MessageId,
        content: String,
        correlation_id: Uuid,
    },
    SendTyping {
        channel_id: ChannelId,
        typing: bool,
    },
}

/// Responses from the async backend to the UI loop.
pub enum BackendResponse {
    Channels(Result<Vec<Channel>>),
    Users(Result<Vec<User>>),
    News(Result<Vec<NewsItem>>),
    Messages {
        channel_id: ChannelId,
        result: Result<Vec<ChatMessage>>,
    },
    /// Completion of `SendMessage` or `SendReply`. Replies may return the
    /// stored message.
    MessageSent {
        correlation_id: Uuid,
        reply_to: Option<MessageId>,
        result: Result<Option<ChatMessage>>,
    },
    TypingSent(Result<()>),
    Push(PushEvent),
    Connection(ConnectionEvent),
    /// Initial client creation failed (bad configuration).
    ClientError(String),
}

/// Handle for interacting with the backend from the UI side.
pub struct Backend {
    cmd_tx: mpsc::UnboundedSender<BackendCommand>,
    resp_rx: mpsc::UnboundedReceiver<BackendResponse>,
}

impl Backend {
    /// Start the backend and the push connection.
    pub fn start(config: Config) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (resp_tx, resp_rx) = mpsc::unbounded_channel();

        tokio::spawn(backend_loop(config, cmd_rx, resp_tx));

        Self { cmd_tx, resp_rx }
    }

    /// Send a command to the backend (non-blocking).
    pub fn send(&self, cmd: BackendCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            tracing::error!("Backend channel closed -- command dropped");
        }
    }

    /// Receive a response from the backend.
    ///
    /// Suspends until a response is available. Returns `None` only when the
    /// backend channel is permanently closed (all senders dropped).
    /// Designed to be used inside `tokio::select!`.
    pub async fn recv(&mut self) -> Option<BackendResponse> {
        self.resp_rx.recv().await
    }
}

/// Background loop that processes commands.
///
/// Creates a HubClient once and reuses it across all API calls.
/// If client creation fails, sends a ClientError response and exits.
async fn backend_loop(
    config: Config,
    mut cmd_rx: mpsc::UnboundedReceiver<BackendCommand>,
    resp_tx: mpsc::UnboundedSender<BackendResponse>,
) {
    let client = match HubClient::with_config(&config) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            let _ = resp_tx.send(BackendResponse::ClientError(format!("{:#}", e)));
            return;
        }
    };

    match config.push_url() {
        Ok(url) => {
            tokio::spawn(push::run(
                url,
                config.token.clone(),
                config.reconnect_attempts,
                resp_tx.clone(),
            ));
        }
        Err(e) => {
            tracing::error!("No usable push URL: {:#}", e);
            let _ = resp_tx.send(BackendResponse::Connection(ConnectionEvent::GaveUp));
        }
    }

    while let Some(cmd) = cmd_rx.recv().await {
        let client = Arc::clone(&client);
        let resp_tx = resp_tx.clone();

        // Spawn each command as a separate task so we don't block the loop.
        tokio::spawn(async move {
            let response = execute(&client, cmd).await;
            let _ = resp_tx.send(response);
        });
    }
}

async fn execute(client: &HubClient, cmd: BackendCommand) -> BackendResponse {
    match cmd {
        BackendCommand::LoadChannels => BackendResponse::Channels(api::list_channels_data(client).await),
        BackendCommand::LoadUsers => BackendResponse::Users(api::list_users_data(client).await),
        BackendCommand::LoadNews => BackendResponse::News(api::list_news_data(client).await),
        BackendCommand::LoadMessages { channel_id, limit } => BackendResponse::Messages {
            channel_id,
            result: api::read_messages_data(client, channel_id, limit).await,
        },
        BackendCommand::SendMessage {
            channel_id,
            content,
            correlation_id,
        } => BackendResponse::MessageSent {
            correlation_id,
            reply_to: None,
            result: api::send_message_with_client_id(client, channel_id, &content, correlation_id)
                .await
                .map(|()| None),
        },
        BackendCommand::SendReply {
            channel_id,
            parent_id,
            content,
            correlation_id,
        } => BackendResponse::MessageSent {
            correlation_id,
            reply_to: Some(parent_id),
            result: api::send_reply(client, channel_id, parent_id, &content, correlation_id).await,
        },
        BackendCommand::SendTyping { channel_id, typing } => {
            BackendResponse::TypingSent(api::send_typing(client, channel_id, typing).await)
        }
    }
}
