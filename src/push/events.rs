//! Push frames and connection lifecycle events

use serde::Deserialize;

use crate::models::{ChannelId, ChatMessage, UserId};

/// A JSON text frame delivered over the push socket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PushEvent {
    Message {
        message: ChatMessage,
    },
    #[serde(rename_all = "camelCase")]
    Typing {
        channel_id: ChannelId,
        user_id: UserId,
        typing: bool,
    },
    Ping,
}

impl PushEvent {
    /// Parse a text frame. Unknown or malformed frames yield `None`.
    pub fn parse(frame: &str) -> Option<Self> {
        match serde_json::from_str(frame) {
            Ok(ev) => Some(ev),
            Err(e) => {
                tracing::debug!("Skipping push frame ({}): {}", e, frame);
                None
            }
        }
    }
}

/// State changes of the push connection, reported to the UI loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// (Re)connected. Client state must be reloaded wholesale.
    Connected,
    /// Connection lost; `attempt` is the reconnect attempt about to be made.
    Disconnected { attempt: u32 },
    /// Reconnection attempts exhausted; the client is offline.
    GaveUp,
}
