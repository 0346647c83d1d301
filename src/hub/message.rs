//! Messages as the hub renders them.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{ChannelId, ChatMessage, MessageId, UserId};

/// Identity of a rendered message.
///
/// A message is `Pending` until the server echo carrying the same correlation
/// id arrives; from then on it is known by its server id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    Confirmed(MessageId),
    Pending(Uuid),
}

/// Delivery status shown next to a bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Sent optimistically, waiting for the server echo.
    Pending,
    /// The transport reported failure. Stays on screen until the view reloads.
    Failed,
    Confirmed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub key: MessageKey,
    pub correlation_id: Option<Uuid>,
    pub channel_id: ChannelId,
    pub sender_id: UserId,
    pub sender_name: Option<String>,
    pub content: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub reply_to: Option<MessageId>,
}

impl Message {
    /// Build the optimistic form of a message the local user just sent.
    pub fn pending(
        correlation_id: Uuid,
        channel_id: ChannelId,
        sender_id: UserId,
        content: String,
        reply_to: Option<MessageId>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            key: MessageKey::Pending(correlation_id),
            correlation_id: Some(correlation_id),
            channel_id,
            sender_id,
            sender_name: None,
            content,
            timestamp: Some(timestamp),
            reply_to,
        }
    }

    pub fn server_id(&self) -> Option<MessageId> {
        match self.key {
            MessageKey::Confirmed(id) => Some(id),
            MessageKey::Pending(_) => None,
        }
    }
}

impl From<ChatMessage> for Message {
    fn from(m: ChatMessage) -> Self {
        Self {
            key: MessageKey::Confirmed(m.id),
            correlation_id: m.client_message_id,
            channel_id: m.channel_id,
            sender_id: m.sender_id,
            sender_name: m.sender_name,
            content: m.content,
            timestamp: m.timestamp,
            reply_to: m.reply_to_id,
        }
    }
}

/// A message together with its delivery status.
#[derive(Debug, Clone, PartialEq)]
pub struct Bubble {
    pub message: Message,
    pub delivery: Delivery,
}

impl Bubble {
    pub fn confirmed(message: Message) -> Self {
        Self {
            message,
            delivery: Delivery::Confirmed,
        }
    }

    pub fn pending(message: Message) -> Self {
        Self {
            message,
            delivery: Delivery::Pending,
        }
    }

    pub fn failed(message: Message) -> Self {
        Self {
            message,
            delivery: Delivery::Failed,
        }
    }
}
