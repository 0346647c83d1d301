//! Message-related models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ChannelId, UserId};

/// Server-assigned message identifier (always positive).
pub type MessageId = i64;

/// A chat message as the server stores and broadcasts it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: MessageId,
    /// Correlation id chosen by the sending client, echoed back by the server.
    #[serde(default)]
    pub client_message_id: Option<Uuid>,
    pub channel_id: ChannelId,
    pub sender_id: UserId,
    #[serde(default)]
    pub sender_name: Option<String>,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reply_to_id: Option<MessageId>,
}

/// Body of a message or reply POST.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage<'a> {
    pub content: &'a str,
    pub client_message_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_minimal_fields() {
        let json = r#"{"id":7,"channelId":3,"senderId":12,"content":"hi"}"#;
        let msg: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.id, 7);
        assert_eq!(msg.channel_id, 3);
        assert!(msg.client_message_id.is_none());
        assert!(msg.timestamp.is_none());
        assert!(msg.reply_to_id.is_none());
    }

    #[test]
    fn test_chat_message_full_fields() {
        let json = r#"{
            "id": 41,
            "clientMessageId": "9f3c1d52-0c7e-4f5e-9a4f-2f0d8f0b6a11",
            "channelId": 3,
            "senderId": 12,
            "senderName": "Ms. Ortiz",
            "content": "Field trip forms due Friday",
            "timestamp": "2026-03-02T14:05:00Z",
            "replyToId": 40
        }"#;
        let msg: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.sender_name.as_deref(), Some("Ms. Ortiz"));
        assert_eq!(msg.reply_to_id, Some(40));
        assert_eq!(
            msg.client_message_id.unwrap().to_string(),
            "9f3c1d52-0c7e-4f5e-9a4f-2f0d8f0b6a11"
        );
        assert_eq!(msg.timestamp.unwrap().to_rfc3339(), "2026-03-02T14:05:00+00:00");
    }

    #[test]
    fn test_outgoing_message_uses_camel_case() {
        let id = Uuid::nil();
        let body = OutgoingMessage {
            content: "hello",
            client_message_id: id,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["content"], "hello");
        assert_eq!(v["clientMessageId"], id.to_string());
    }
}
