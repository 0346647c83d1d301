//! Channel and message endpoints of the hub REST API

use anyhow::{Context, Result};
use serde::Serialize;
use uuid::Uuid;

use super::client::HubClient;
use crate::models::{Channel, ChannelId, ChatMessage, MessageId, OutgoingMessage};

#[derive(Debug, Serialize)]
struct TypingBody {
    typing: bool,
}

fn messages_path(channel_id: ChannelId) -> String {
    format!("api/channels/{}/messages", channel_id)
}

fn replies_path(channel_id: ChannelId, parent_id: MessageId) -> String {
    format!("api/channels/{}/messages/{}/replies", channel_id, parent_id)
}

/// List channels visible to the current user (prints to stdout).
pub async fn list_channels() -> Result<()> {
    let client = HubClient::new()?;
    let channels = list_channels_data(&client).await?;

    println!("\nChannels:");
    println!("{:-<60}", "");

    if channels.is_empty() {
        println!("  (no channels)");
        return Ok(());
    }

    for channel in &channels {
        let badge = if channel.unread > 0 {
            format!("  [{} unread]", channel.unread)
        } else {
            String::new()
        };
        println!("#{}{}", channel.name, badge);
        println!("  ID: {}  Members: {}", channel.id, channel.member_count);
    }

    Ok(())
}

/// Print the most recent messages of a channel.
pub async fn read_messages(channel_id: ChannelId, limit: usize) -> Result<()> {
    let client = HubClient::new()?;
    let msgs = read_messages_data(&client, channel_id, limit).await?;

    if msgs.is_empty() {
        println!("(no messages)");
        return Ok(());
    }

    for msg in &msgs {
        let time = msg
            .timestamp
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "?".to_string());
        let sender = msg
            .sender_name
            .clone()
            .unwrap_or_else(|| format!("user {}", msg.sender_id));
        println!("[{}] {}: {}", time, sender, msg.content);
    }

    Ok(())
}

/// Send a message from the command line.
pub async fn send_message(channel_id: ChannelId, message: &str) -> Result<()> {
    let client = HubClient::new()?;
    let correlation_id = Uuid::new_v4();
    send_message_with_client_id(&client, channel_id, message, correlation_id).await?;
    println!("Message sent ({}).", correlation_id);
    Ok(())
}

// ---------------------------------------------------------------------------
// Data-returning API functions for the backend
// ---------------------------------------------------------------------------

pub async fn list_channels_data(client: &HubClient) -> Result<Vec<Channel>> {
    client
        .get_json("api/channels")
        .await
        .context("Failed to load channels")
}

/// Most recent `limit` messages of a channel, oldest first.
pub async fn read_messages_data(
    client: &HubClient,
    channel_id: ChannelId,
    limit: usize,
) -> Result<Vec<ChatMessage>> {
    let path = format!("{}?limit={}", messages_path(channel_id), limit);
    client
        .get_json(&path)
        .await
        .with_context(|| format!("Failed to load messages of channel {}", channel_id))
}

/// Post a message tagged with the client's correlation id. The server echoes
/// the id back on the push channel.
pub async fn send_message_with_client_id(
    client: &HubClient,
    channel_id: ChannelId,
    content: &str,
    correlation_id: Uuid,
) -> Result<()> {
    let body = OutgoingMessage {
        content,
        client_message_id: correlation_id,
    };
    tracing::debug!("Sending {} to channel {}", correlation_id, channel_id);
    client.post(&messages_path(channel_id), &body).await?;
    Ok(())
}

/// Post a threaded reply. The server may answer with the stored message or
/// with `null`.
pub async fn send_reply(
    client: &HubClient,
    channel_id: ChannelId,
    parent_id: MessageId,
    content: &str,
    correlation_id: Uuid,
) -> Result<Option<ChatMessage>> {
    let body = OutgoingMessage {
        content,
        client_message_id: correlation_id,
    };
    tracing::debug!(
        "Replying {} to message {} in channel {}",
        correlation_id,
        parent_id,
        channel_id
    );
    let resp = client.post(&replies_path(channel_id, parent_id), &body).await?;
    let text = resp.text().await.context("Failed to read reply response")?;
    parse_reply_body(&text)
}

fn parse_reply_body(text: &str) -> Result<Option<ChatMessage>> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(text).context("Failed to parse reply response")
}

/// Tell the channel this user started or stopped typing.
pub async fn send_typing(client: &HubClient, channel_id: ChannelId, typing: bool) -> Result<()> {
    let path = format!("api/channels/{}/typing", channel_id);
    client.post(&path, &TypingBody { typing }).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(messages_path(4), "api/channels/4/messages");
        assert_eq!(replies_path(4, 99), "api/channels/4/messages/99/replies");
    }

    #[test]
    fn test_parse_reply_body() {
        assert_eq!(tokio_test::assert_ok!(parse_reply_body("")), None);
        assert_eq!(tokio_test::assert_ok!(parse_reply_body("null")), None);

        let body = r#"{"id":3,"channelId":4,"senderId":1,"content":"ok","replyToId":2}"#;
        let msg = tokio_test::assert_ok!(parse_reply_body(body)).unwrap();
        assert_eq!(msg.reply_to_id, Some(2));

        tokio_test::assert_err!(parse_reply_body("{oops"));
    }
}
