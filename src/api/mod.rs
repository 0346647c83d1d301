//! REST client module for the Heronix hub

mod chat;
pub mod client;
mod directory;

use anyhow::Result;

use crate::models::ChannelId;

pub use chat::{
    list_channels_data, read_messages_data, send_message_with_client_id, send_reply, send_typing,
};
pub use directory::{list_news_data, list_users_data};

/// List channels
pub async fn list_channels() -> Result<()> {
    chat::list_channels().await
}

/// Read recent messages from a channel
pub async fn read_messages(channel_id: ChannelId, limit: usize) -> Result<()> {
    chat::read_messages(channel_id, limit).await
}

/// Send a message to a channel
pub async fn send_message(channel_id: ChannelId, message: &str) -> Result<()> {
    chat::send_message(channel_id, message).await
}

/// Print the configuration and whether the hub answers.
pub async fn status() -> Result<()> {
    let config = crate::config::Config::load()?;

    println!("Config file:  {}", crate::config::Config::config_path()?.display());
    println!("Server:       {}", config.server_url);
    match config.push_url() {
        Ok(url) => println!("Push:         {}", url),
        Err(e) => println!("Push:         invalid ({:#})", e),
    }
    println!(
        "Token:        {}",
        if config.token.is_some() { "set" } else { "not set" }
    );
    match config.user_id {
        Some(id) => println!("User ID:      {}", id),
        None => println!("User ID:      not set (required for the TUI)"),
    }
    println!("History:      {} messages", config.history_limit);

    let client = client::HubClient::with_config(&config)?;
    match list_channels_data(&client).await {
        Ok(channels) => println!("Hub:          reachable ({} channels)", channels.len()),
        Err(e) => println!("Hub:          unreachable ({:#})", e),
    }

    Ok(())
}
