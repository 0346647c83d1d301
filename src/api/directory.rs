//! User directory and news feed

use anyhow::{Context, Result};

use super::client::HubClient;
use crate::models::{NewsItem, User};

pub async fn list_users_data(client: &HubClient) -> Result<Vec<User>> {
    client
        .get_json("api/users")
        .await
        .context("Failed to load users")
}

pub async fn list_news_data(client: &HubClient) -> Result<Vec<NewsItem>> {
    client
        .get_json("api/news")
        .await
        .context("Failed to load news")
}
