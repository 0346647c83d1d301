//! Channel-related models

use serde::{Deserialize, Serialize};

/// Server-assigned channel identifier.
pub type ChannelId = i64;

/// A chat channel (class, staff room, direct conversation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    #[serde(default)]
    pub member_count: u32,
    /// Unread counter. Seeded from the server snapshot, then maintained locally.
    #[serde(default, rename = "unreadCount")]
    pub unread: u32,
}
