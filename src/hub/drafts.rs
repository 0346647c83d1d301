//! Unsent compose text saved per channel.

use std::collections::HashMap;

use crate::models::ChannelId;

#[derive(Debug, Default)]
pub struct Drafts {
    by_channel: HashMap<ChannelId, String>,
}

impl Drafts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save the compose text of the channel being left. Empty text clears the
    /// previous draft instead of storing an empty string.
    pub fn save(&mut self, channel_id: ChannelId, text: &str) {
        if text.is_empty() {
            self.by_channel.remove(&channel_id);
        } else {
            self.by_channel.insert(channel_id, text.to_string());
        }
    }

    pub fn get(&self, channel_id: ChannelId) -> Option<&str> {
        self.by_channel.get(&channel_id).map(String::as_str)
    }

    pub fn clear(&mut self, channel_id: ChannelId) {
        self.by_channel.remove(&channel_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_get() {
        let mut d = Drafts::new();
        d.save(1, "hello");
        assert_eq!(d.get(1), Some("hello"));
        assert_eq!(d.get(2), None);
    }

    #[test]
    fn test_empty_text_clears_draft() {
        let mut d = Drafts::new();
        d.save(1, "hello");
        d.save(1, "");
        assert_eq!(d.get(1), None);
    }

    #[test]
    fn test_whitespace_is_kept_verbatim() {
        let mut d = Drafts::new();
        d.save(1, "see you  ");
        assert_eq!(d.get(1), Some("see you  "));
    }
}
