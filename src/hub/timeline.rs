//! Ordered list of what a channel view renders.
//!
//! Messages are kept in timestamp order as events arrive out of order.
//! Insertion is a backward linear scan, which stays cheap because a view only
//! holds a bounded recent window.

use uuid::Uuid;

use super::message::{Bubble, Delivery, MessageKey};

/// One rendered row of a channel view.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// System notice (e.g. "Start of #staff-room"). Not a message.
    Notice(String),
    Message(Bubble),
}

impl Entry {
    fn as_bubble(&self) -> Option<&Bubble> {
        match self {
            Entry::Message(b) => Some(b),
            Entry::Notice(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    entries: Vec<Entry>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Rendered messages in display order.
    pub fn bubbles(&self) -> impl Iterator<Item = &Bubble> {
        self.entries.iter().filter_map(Entry::as_bubble)
    }

    pub fn message_count(&self) -> usize {
        self.bubbles().count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a system notice at the end.
    pub fn push_notice(&mut self, text: impl Into<String>) {
        self.entries.push(Entry::Notice(text.into()));
    }

    /// Insert a bubble in chronological order and return its index.
    ///
    /// A confirmed message whose server id is already rendered replaces the
    /// existing bubble in place, so a message never shows up twice.
    pub fn insert(&mut self, bubble: Bubble) -> usize {
        if let MessageKey::Confirmed(id) = bubble.message.key {
            if let Some(idx) = self.position_of(MessageKey::Confirmed(id)) {
                self.entries[idx] = Entry::Message(bubble);
                return idx;
            }
        }

        let idx = self.insertion_point(&bubble);
        self.entries.insert(idx, Entry::Message(bubble));
        idx
    }

    fn insertion_point(&self, bubble: &Bubble) -> usize {
        let Some(ts) = bubble.message.timestamp else {
            return self.entries.len();
        };

        // Right after the last message that is not newer than this one.
        for (idx, entry) in self.entries.iter().enumerate().rev() {
            if let Some(existing) = entry.as_bubble().and_then(|b| b.message.timestamp) {
                if existing <= ts {
                    return idx + 1;
                }
            }
        }

        // Older than everything: before the first message, after leading notices.
        self.entries
            .iter()
            .position(|e| matches!(e, Entry::Message(_)))
            .unwrap_or(self.entries.len())
    }

    /// Index of the entry rendering the given message, if any.
    pub fn position_of(&self, key: MessageKey) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.as_bubble().is_some_and(|b| b.message.key == key))
    }

    /// Excise the optimistic bubble for a correlation id.
    pub fn remove_pending(&mut self, correlation_id: Uuid) -> Option<Bubble> {
        let idx = self.position_of(MessageKey::Pending(correlation_id))?;
        match self.entries.remove(idx) {
            Entry::Message(b) => Some(b),
            Entry::Notice(_) => None,
        }
    }

    /// Flag the optimistic bubble for a correlation id as failed to send.
    pub fn mark_failed(&mut self, correlation_id: Uuid) -> bool {
        let Some(idx) = self.position_of(MessageKey::Pending(correlation_id)) else {
            return false;
        };
        if let Entry::Message(b) = &mut self.entries[idx] {
            b.delivery = Delivery::Failed;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::*;
    use crate::hub::message::Message;

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn confirmed(id: i64, ts: Option<DateTime<Utc>>) -> Bubble {
        Bubble::confirmed(Message {
            key: MessageKey::Confirmed(id),
            correlation_id: None,
            channel_id: 1,
            sender_id: 2,
            sender_name: None,
            content: format!("message {}", id),
            timestamp: ts,
            reply_to: None,
        })
    }

    fn pending(cid: Uuid, ts: DateTime<Utc>) -> Bubble {
        Bubble::pending(Message::pending(cid, 1, 9, "mine".to_string(), None, ts))
    }

    fn ids(t: &Timeline) -> Vec<i64> {
        t.bubbles().filter_map(|b| b.message.server_id()).collect()
    }

    fn assert_sorted(t: &Timeline) {
        let stamps: Vec<_> = t.bubbles().filter_map(|b| b.message.timestamp).collect();
        for pair in stamps.windows(2) {
            assert!(pair[0] <= pair[1], "out of order: {:?}", stamps);
        }
    }

    #[test]
    fn test_in_order_arrivals_append() {
        let mut t = Timeline::new();
        for i in 1..=3 {
            t.insert(confirmed(i, Some(at(i))));
        }
        assert_eq!(ids(&t), vec![1, 2, 3]);
    }

    #[test]
    fn test_late_arrival_lands_between_neighbours() {
        let mut t = Timeline::new();
        t.insert(confirmed(1, Some(at(1))));
        t.insert(confirmed(3, Some(at(3))));
        let idx = t.insert(confirmed(2, Some(at(2))));
        assert_eq!(idx, 1);
        assert_eq!(ids(&t), vec![1, 2, 3]);
    }

    #[test]
    fn test_equal_timestamp_goes_after_existing() {
        let mut t = Timeline::new();
        t.insert(confirmed(1, Some(at(5))));
        t.insert(confirmed(2, Some(at(5))));
        assert_eq!(ids(&t), vec![1, 2]);
    }

    #[test]
    fn test_oldest_message_skips_leading_notices() {
        let mut t = Timeline::new();
        t.push_notice("You joined #staff-room");
        t.insert(confirmed(5, Some(at(5))));
        let idx = t.insert(confirmed(1, Some(at(1))));
        assert_eq!(idx, 1);
        assert!(matches!(t.entries()[0], Entry::Notice(_)));
        assert_eq!(ids(&t), vec![1, 5]);
    }

    #[test]
    fn test_first_message_after_notices_only() {
        let mut t = Timeline::new();
        t.push_notice("Start of #general");
        t.insert(confirmed(1, Some(at(1))));
        assert!(matches!(t.entries()[0], Entry::Notice(_)));
        assert_eq!(ids(&t), vec![1]);
    }

    #[test]
    fn test_missing_timestamp_appends() {
        let mut t = Timeline::new();
        t.insert(confirmed(1, Some(at(10))));
        t.insert(confirmed(2, Some(at(20))));
        let idx = t.insert(confirmed(3, None));
        assert_eq!(idx, 2);
        assert_eq!(ids(&t), vec![1, 2, 3]);
    }

    #[test]
    fn test_scrambled_arrivals_stay_sorted() {
        let mut t = Timeline::new();
        t.push_notice("Start of #grade-7");
        for (id, minute) in [7, 2, 9, 1, 5, 5, 8, 3, 0, 6, 4].into_iter().enumerate() {
            t.insert(confirmed(id as i64, Some(at(minute))));
        }
        assert_sorted(&t);
        assert_eq!(t.message_count(), 11);
    }

    #[test]
    fn test_duplicate_server_id_replaces_in_place() {
        let mut t = Timeline::new();
        t.insert(confirmed(1, Some(at(1))));
        t.insert(confirmed(2, Some(at(2))));
        let mut edited = confirmed(1, Some(at(1)));
        edited.message.content = "edited".to_string();
        let idx = t.insert(edited);
        assert_eq!(idx, 0);
        assert_eq!(t.message_count(), 2);
        assert_eq!(t.bubbles().next().unwrap().message.content, "edited");
    }

    #[test]
    fn test_remove_pending_by_correlation_id() {
        let cid = Uuid::new_v4();
        let mut t = Timeline::new();
        t.insert(confirmed(1, Some(at(1))));
        t.insert(pending(cid, at(2)));
        t.insert(confirmed(3, Some(at(3))));

        let removed = t.remove_pending(cid).unwrap();
        assert_eq!(removed.message.content, "mine");
        assert_eq!(ids(&t), vec![1, 3]);
        assert!(t.remove_pending(cid).is_none());
    }

    #[test]
    fn test_mark_failed_keeps_bubble() {
        let cid = Uuid::new_v4();
        let mut t = Timeline::new();
        t.insert(pending(cid, at(1)));
        assert!(t.mark_failed(cid));
        let b = t.bubbles().next().unwrap();
        assert_eq!(b.delivery, Delivery::Failed);
        assert!(!t.mark_failed(Uuid::new_v4()));
    }
}
