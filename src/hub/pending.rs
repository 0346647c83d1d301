//! Pending-send records keyed by correlation id.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{ChannelId, MessageId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingState {
    InFlight,
    Failed,
}

/// A locally sent message that the server has not echoed yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSend {
    pub channel_id: ChannelId,
    pub content: String,
    pub reply_to: Option<MessageId>,
    pub sent_at: DateTime<Utc>,
    pub state: PendingState,
}

#[derive(Debug, Default)]
pub struct PendingSends {
    entries: HashMap<Uuid, PendingSend>,
}

impl PendingSends {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a send. Must happen before the network call is issued so an
    /// early echo still finds it.
    pub fn register(
        &mut self,
        correlation_id: Uuid,
        channel_id: ChannelId,
        content: String,
        reply_to: Option<MessageId>,
        sent_at: DateTime<Utc>,
    ) {
        self.entries.insert(
            correlation_id,
            PendingSend {
                channel_id,
                content,
                reply_to,
                sent_at,
                state: PendingState::InFlight,
            },
        );
    }

    /// Remove the record matched by a server echo.
    pub fn confirm(&mut self, correlation_id: Uuid) -> Option<PendingSend> {
        self.entries.remove(&correlation_id)
    }

    /// Flag a record as failed. Returns false if it is unknown (already echoed).
    pub fn fail(&mut self, correlation_id: Uuid) -> bool {
        match self.entries.get_mut(&correlation_id) {
            Some(p) => {
                p.state = PendingState::Failed;
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub fn get(&self, correlation_id: Uuid) -> Option<&PendingSend> {
        self.entries.get(&correlation_id)
    }

    /// Drop failed sends of a channel whose view is being torn down.
    pub fn forget_failed(&mut self, channel_id: ChannelId) {
        self.entries
            .retain(|_, p| !(p.channel_id == channel_id && p.state == PendingState::Failed));
    }

    /// Unconfirmed sends of a channel, in flight or failed, oldest first.
    pub fn for_channel(&self, channel_id: ChannelId) -> Vec<(Uuid, &PendingSend)> {
        let mut out: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, p)| p.channel_id == channel_id)
            .map(|(id, p)| (*id, p))
            .collect();
        out.sort_by_key(|(_, p)| p.sent_at);
        out
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_confirm_removes_record() {
        let mut p = PendingSends::new();
        let cid = Uuid::new_v4();
        p.register(cid, 1, "hi".to_string(), None, Utc::now());
        let rec = p.confirm(cid).unwrap();
        assert_eq!(rec.content, "hi");
        assert!(p.is_empty());
        assert!(p.confirm(cid).is_none());
    }

    #[test]
    fn test_fail_then_forget_on_teardown() {
        let mut p = PendingSends::new();
        let failed = Uuid::new_v4();
        let waiting = Uuid::new_v4();
        let other = Uuid::new_v4();
        p.register(failed, 1, "a".to_string(), None, Utc::now());
        p.register(waiting, 1, "b".to_string(), None, Utc::now());
        p.register(other, 2, "c".to_string(), None, Utc::now());

        assert!(p.fail(failed));
        assert!(p.fail(other));
        assert!(!p.fail(Uuid::new_v4()));

        p.forget_failed(1);
        assert!(p.get(failed).is_none());
        assert!(p.get(waiting).is_some());
        assert_eq!(p.get(other).unwrap().state, PendingState::Failed);
    }

    #[test]
    fn test_for_channel_sorted_by_send_time() {
        let mut p = PendingSends::new();
        let t0 = Utc::now();
        let late = Uuid::new_v4();
        let early = Uuid::new_v4();
        let failed = Uuid::new_v4();
        let elsewhere = Uuid::new_v4();
        p.register(late, 4, "late".to_string(), None, t0 + Duration::seconds(5));
        p.register(early, 4, "early".to_string(), None, t0);
        p.register(failed, 4, "x".to_string(), None, t0 + Duration::seconds(2));
        p.register(elsewhere, 5, "y".to_string(), None, t0);
        p.fail(failed);

        let sends = p.for_channel(4);
        let ids: Vec<Uuid> = sends.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![early, failed, late]);
        assert_eq!(sends[1].1.state, PendingState::Failed);
    }
}
