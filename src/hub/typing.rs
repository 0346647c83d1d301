//! Typing-indicator debounce.
//!
//! The first keystroke sends "typing started"; further keystrokes only push
//! the stop deadline back. "Typing stopped" goes out once the deadline passes
//! or when the state is forced idle (message sent, compose refocused, channel
//! switched). There is a single deadline at any time.

use std::time::Duration;

use tokio::time::Instant;

use crate::models::ChannelId;

/// Quiet period after the last keystroke before "typing stopped" is sent.
pub const TYPING_STOP_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypingState {
    #[default]
    Idle,
    Typing {
        channel_id: ChannelId,
        deadline: Instant,
    },
}

/// Notification for the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingSignal {
    Start(ChannelId),
    Stop(ChannelId),
}

#[derive(Debug, Default)]
pub struct TypingDebounce {
    state: TypingState,
}

impl TypingDebounce {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn state(&self) -> TypingState {
        self.state
    }

    /// When the UI loop should call [`expire`](Self::expire).
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            TypingState::Typing { deadline, .. } => Some(deadline),
            TypingState::Idle => None,
        }
    }

    /// Register a keystroke in the compose box of `channel_id`.
    pub fn keystroke(&mut self, channel_id: ChannelId, now: Instant) -> Option<TypingSignal> {
        let deadline = now + TYPING_STOP_DELAY;
        let signal = match self.state {
            TypingState::Typing { channel_id: c, .. } if c == channel_id => None,
            _ => Some(TypingSignal::Start(channel_id)),
        };
        self.state = TypingState::Typing {
            channel_id,
            deadline,
        };
        signal
    }

    /// Fire the stop notification if the deadline has passed.
    pub fn expire(&mut self, now: Instant) -> Option<TypingSignal> {
        match self.state {
            TypingState::Typing {
                channel_id,
                deadline,
            } if now >= deadline => {
                self.state = TypingState::Idle;
                Some(TypingSignal::Stop(channel_id))
            }
            _ => None,
        }
    }

    /// Go idle immediately, cancelling the pending deadline.
    pub fn force_idle(&mut self) -> Option<TypingSignal> {
        match std::mem::take(&mut self.state) {
            TypingState::Typing { channel_id, .. } => Some(TypingSignal::Stop(channel_id)),
            TypingState::Idle => None,
        }
    }
}
