//! Messaging core: optimistic sends reconciled against server echoes.

pub mod compose;
pub mod drafts;
pub mod message;
pub mod pending;
pub mod session;
pub mod timeline;
pub mod typing;

pub use compose::ComposeState;
pub use message::{Bubble, Delivery};
pub use session::{ConnectionState, HubSession, ReplyTarget};
pub use timeline::Entry;
