//! Wire models for the Heronix hub REST and push APIs

mod channel;
mod message;
mod user;

pub use channel::*;
pub use message::*;
pub use user::*;
