//! Terminal user interface using Ratatui.
//!
//! The event loop in `app` is the only owner of the hub session.

mod app;
mod compose;
mod messages;
mod sidebar;
mod ui;

pub use app::run;
