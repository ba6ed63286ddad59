//! Terminal user interface
//!
//! Sidebar of topics and users, the open conversation and a compose box,
//! rendered with Ratatui.

mod app;
mod backend;
mod compose;
mod help;
mod log_capture;
mod messages;
mod sidebar;
mod ui;

pub use app::run;
pub use log_capture::LogBuffer;
