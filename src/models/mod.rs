//! Data models for users, channels, topics and messages

mod channel;
mod message;
mod topic;
mod user;

pub use channel::*;
pub use message::*;
pub use topic::*;
pub use user::*;
