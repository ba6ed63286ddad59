//! Chat synchronization
//!
//! Both chat surfaces implement [`MessageChannel`]: direct chat is backed by
//! the remote feed, forum topics by the local store. The composer, the CLI
//! and the TUI only talk to the trait.

mod compose;
mod direct;
mod directory;
mod draft;
mod forum;
mod subscription;

pub use compose::{deliver, Attachment, Composer, Outgoing, SendError};
pub use direct::DirectChannel;
pub use directory::{bootstrap, filter_users};
pub use draft::DraftCache;
pub use forum::ForumChannel;
pub use subscription::{Subscription, SubscriptionSlot};

use anyhow::Result;
use async_trait::async_trait;

use crate::models::ChatMessage;

/// Attachment reference after upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedMedia {
    pub url: String,
    /// MIME top-level type, e.g. `image`.
    pub media_type: String,
}

/// A message ready to be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub text: String,
    pub media: Option<UploadedMedia>,
}

#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Human-readable name for headers.
    fn title(&self) -> String;

    /// Object storage prefix for attachments sent here.
    fn upload_scope(&self) -> String;

    /// Current messages, oldest first.
    async fn list(&self) -> Result<Vec<ChatMessage>>;

    async fn append(&self, post: Post) -> Result<()>;

    /// Live snapshots of the message list.
    fn subscribe(&self) -> Subscription;

    /// Draft persistence for the compose box, if this channel keeps one.
    fn drafts(&self) -> Option<DraftCache> {
        None
    }
}
