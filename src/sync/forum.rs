//! Forum topics kept in the local store
//!
//! The whole topic history is one JSON array under the topic key. Every send
//! re-reads the stored array, appends and rewrites it in full, so other
//! handles on the same topic never have their posts overwritten.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;

use super::{MessageChannel, Post, Subscription};
use crate::models::{ChatMessage, ForumMessage, Identity, Topic};
use crate::services::KeyValueStore;

pub struct ForumChannel {
    topic: &'static Topic,
    me: Identity,
    local: Arc<dyn KeyValueStore>,
    messages: Mutex<Vec<ForumMessage>>,
    updates: watch::Sender<Vec<ChatMessage>>,
}

/// Stored history for `topic`; empty when absent.
fn load(local: &dyn KeyValueStore, topic: &Topic) -> Result<Vec<ForumMessage>> {
    let key = topic.storage_key();
    match local.get(&key)? {
        Some(raw) => serde_json::from_str(&raw)
            .with_context(|| format!("Corrupt forum history under {}", key)),
        None => Ok(Vec::new()),
    }
}

fn view(messages: &[ForumMessage]) -> Vec<ChatMessage> {
    messages.iter().cloned().map(ChatMessage::from).collect()
}

impl ForumChannel {
    /// Load the topic history from the local store.
    pub fn open(local: Arc<dyn KeyValueStore>, me: Identity, topic: &'static Topic) -> Result<Self> {
        let messages = load(local.as_ref(), topic)?;
        tracing::debug!("Loaded {} messages for topic {}", messages.len(), topic.id);

        let (updates, _) = watch::channel(view(&messages));
        Ok(Self {
            topic,
            me,
            local,
            messages: Mutex::new(messages),
            updates,
        })
    }

    pub fn topic(&self) -> &'static Topic {
        self.topic
    }

    /// Append a post stamped with `millis`. The id is the decimal instant,
    /// so two posts in the same millisecond share an id.
    pub fn append_at(&self, post: Post, millis: i64) -> Result<()> {
        let (media_url, media_type) = post
            .media
            .map(|m| (m.url, m.media_type))
            .unwrap_or_default();
        let message = ForumMessage {
            id: millis.to_string(),
            text: post.text,
            user_id: self.me.uid.clone(),
            user_name: self.me.display_name().to_string(),
            user_photo_url: self.me.photo_url.clone().unwrap_or_default(),
            timestamp: millis,
            media_url,
            media_type,
        };

        let mut messages = self.messages.lock().unwrap_or_else(|e| e.into_inner());
        let mut next = load(self.local.as_ref(), self.topic)?;
        next.push(message);
        let raw = serde_json::to_string(&next).context("Failed to serialize forum history")?;
        self.local.set(&self.topic.storage_key(), &raw)?;

        *messages = next;
        self.updates.send_replace(view(&messages));
        Ok(())
    }
}

#[async_trait]
impl MessageChannel for ForumChannel {
    fn title(&self) -> String {
        format!("{} {}", self.topic.icon, self.topic.name)
    }

    fn upload_scope(&self) -> String {
        self.topic.upload_scope()
    }

    async fn list(&self) -> Result<Vec<ChatMessage>> {
        let messages = self.messages.lock().unwrap_or_else(|e| e.into_inner());
        Ok(view(&messages))
    }

    async fn append(&self, post: Post) -> Result<()> {
        self.append_at(post, Utc::now().timestamp_millis())
    }

    fn subscribe(&self) -> Subscription {
        Subscription::from_receiver(self.updates.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::MemoryStore;

    fn me() -> Identity {
        Identity {
            uid: "u1".to_string(),
            email: Some("ada@example.com".to_string()),
            display_name: Some("Ada".to_string()),
            photo_url: None,
        }
    }

    fn games() -> &'static Topic {
        Topic::find("games").unwrap()
    }

    fn post(text: &str) -> Post {
        Post {
            text: text.to_string(),
            media: None,
        }
    }

    #[tokio::test]
    async fn test_empty_topic_then_reload() {
        let local = Arc::new(MemoryStore::default());
        let forum = ForumChannel::open(local.clone(), me(), games()).unwrap();
        assert!(forum.list().await.unwrap().is_empty());

        forum.append(post("gg")).await.unwrap();

        let reloaded = ForumChannel::open(local, me(), games()).unwrap();
        let messages = reloaded.list().await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "gg");
        assert_eq!(messages[0].author_name, "Ada");
    }

    #[tokio::test]
    async fn test_n_sends_grow_list_by_n_and_survive_reload() {
        let local = Arc::new(MemoryStore::default());
        let forum = ForumChannel::open(local.clone(), me(), games()).unwrap();
        forum.append_at(post("seed"), 1_000).unwrap();
        let before = forum.list().await.unwrap().len();

        for i in 0..5 {
            forum.append_at(post(&format!("m{}", i)), 2_000 + i).unwrap();
        }
        let after = forum.list().await.unwrap();
        assert_eq!(after.len(), before + 5);

        let raw = local.get(&games().storage_key()).unwrap().unwrap();
        let stored: Vec<ForumMessage> = serde_json::from_str(&raw).unwrap();
        assert_eq!(serde_json::to_string(&stored).unwrap(), raw);

        let reloaded = ForumChannel::open(local, me(), games()).unwrap();
        assert_eq!(reloaded.list().await.unwrap(), after);
    }

    #[tokio::test]
    async fn test_same_millisecond_posts_share_id() {
        let local = Arc::new(MemoryStore::default());
        let forum = ForumChannel::open(local, me(), games()).unwrap();
        forum.append_at(post("first"), 1_700_000_000_000).unwrap();
        forum.append_at(post("second"), 1_700_000_000_000).unwrap();

        let messages = forum.list().await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, "1700000000000");
        assert_eq!(messages[0].id, messages[1].id);
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let local = Arc::new(MemoryStore::default());
        let games_forum = ForumChannel::open(local.clone(), me(), games()).unwrap();
        games_forum.append(post("gg")).await.unwrap();

        let movies = ForumChannel::open(local, me(), Topic::find("movies").unwrap()).unwrap();
        assert!(movies.list().await.unwrap().is_empty());
        assert_eq!(movies.upload_scope(), "forums/movies");
    }

    #[tokio::test]
    async fn test_subscription_sees_appends() {
        let local = Arc::new(MemoryStore::default());
        let forum = ForumChannel::open(local, me(), games()).unwrap();
        let mut sub = forum.subscribe();
        assert!(sub.changed().await.unwrap().is_empty());

        forum.append(post("gg")).await.unwrap();
        assert_eq!(sub.changed().await.unwrap()[0].text, "gg");
    }

    #[tokio::test]
    async fn test_stale_handle_does_not_drop_posts() {
        let local = Arc::new(MemoryStore::default());
        let first = ForumChannel::open(local.clone(), me(), games()).unwrap();
        let second = ForumChannel::open(local.clone(), me(), games()).unwrap();

        first.append_at(post("a"), 1).unwrap();
        second.append_at(post("b"), 2).unwrap();

        let texts = |messages: Vec<ChatMessage>| -> Vec<String> {
            messages.into_iter().map(|m| m.text).collect()
        };
        assert_eq!(texts(second.list().await.unwrap()), ["a", "b"]);

        let reloaded = ForumChannel::open(local, me(), games()).unwrap();
        assert_eq!(texts(reloaded.list().await.unwrap()), ["a", "b"]);
    }

    #[test]
    fn test_corrupt_history_is_an_error() {
        let local = Arc::new(MemoryStore::default());
        local.set(&games().storage_key(), "{not an array").unwrap();
        assert!(ForumChannel::open(local, me(), games()).is_err());
    }

    #[test]
    fn test_failed_persist_leaves_list_unchanged() {
        struct ReadOnly;
        impl KeyValueStore for ReadOnly {
            fn get(&self, _: &str) -> Result<Option<String>> {
                Ok(None)
            }
            fn set(&self, _: &str, _: &str) -> Result<()> {
                anyhow::bail!("disk full")
            }
            fn remove(&self, _: &str) -> Result<()> {
                Ok(())
            }
        }

        let forum = ForumChannel::open(Arc::new(ReadOnly), me(), games()).unwrap();
        assert!(forum.append_at(post("gg"), 1).is_err());
        assert!(tokio_test::block_on(forum.list()).unwrap().is_empty());
    }
}
