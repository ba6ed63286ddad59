//! Direct chat over the remote feed

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use super::{DraftCache, MessageChannel, Post, Subscription};
use crate::models::{ChannelId, ChatMessage, ChatUser, DirectMessage, Identity};
use crate::services::{DocumentStore, Services};

pub struct DirectChannel {
    services: Services,
    me: Identity,
    recipient: ChatUser,
    channel: ChannelId,
    poll_interval: Duration,
}

impl DirectChannel {
    pub fn new(
        services: Services,
        me: Identity,
        recipient: ChatUser,
        poll_interval: Duration,
    ) -> Self {
        let channel = ChannelId::between(&me.uid, &recipient.uid);
        Self {
            services,
            me,
            recipient,
            channel,
            poll_interval,
        }
    }

    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    pub fn recipient(&self) -> &ChatUser {
        &self.recipient
    }

    fn record(&self, post: Post) -> DirectMessage {
        let (media_url, media_type) = post
            .media
            .map(|m| (m.url, m.media_type))
            .unwrap_or_default();
        DirectMessage {
            id: String::new(),
            text: post.text,
            sender_id: self.me.uid.clone(),
            sender_name: self.me.display_name().to_string(),
            sender_photo_url: self.me.photo_url.clone().unwrap_or_default(),
            recipient_id: self.recipient.uid.clone(),
            timestamp: None,
            media_url,
            media_type,
        }
    }
}

async fn fetch(documents: &dyn DocumentStore, channel: &ChannelId) -> Result<Vec<ChatMessage>> {
    let feed = documents.query_feed(channel).await?;
    Ok(feed.into_iter().map(ChatMessage::from).collect())
}

#[async_trait]
impl MessageChannel for DirectChannel {
    fn title(&self) -> String {
        self.recipient.display_name.clone()
    }

    fn upload_scope(&self) -> String {
        self.channel.upload_scope()
    }

    async fn list(&self) -> Result<Vec<ChatMessage>> {
        fetch(self.services.documents.as_ref(), &self.channel).await
    }

    async fn append(&self, post: Post) -> Result<()> {
        let record = self.record(post);
        self.services
            .documents
            .append_feed(&self.channel, &record)
            .await
    }

    fn subscribe(&self) -> Subscription {
        let documents = Arc::clone(&self.services.documents);
        let channel = self.channel.clone();
        tracing::debug!("Subscribing to {}", channel.feed_path());
        Subscription::polling(self.poll_interval, move || {
            let documents = Arc::clone(&documents);
            let channel = channel.clone();
            async move { fetch(documents.as_ref(), &channel).await }
        })
    }

    fn drafts(&self) -> Option<DraftCache> {
        Some(DraftCache::new(Arc::clone(&self.services.local), &self.channel))
    }
}
