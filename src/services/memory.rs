//! In-memory service fakes for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};

use super::{DocumentStore, KeyValueStore, ObjectStore, Services};
use crate::models::{ChannelId, ChatUser, DirectMessage};

#[derive(Default)]
pub struct MemoryDocuments {
    feeds: Mutex<HashMap<String, Vec<DirectMessage>>>,
    users: Mutex<Vec<ChatUser>>,
    next_id: AtomicUsize,
    feed_queries: AtomicUsize,
    pub fail_writes: AtomicBool,
}

impl MemoryDocuments {
    pub fn feed(&self, channel: &ChannelId) -> Vec<DirectMessage> {
        self.feeds
            .lock()
            .unwrap()
            .get(channel.as_str())
            .cloned()
            .unwrap_or_default()
    }

    pub fn users(&self) -> Vec<ChatUser> {
        self.users.lock().unwrap().clone()
    }

    pub fn add_user(&self, user: ChatUser) {
        self.users.lock().unwrap().push(user);
    }

    /// Number of `query_feed` calls so far.
    pub fn feed_queries(&self) -> usize {
        self.feed_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocuments {
    async fn query_feed(&self, channel: &ChannelId) -> Result<Vec<DirectMessage>> {
        self.feed_queries.fetch_add(1, Ordering::SeqCst);
        let mut feed = self.feed(channel);
        feed.sort_by_key(|m| m.timestamp);
        Ok(feed)
    }

    async fn append_feed(&self, channel: &ChannelId, message: &DirectMessage) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("write rejected");
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let mut stored = message.clone();
        stored.id = format!("msg-{}", n);
        stored.timestamp = Some(base + Duration::seconds(n as i64));
        self.feeds
            .lock()
            .unwrap()
            .entry(channel.as_str().to_string())
            .or_default()
            .push(stored);
        Ok(())
    }

    async fn find_user(&self, uid: &str) -> Result<Option<ChatUser>> {
        Ok(self.users().into_iter().find(|u| u.uid == uid))
    }

    async fn insert_user(&self, user: &ChatUser) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("write rejected");
        }
        self.add_user(user.clone());
        Ok(())
    }

    async fn list_users_except(&self, uid: &str) -> Result<Vec<ChatUser>> {
        Ok(self.users().into_iter().filter(|u| u.uid != uid).collect())
    }
}

#[derive(Default)]
pub struct MemoryObjects {
    uploads: Mutex<Vec<(String, String, usize)>>,
    pub fail: AtomicBool,
}

impl MemoryObjects {
    /// Uploaded objects as `(path, content_type, size)`.
    pub fn uploads(&self) -> Vec<(String, String, usize)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjects {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("upload rejected");
        }
        self.uploads
            .lock()
            .unwrap()
            .push((path.to_string(), content_type.to_string(), bytes.len()));
        Ok(format!("memory://{}", path))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Fakes wired into a bundle, with handles kept for assertions.
pub struct Fakes {
    pub services: Services,
    pub documents: Arc<MemoryDocuments>,
    pub objects: Arc<MemoryObjects>,
    pub local: Arc<MemoryStore>,
}

pub fn fakes() -> Fakes {
    let documents = Arc::new(MemoryDocuments::default());
    let objects = Arc::new(MemoryObjects::default());
    let local = Arc::new(MemoryStore::default());
    Fakes {
        services: Services::new(documents.clone(), objects.clone(), local.clone()),
        documents,
        objects,
        local,
    }
}
