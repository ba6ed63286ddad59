//! External service seams
//!
//! Every synchronizer receives an explicit [`Services`] bundle instead of
//! reaching for global clients. Production wiring talks to the managed
//! backend (see `crate::api`); tests substitute in-memory fakes.

mod local;
#[cfg(test)]
pub mod memory;

pub use local::LocalStore;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::api::client::ServiceClient;
use crate::api::firestore::FirestoreClient;
use crate::api::storage::CloudStorage;
use crate::models::{ChannelId, ChatUser, DirectMessage, Identity};

/// Remote document database: direct chat feeds and the user directory.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All messages of a channel, ordered by server timestamp ascending.
    async fn query_feed(&self, channel: &ChannelId) -> Result<Vec<DirectMessage>>;

    /// Append a message. The store assigns its id and timestamp.
    async fn append_feed(&self, channel: &ChannelId, message: &DirectMessage) -> Result<()>;

    /// Directory entry whose uid equals `uid`.
    async fn find_user(&self, uid: &str) -> Result<Option<ChatUser>>;

    async fn insert_user(&self, user: &ChatUser) -> Result<()>;

    /// Every directory entry whose uid differs from `uid`.
    async fn list_users_except(&self, uid: &str) -> Result<Vec<ChatUser>>;
}

/// Remote blob storage for attachments.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `bytes` under `path` and return a retrievable URL.
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;
}

/// Client-local string key-value store.
///
/// No locking across processes: concurrent writers are last-write-wins.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Explicitly constructed bundle of service handles.
#[derive(Clone)]
pub struct Services {
    pub documents: Arc<dyn DocumentStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub local: Arc<dyn KeyValueStore>,
}

impl Services {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
        local: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            documents,
            objects,
            local,
        }
    }
}

/// Everything a signed-in command needs.
#[derive(Clone)]
pub struct ClientContext {
    pub services: Services,
    pub me: Identity,
    pub poll_interval: Duration,
}

impl ClientContext {
    /// Load config, refresh the session if needed and wire the backend.
    pub async fn connect() -> Result<Self> {
        let client = Arc::new(ServiceClient::new().await?);
        let me = client.identity().clone();
        let poll_interval = client.poll_interval();

        let local = LocalStore::open_default().context("Failed to open local storage")?;
        let services = Services::new(
            Arc::new(FirestoreClient::new(Arc::clone(&client))),
            Arc::new(CloudStorage::new(client)),
            Arc::new(local),
        );

        tracing::debug!("Connected as {}", me.uid);
        Ok(Self {
            services,
            me,
            poll_interval,
        })
    }
}
