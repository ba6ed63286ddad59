//! Per-channel compose drafts for direct chat

use std::sync::Arc;

use anyhow::Result;

use crate::models::ChannelId;
use crate::services::KeyValueStore;

#[derive(Clone)]
pub struct DraftCache {
    local: Arc<dyn KeyValueStore>,
    key: String,
}

impl DraftCache {
    pub fn new(local: Arc<dyn KeyValueStore>, channel: &ChannelId) -> Self {
        Self {
            local,
            key: channel.draft_key(),
        }
    }

    /// Persisted draft, if any. An empty stored string counts as no draft.
    pub fn restore(&self) -> Result<Option<String>> {
        Ok(self.local.get(&self.key)?.filter(|t| !t.is_empty()))
    }

    /// Overwrite the draft. Saving an empty string is allowed.
    pub fn save(&self, text: &str) -> Result<()> {
        self.local.set(&self.key, text)
    }

    pub fn clear(&self) -> Result<()> {
        self.local.remove(&self.key)
    }
}
