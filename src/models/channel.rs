//! Direct chat channel identifiers

use std::fmt;

/// Identifier of a two-party direct chat.
///
/// Both participant uids are sorted before joining, so either side
/// computes the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn between(a: &str, b: &str) -> Self {
        let mut uids = [a, b];
        uids.sort_unstable();
        Self(uids.join("_"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Local storage key holding the compose draft for this channel.
    pub fn draft_key(&self) -> String {
        format!("draft_{}", self.0)
    }

    /// Collection path of the remote message feed.
    pub fn feed_path(&self) -> String {
        format!("chats/{}/messages", self.0)
    }

    /// Object storage prefix for attachments sent on this channel.
    pub fn upload_scope(&self) -> String {
        format!("chats/{}", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_id_is_symmetric() {
        let pairs = [
            ("alice", "bob"),
            ("zed", "amy"),
            ("same", "same"),
            ("UID9", "uid1"),
            ("", "x"),
        ];
        for (a, b) in pairs {
            assert_eq!(ChannelId::between(a, b), ChannelId::between(b, a));
        }
    }

    #[test]
    fn test_channel_id_sorted_join() {
        let id = ChannelId::between("bob", "alice");
        assert_eq!(id.as_str(), "alice_bob");
        assert_eq!(id.draft_key(), "draft_alice_bob");
        assert_eq!(id.feed_path(), "chats/alice_bob/messages");
        assert_eq!(id.upload_scope(), "chats/alice_bob");
    }
}
