//! Message-related models
//!
//! Direct and forum messages have different stored shapes (the direct feed
//! carries a recipient and a server timestamp; forum lists use client
//! millisecond timestamps). Both convert into [`ChatMessage`] for display.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Shown in place of an empty message list.
pub const EMPTY_FEED_PROMPT: &str = "No messages yet. Start the conversation!";

/// Coarse attachment kind, derived from the MIME top-level type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    /// Anything else is shown as a generic attachment link.
    File,
}

impl MediaKind {
    pub fn parse(media_type: &str) -> Self {
        match media_type {
            "image" => MediaKind::Image,
            "video" => MediaKind::Video,
            _ => MediaKind::File,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::File => "attachment",
        }
    }
}

/// Top-level type of a MIME string: `"image/png"` -> `"image"`.
pub fn media_type_of(mime: &str) -> String {
    mime.split('/').next().unwrap_or_default().to_string()
}

/// Message record in a direct chat feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectMessage {
    /// Document id, assigned by the store. Not part of the stored fields.
    #[serde(default, skip_serializing)]
    pub id: String,
    pub text: String,
    pub sender_id: String,
    pub sender_name: String,
    #[serde(rename = "senderPhotoURL", default)]
    pub sender_photo_url: String,
    pub recipient_id: String,
    /// Server-assigned; `None` on outgoing records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub media_url: String,
    #[serde(default)]
    pub media_type: String,
}

/// Message record in a locally stored forum topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumMessage {
    pub id: String,
    pub text: String,
    pub user_id: String,
    pub user_name: String,
    #[serde(rename = "userPhotoURL", default)]
    pub user_photo_url: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default)]
    pub media_url: String,
    #[serde(default)]
    pub media_type: String,
}

/// An attachment reference on a displayed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub url: String,
    pub kind: MediaKind,
}

impl Media {
    /// Plain-text rendering: `[image] https://...`.
    pub fn marker(&self) -> String {
        format!("[{}] {}", self.kind.label(), self.url)
    }

    fn from_fields(url: String, media_type: &str) -> Option<Self> {
        if url.is_empty() {
            return None;
        }
        Some(Self {
            url,
            kind: MediaKind::parse(media_type),
        })
    }
}

/// A message as shown in either chat surface.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub author_id: String,
    pub author_name: String,
    pub author_photo_url: String,
    /// Only set for direct messages.
    pub recipient_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub media: Option<Media>,
}

impl ChatMessage {
    /// Local `HH:MM` time, empty while the server timestamp is pending.
    pub fn time_label(&self) -> String {
        self.timestamp
            .map(|ts| ts.with_timezone(&Local).format("%H:%M").to_string())
            .unwrap_or_default()
    }

    pub fn is_from(&self, uid: &str) -> bool {
        self.author_id == uid
    }
}

impl From<DirectMessage> for ChatMessage {
    fn from(msg: DirectMessage) -> Self {
        Self {
            media: Media::from_fields(msg.media_url, &msg.media_type),
            id: msg.id,
            text: msg.text,
            author_id: msg.sender_id,
            author_name: msg.sender_name,
            author_photo_url: msg.sender_photo_url,
            recipient_id: Some(msg.recipient_id),
            timestamp: msg.timestamp,
        }
    }
}

impl From<ForumMessage> for ChatMessage {
    fn from(msg: ForumMessage) -> Self {
        Self {
            media: Media::from_fields(msg.media_url, &msg.media_type),
            id: msg.id,
            text: msg.text,
            author_id: msg.user_id,
            author_name: msg.user_name,
            author_photo_url: msg.user_photo_url,
            recipient_id: None,
            timestamp: Utc.timestamp_millis_opt(msg.timestamp).single(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_of() {
        assert_eq!(media_type_of("image/png"), "image");
        assert_eq!(media_type_of("video/mp4"), "video");
        assert_eq!(media_type_of("application/pdf"), "application");
        assert_eq!(media_type_of(""), "");
    }

    #[test]
    fn test_media_kind_parse() {
        assert_eq!(MediaKind::parse("image"), MediaKind::Image);
        assert_eq!(MediaKind::parse("video"), MediaKind::Video);
        assert_eq!(MediaKind::parse("audio"), MediaKind::File);
        assert_eq!(MediaKind::parse(""), MediaKind::File);
    }

    #[test]
    fn test_forum_message_json_shape() {
        let json = r#"{"id":"1700000000000","text":"gg","userId":"u1","userName":"Ada",
            "userPhotoURL":"","timestamp":1700000000000,"mediaUrl":"","mediaType":""}"#;
        let msg: ForumMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.user_id, "u1");
        assert_eq!(msg.timestamp, 1_700_000_000_000);

        let view = ChatMessage::from(msg);
        assert!(view.media.is_none());
        assert!(view.recipient_id.is_none());
        assert_eq!(
            view.timestamp.unwrap().timestamp_millis(),
            1_700_000_000_000
        );
    }

    #[test]
    fn test_direct_message_skips_id_and_pending_timestamp() {
        let msg = DirectMessage {
            id: "doc1".to_string(),
            text: "hello".to_string(),
            sender_id: "a".to_string(),
            sender_name: "A".to_string(),
            sender_photo_url: String::new(),
            recipient_id: "b".to_string(),
            timestamp: None,
            media_url: "https://cdn/x.png".to_string(),
            media_type: "image".to_string(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert!(value.get("id").is_none());
        assert!(value.get("timestamp").is_none());
        assert_eq!(value["senderPhotoURL"], "");

        let view = ChatMessage::from(msg);
        assert_eq!(view.recipient_id.as_deref(), Some("b"));
        assert_eq!(
            view.media,
            Some(Media {
                url: "https://cdn/x.png".to_string(),
                kind: MediaKind::Image,
            })
        );
        assert_eq!(view.time_label(), "");
        assert_eq!(
            view.media.unwrap().marker(),
            "[image] https://cdn/x.png"
        );
    }
}
