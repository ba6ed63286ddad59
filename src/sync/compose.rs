//! Compose box state and the send pipeline
//!
//! A send is validate, optional upload, record. Upload and record are not
//! transactional: a record failure after a successful upload leaves the
//! object in storage.

use std::path::Path;

use chrono::Utc;
use thiserror::Error;

use super::{DraftCache, MessageChannel, Post, UploadedMedia};
use crate::models::media_type_of;
use crate::notice::Notice;
use crate::services::ObjectStore;

#[derive(Debug, Error)]
pub enum SendError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("cannot read attachment {path}: {source}")]
    Attachment {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("upload failed: {0:#}")]
    Upload(anyhow::Error),

    #[error("write failed: {0:#}")]
    Write(anyhow::Error),
}

impl SendError {
    /// User-facing notice for this failure.
    pub fn notice(&self) -> Notice {
        match self {
            SendError::EmptyMessage => Notice::info("Please enter a message or attach a file"),
            SendError::Attachment { path, .. } => {
                Notice::destructive("Error", format!("Cannot read attachment {}", path))
            }
            SendError::Upload(_) | SendError::Write(_) => {
                Notice::destructive("Error", "Failed to send message")
            }
        }
    }
}

/// A file selected for sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    /// Declared MIME type, e.g. `image/png`.
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub async fn from_path(path: &Path) -> Result<Self, SendError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| SendError::Attachment {
            path: path.display().to_string(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self::new(file_name, content_type, bytes))
    }

    /// Coarse media kind: the MIME top-level type.
    pub fn media_type(&self) -> String {
        media_type_of(&self.content_type)
    }
}

/// A validated submission, detached from the compose box.
#[derive(Debug, Clone)]
pub struct Outgoing {
    pub text: String,
    pub attachment: Option<Attachment>,
}

/// Upload an attachment to `<scope>/<millis>_<file name>`.
async fn upload(
    objects: &dyn ObjectStore,
    scope: &str,
    attachment: Attachment,
) -> Result<UploadedMedia, SendError> {
    let path = format!(
        "{}/{}_{}",
        scope,
        Utc::now().timestamp_millis(),
        attachment.file_name
    );
    let media_type = attachment.media_type();
    tracing::info!("Uploading {} ({} bytes)", path, attachment.bytes.len());
    let url = objects
        .upload(&path, attachment.bytes, &attachment.content_type)
        .await
        .map_err(SendError::Upload)?;
    Ok(UploadedMedia { url, media_type })
}

/// Upload the attachment (if any), then record the message.
/// `on_uploaded` runs once the upload phase is over.
pub async fn deliver(
    channel: &dyn MessageChannel,
    objects: &dyn ObjectStore,
    outgoing: Outgoing,
    on_uploaded: impl FnOnce() + Send,
) -> Result<(), SendError> {
    let media = match outgoing.attachment {
        Some(attachment) => Some(upload(objects, &channel.upload_scope(), attachment).await?),
        None => None,
    };
    on_uploaded();

    channel
        .append(Post {
            text: outgoing.text,
            media,
        })
        .await
        .map_err(SendError::Write)
}

/// Compose box for one channel: text, optional attachment and draft mirroring.
#[derive(Default)]
pub struct Composer {
    text: String,
    attachment: Option<Attachment>,
    uploading: bool,
    drafts: Option<DraftCache>,
}

impl Composer {
    /// Fresh compose box for `channel`, seeded from its draft if one exists.
    pub fn for_channel(channel: &dyn MessageChannel) -> Self {
        let drafts = channel.drafts();
        let text = match drafts.as_ref().map(DraftCache::restore) {
            Some(Ok(Some(draft))) => draft,
            Some(Err(e)) => {
                tracing::warn!("Failed to restore draft: {:#}", e);
                String::new()
            }
            _ => String::new(),
        };
        Self {
            text,
            drafts,
            ..Self::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the compose text and mirror it into the draft.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        if let Some(ref drafts) = self.drafts {
            if let Err(e) = drafts.save(&self.text) {
                tracing::warn!("Failed to save draft: {:#}", e);
            }
        }
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    pub fn attach(&mut self, attachment: Attachment) {
        self.attachment = Some(attachment);
    }

    pub fn detach(&mut self) {
        self.attachment = None;
    }

    /// Input is locked while an attachment upload is in flight.
    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    /// Pick up a send whose upload of `attachment` is still running, e.g.
    /// after the channel was reopened mid-upload. Input stays locked until
    /// `upload_finished` or `finish`.
    pub fn resume_upload(&mut self, attachment: Attachment) {
        self.attachment = Some(attachment);
        self.uploading = true;
    }

    pub fn upload_finished(&mut self) {
        self.uploading = false;
    }

    /// Validate and snapshot the compose state. Nothing changes on rejection.
    pub fn prepare(&mut self) -> Result<Outgoing, SendError> {
        if self.text.trim().is_empty() && self.attachment.is_none() {
            return Err(SendError::EmptyMessage);
        }
        self.uploading = self.attachment.is_some();
        Ok(Outgoing {
            text: self.text.clone(),
            attachment: self.attachment.clone(),
        })
    }

    /// Apply the outcome of a send. Success clears the text, the attachment
    /// and the persisted draft; failure keeps everything for a retry.
    pub fn finish(&mut self, result: Result<(), SendError>) -> Result<(), SendError> {
        self.uploading = false;
        result?;
        self.text.clear();
        self.attachment = None;
        if let Some(ref drafts) = self.drafts {
            if let Err(e) = drafts.clear() {
                tracing::warn!("Failed to clear draft: {:#}", e);
            }
        }
        Ok(())
    }

    /// Prepare, deliver and finish in one go.
    pub async fn submit(
        &mut self,
        channel: &dyn MessageChannel,
        objects: &dyn ObjectStore,
    ) -> Result<(), SendError> {
        let outgoing = self.prepare()?;
        let result = deliver(channel, objects, outgoing, || {}).await;
        self.finish(result)
    }
}
