//! Firebase Storage upload adapter

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::client::ServiceClient;
use crate::services::ObjectStore;

const STORAGE_BASE: &str = "https://firebasestorage.googleapis.com/v0/b";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    name: String,
    bucket: String,
    #[serde(default)]
    download_tokens: Option<String>,
}

pub struct CloudStorage {
    client: Arc<ServiceClient>,
}

impl CloudStorage {
    pub fn new(client: Arc<ServiceClient>) -> Self {
        Self { client }
    }
}

fn encode(name: &str) -> String {
    url::form_urlencoded::byte_serialize(name.as_bytes())
        .collect::<String>()
        // form encoding turns spaces into '+', object names need %20
        .replace('+', "%20")
}

fn upload_url(bucket: &str, name: &str) -> String {
    format!("{}/{}/o?name={}", STORAGE_BASE, bucket, encode(name))
}

/// Public download URL for an uploaded object.
pub fn download_url(bucket: &str, name: &str, token: Option<&str>) -> String {
    let mut url = format!("{}/{}/o/{}?alt=media", STORAGE_BASE, bucket, encode(name));
    // Several tokens may be comma separated; any of them works.
    if let Some(token) = token.and_then(|t| t.split(',').next()) {
        url.push_str("&token=");
        url.push_str(token);
    }
    url
}

#[async_trait]
impl ObjectStore for CloudStorage {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let bucket = &self.client.firebase().storage_bucket;
        let resp = self
            .client
            .post_bytes(&upload_url(bucket, path), bytes, content_type)
            .await
            .with_context(|| format!("Failed to upload {}", path))?;
        let uploaded: UploadResponse = resp
            .json()
            .await
            .context("Failed to parse upload response")?;
        tracing::debug!("Uploaded {} to {}", uploaded.name, uploaded.bucket);
        Ok(download_url(
            &uploaded.bucket,
            &uploaded.name,
            uploaded.download_tokens.as_deref(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_url_encodes_path() {
        assert_eq!(
            upload_url("app.appspot.com", "chats/a_b/1700_my file.png"),
            "https://firebasestorage.googleapis.com/v0/b/app.appspot.com/o?name=chats%2Fa_b%2F1700_my%20file.png"
        );
    }

    #[test]
    fn test_download_url() {
        assert_eq!(
            download_url("bkt", "forums/games/1_x.mp4", Some("t1,t2")),
            "https://firebasestorage.googleapis.com/v0/b/bkt/o/forums%2Fgames%2F1_x.mp4?alt=media&token=t1"
        );
        assert!(!download_url("bkt", "a", None).contains("token"));
    }

    #[test]
    fn test_parse_upload_response() {
        let resp: UploadResponse = serde_json::from_str(
            r#"{"name":"chats/a_b/1_x.png","bucket":"bkt","contentType":"image/png","downloadTokens":"abc"}"#,
        )
        .unwrap();
        assert_eq!(resp.download_tokens.as_deref(), Some("abc"));
    }
}
