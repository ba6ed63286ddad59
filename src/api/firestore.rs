//! Cloud Firestore REST adapter
//!
//! Direct chat feeds live under `chats/{channelId}/messages`; the user
//! directory is the top-level `users` collection.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::client::ServiceClient;
use super::value::{decode_fields, encode_fields};
use crate::models::{ChannelId, ChatUser, DirectMessage};
use crate::services::DocumentStore;

const FIRESTORE_BASE: &str = "https://firestore.googleapis.com/v1";
const USERS: &str = "users";

/// Length of client-generated document ids.
const AUTO_ID_LEN: usize = 20;

// -- Response types for runQuery --

#[derive(Debug, Deserialize)]
struct RunQueryRow {
    document: Option<Document>,
}

#[derive(Debug, Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl Document {
    fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or_default()
    }
}

pub struct FirestoreClient {
    client: Arc<ServiceClient>,
}

impl FirestoreClient {
    pub fn new(client: Arc<ServiceClient>) -> Self {
        Self { client }
    }

    /// Resource name of the database documents root.
    fn documents_name(&self) -> String {
        format!(
            "projects/{}/databases/(default)/documents",
            self.client.firebase().project_id
        )
    }

    fn documents_url(&self) -> String {
        format!("{}/{}", FIRESTORE_BASE, self.documents_name())
    }

    async fn run_query<T: DeserializeOwned>(&self, parent: &str, query: Value) -> Result<Vec<T>> {
        let url = if parent.is_empty() {
            format!("{}:runQuery", self.documents_url())
        } else {
            format!("{}/{}:runQuery", self.documents_url(), parent)
        };
        let resp = self.client.post_json(&url, &query).await?;
        let rows: Vec<RunQueryRow> = resp
            .json()
            .await
            .context("Failed to parse runQuery response")?;
        Ok(parse_documents(rows))
    }
}

/// Decode query rows into records, skipping rows that don't fit the type.
fn parse_documents<T: DeserializeOwned>(rows: Vec<RunQueryRow>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| row.document)
        .filter_map(|doc| {
            let mut object = decode_fields(&doc.fields);
            object.insert("id".to_string(), Value::from(doc.id()));
            match serde_json::from_value(Value::Object(object)) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Skipping malformed document {}: {}", doc.name, e);
                    None
                }
            }
        })
        .collect()
}

fn feed_query() -> Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": "messages" }],
            "orderBy": [{ "field": { "fieldPath": "timestamp" }, "direction": "ASCENDING" }]
        }
    })
}

fn user_query(op: &str, uid: &str, limit: Option<u32>) -> Value {
    let mut query = json!({
        "structuredQuery": {
            "from": [{ "collectionId": USERS }],
            "where": {
                "fieldFilter": {
                    "field": { "fieldPath": "uid" },
                    "op": op,
                    "value": { "stringValue": uid }
                }
            }
        }
    });
    if let Some(limit) = limit {
        query["structuredQuery"]["limit"] = json!(limit);
    }
    query
}

fn to_fields<T: Serialize>(record: &T) -> Result<Value> {
    let value = serde_json::to_value(record).context("Failed to serialize record")?;
    let object = value
        .as_object()
        .context("Record did not serialize to an object")?;
    Ok(encode_fields(object))
}

/// Single-write commit that creates the document and stamps the server time.
fn append_commit(document_name: String, fields: Value) -> Value {
    json!({
        "writes": [{
            "update": { "name": document_name, "fields": fields },
            "updateTransforms": [{ "fieldPath": "timestamp", "setToServerValue": "REQUEST_TIME" }],
            "currentDocument": { "exists": false }
        }]
    })
}

fn auto_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..AUTO_ID_LEN].to_string()
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn query_feed(&self, channel: &ChannelId) -> Result<Vec<DirectMessage>> {
        self.run_query(&format!("chats/{}", channel), feed_query())
            .await
            .with_context(|| format!("Failed to read feed {}", channel))
    }

    async fn append_feed(&self, channel: &ChannelId, message: &DirectMessage) -> Result<()> {
        let name = format!(
            "{}/{}/{}",
            self.documents_name(),
            channel.feed_path(),
            auto_id()
        );
        let body = append_commit(name, to_fields(message)?);
        let url = format!("{}:commit", self.documents_url());
        self.client.post_json(&url, &body).await?;
        Ok(())
    }

    async fn find_user(&self, uid: &str) -> Result<Option<ChatUser>> {
        let users: Vec<ChatUser> = self
            .run_query("", user_query("EQUAL", uid, Some(1)))
            .await
            .context("Failed to query user directory")?;
        Ok(users.into_iter().next())
    }

    async fn insert_user(&self, user: &ChatUser) -> Result<()> {
        let url = format!("{}/{}", self.documents_url(), USERS);
        let body = json!({ "fields": to_fields(user)? });
        self.client
            .post_json(&url, &body)
            .await
            .context("Failed to register in user directory")?;
        Ok(())
    }

    async fn list_users_except(&self, uid: &str) -> Result<Vec<ChatUser>> {
        self.run_query("", user_query("NOT_EQUAL", uid, None))
            .await
            .context("Failed to list user directory")
    }
}
