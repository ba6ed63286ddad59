//! User directory bootstrap

use anyhow::{Context, Result};

use crate::models::{ChatUser, Identity};
use crate::services::DocumentStore;

/// Register `me` in the directory if absent, then return everyone else.
///
/// Read-then-write: two first visits racing can both insert.
pub async fn bootstrap(documents: &dyn DocumentStore, me: &Identity) -> Result<Vec<ChatUser>> {
    if documents.find_user(&me.uid).await?.is_none() {
        tracing::info!("Registering {} in the user directory", me.uid);
        documents
            .insert_user(&ChatUser::from(me))
            .await
            .context("Failed to register user")?;
    }

    let users = documents.list_users_except(&me.uid).await?;
    tracing::debug!("Directory lists {} other users", users.len());
    Ok(users)
}

/// Users whose display name or email contains `query`, case-insensitively.
pub fn filter_users<'a>(users: &'a [ChatUser], query: &str) -> Vec<&'a ChatUser> {
    users.iter().filter(|u| u.matches(query)).collect()
}
