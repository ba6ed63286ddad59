//! User-related models

use serde::{Deserialize, Serialize};

/// Display name used when the auth provider has none.
pub const ANONYMOUS: &str = "Anonymous";

/// Signed-in identity as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl Identity {
    pub fn display_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(ANONYMOUS)
    }
}

/// Entry in the shared user directory (a chat candidate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatUser {
    pub uid: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(rename = "photoURL", default)]
    pub photo_url: String,
    #[serde(default)]
    pub email: String,
}

impl From<&Identity> for ChatUser {
    fn from(identity: &Identity) -> Self {
        Self {
            uid: identity.uid.clone(),
            display_name: identity.display_name().to_string(),
            photo_url: identity.photo_url.clone().unwrap_or_default(),
            email: identity.email.clone().unwrap_or_default(),
        }
    }
}

impl ChatUser {
    /// Case-insensitive substring match on display name or email.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.display_name.to_lowercase().contains(&query)
            || self.email.to_lowercase().contains(&query)
    }

    /// Upper-cased first letter of the display name, for avatar fallbacks.
    pub fn initial(&self) -> char {
        self.display_name
            .chars()
            .next()
            .map(|c| c.to_uppercase().next().unwrap_or(c))
            .unwrap_or('?')
    }
}
