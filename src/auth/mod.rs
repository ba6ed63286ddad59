//! Authentication module
//!
//! Implements the OAuth2 device code flow against Google, then exchanges the
//! Google token for a Firebase session whose id token authorizes the
//! database and storage APIs.

pub mod identity;
pub mod oauth;
pub mod session;
pub mod tokens;

pub use oauth::{login, logout, status};
pub use session::{AuthProvider, AuthSession};
pub use tokens::{StoredToken, TokenStore};

use crate::config::GoogleSettings;

/// Google OAuth client configuration
pub struct AuthConfig {
    /// OAuth2 client ID ("TVs and Limited Input devices" client type)
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: &'static str,
    pub token_url: &'static str,
    pub device_url: &'static str,
    pub scopes: &'static [&'static str],
}

impl AuthConfig {
    pub fn from_settings(settings: &GoogleSettings) -> Self {
        Self {
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth",
            token_url: "https://oauth2.googleapis.com/token",
            device_url: "https://oauth2.googleapis.com/device/code",
            scopes: &["openid", "email", "profile"],
        }
    }
}
