//! Configuration and credential storage

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::{StoredToken, TokenStore};
use crate::models::Identity;

/// Default interval between direct chat feed polls.
const DEFAULT_POLL_INTERVAL_MS: u64 = 1500;

/// Managed backend project settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FirebaseSettings {
    /// Web API key (Identity Toolkit / secure token endpoints)
    #[serde(default)]
    pub api_key: String,
    /// Firestore project id
    #[serde(default)]
    pub project_id: String,
    /// Storage bucket for attachments, e.g. `myapp.firebasestorage.app`
    #[serde(default)]
    pub storage_bucket: String,
}

impl FirebaseSettings {
    pub fn ensure_complete(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("api_key", &self.api_key),
            ("project_id", &self.project_id),
            ("storage_bucket", &self.storage_bucket),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_empty())
        .map(|(k, _)| k)
        .collect();
        if !missing.is_empty() {
            bail!(
                "Missing [firebase] settings in config.toml: {}",
                missing.join(", ")
            );
        }
        Ok(())
    }
}

/// Google OAuth client used for the device code sign-in
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoogleSettings {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

/// Application configuration
///
/// Plain values come before tables so the TOML output stays valid.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Feed subscription poll interval in milliseconds
    pub poll_interval_ms: Option<u64>,
    /// Stored session refresh token
    pub refresh_token: Option<String>,
    /// Stored session id token (bearer for database and storage)
    pub id_token: Option<StoredToken>,
    /// Identity of the signed-in user (from last login)
    pub identity: Option<Identity>,
    #[serde(default)]
    pub firebase: FirebaseSettings,
    #[serde(default)]
    pub google: GoogleSettings,
}

impl Config {
    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("com", "chatapp", "chatapp").context("Could not determine config directory")
    }

    /// Get config directory path
    fn config_dir() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().to_path_buf())
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Directory holding client-local data (drafts, forum topics)
    pub fn data_dir() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir).context("Failed to create config directory")?;

        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content).context("Failed to write config file")?;

        // Set restrictive permissions on config file (contains tokens)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&path, perms).context("Failed to set config permissions")?;
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS))
    }

    pub fn set_identity(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }
}

impl TokenStore for Config {
    fn get_id_token(&self) -> Option<StoredToken> {
        self.id_token.clone()
    }

    fn set_id_token(&mut self, token: String, expires_in: Option<u64>) {
        self.id_token = Some(StoredToken::new(token, expires_in));
    }

    fn get_refresh_token(&self) -> Option<String> {
        self.refresh_token.clone()
    }

    fn set_refresh_token(&mut self, token: String) {
        self.refresh_token = Some(token);
    }

    fn clear_session(&mut self) {
        self.id_token = None;
        self.refresh_token = None;
        self.identity = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config = Config::parse(
            r#"
            [firebase]
            api_key = "key"
            project_id = "proj"
            storage_bucket = "proj.firebasestorage.app"
            "#,
        )
        .unwrap();
        assert!(config.firebase.ensure_complete().is_ok());
        assert_eq!(config.poll_interval(), Duration::from_millis(1500));
        assert!(config.identity.is_none());
    }

    #[test]
    fn test_incomplete_firebase_settings() {
        let config = Config::parse("[firebase]\napi_key = \"key\"\n").unwrap();
        let err = config.firebase.ensure_complete().unwrap_err().to_string();
        assert!(err.contains("project_id"));
        assert!(err.contains("storage_bucket"));
        assert!(!err.contains("api_key"));
    }

    #[test]
    fn test_session_round_trip_and_clear() {
        let mut config = Config::default();
        config.poll_interval_ms = Some(250);
        config.set_id_token("id".to_string(), Some(3600));
        config.set_refresh_token("refresh".to_string());
        config.set_identity(Identity {
            uid: "u1".to_string(),
            email: Some("a@example.com".to_string()),
            display_name: None,
            photo_url: None,
        });

        let text = toml::to_string_pretty(&config).unwrap();
        let mut back = Config::parse(&text).unwrap();
        assert_eq!(back.poll_interval(), Duration::from_millis(250));
        assert_eq!(back.get_id_token().unwrap().token, "id");
        assert_eq!(back.identity.as_ref().unwrap().uid, "u1");

        back.clear_session();
        assert!(back.get_id_token().is_none());
        assert!(back.get_refresh_token().is_none());
        assert!(back.identity.is_none());
    }
}
