//! Authenticated HTTP client for the managed backend
//!
//! Wraps reqwest::Client with id token injection. An expired id token is
//! refreshed in place before the request goes out, so long-running views
//! keep working past the token lifetime.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::auth::identity::{refresh_session, RefreshedTokens};
use crate::auth::TokenStore;
use crate::config::{Config, FirebaseSettings};
use crate::models::Identity;

/// Trades a refresh token for a new id token and persists the result.
#[async_trait]
pub trait SessionRefresher: Send + Sync {
    async fn refresh(&self, api_key: &str, refresh_token: &str) -> Result<RefreshedTokens>;

    fn persist(&self, config: &Config) -> Result<()>;
}

/// Refresh against the secure token endpoint and save to the config file.
struct SecureTokenRefresher {
    http: reqwest::Client,
}

#[async_trait]
impl SessionRefresher for SecureTokenRefresher {
    async fn refresh(&self, api_key: &str, refresh_token: &str) -> Result<RefreshedTokens> {
        refresh_session(&self.http, api_key, refresh_token).await
    }

    fn persist(&self, config: &Config) -> Result<()> {
        config.save()
    }
}

/// Authenticated client shared by the database and storage adapters.
pub struct ServiceClient {
    http: reqwest::Client,
    config: RwLock<Config>,
    firebase: FirebaseSettings,
    poll_interval: Duration,
    identity: Identity,
    refresher: Arc<dyn SessionRefresher>,
}

impl ServiceClient {
    /// Load config and build client.
    pub async fn new() -> Result<Self> {
        let config = Config::load()?;
        config.firebase.ensure_complete()?;
        if config.get_id_token().is_none() && config.get_refresh_token().is_none() {
            bail!("Not signed in. Run 'chatapp login'.");
        }

        let http = reqwest::Client::new();
        let refresher = Arc::new(SecureTokenRefresher { http: http.clone() });
        let client = Self::with_refresher(http, config, refresher)?;

        // Fail at startup rather than on the first poll.
        client.id_token().await?;
        Ok(client)
    }

    fn with_refresher(
        http: reqwest::Client,
        config: Config,
        refresher: Arc<dyn SessionRefresher>,
    ) -> Result<Self> {
        let identity = config
            .identity
            .clone()
            .context("No identity stored. Run 'chatapp login'.")?;
        Ok(Self {
            http,
            firebase: config.firebase.clone(),
            poll_interval: config.poll_interval(),
            identity,
            config: RwLock::new(config),
            refresher,
        })
    }

    /// Current id token, refreshed first if it has expired.
    async fn id_token(&self) -> Result<String> {
        {
            let config = self.config.read().await;
            if let Some(token) = config.get_id_token().filter(|t| !t.is_expired()) {
                return Ok(token.token);
            }
        }

        let mut config = self.config.write().await;
        // Another request may have refreshed while we waited for the lock.
        if let Some(token) = config.get_id_token().filter(|t| !t.is_expired()) {
            return Ok(token.token);
        }

        let refresh_token = config
            .get_refresh_token()
            .context("Session token expired. Run 'chatapp login'.")?;
        tracing::info!("Session token missing or expired, refreshing...");
        let tokens = self
            .refresher
            .refresh(&self.firebase.api_key, &refresh_token)
            .await
            .context("Token refresh failed. Run 'chatapp login'.")?;

        config.set_id_token(tokens.id_token.clone(), tokens.expires_in);
        if let Some(rt) = tokens.refresh_token {
            config.set_refresh_token(rt);
        }
        if let Err(e) = self.refresher.persist(&config) {
            tracing::warn!("Failed to save refreshed session: {:#}", e);
        }
        tracing::info!("Session token refreshed");
        Ok(tokens.id_token)
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn firebase(&self) -> &FirebaseSettings {
        &self.firebase
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// POST a JSON body with bearer auth.
    pub async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response> {
        let token = self.id_token().await?;
        tracing::debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .bearer_auth(&token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        check_response(resp, url).await
    }

    /// POST raw bytes with bearer auth and the given content type.
    pub async fn post_bytes(
        &self,
        url: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<reqwest::Response> {
        let token = self.id_token().await?;
        tracing::debug!("POST {} ({} bytes, {})", url, bytes.len(), content_type);

        let resp = self
            .http
            .post(url)
            .bearer_auth(&token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        check_response(resp, url).await
    }
}

/// Check HTTP response status code and return a clear error on failure.
async fn check_response(resp: reqwest::Response, url: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        bail!(
            "401 Unauthorized for {}. Token may be invalid -- run 'chatapp login'.",
            url
        );
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("HTTP {} for {}: {}", status.as_u16(), url, body);
    }
    Ok(resp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StoredToken;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingRefresher {
        refreshes: AtomicUsize,
        saves: AtomicUsize,
    }

    #[async_trait]
    impl SessionRefresher for CountingRefresher {
        async fn refresh(&self, api_key: &str, refresh_token: &str) -> Result<RefreshedTokens> {
            assert_eq!(api_key, "key");
            assert_eq!(refresh_token, "refresh");
            let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(RefreshedTokens {
                id_token: format!("fresh-{}", n),
                refresh_token: Some("rotated".to_string()),
                expires_in: Some(3600),
            })
        }

        fn persist(&self, _config: &Config) -> Result<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn config_with(token: StoredToken, refresh_token: Option<&str>) -> Config {
        let mut config = Config::default();
        config.firebase.api_key = "key".to_string();
        config.id_token = Some(token);
        config.refresh_token = refresh_token.map(str::to_string);
        config.identity = Some(Identity {
            uid: "u1".to_string(),
            email: None,
            display_name: None,
            photo_url: None,
        });
        config
    }

    fn expired() -> StoredToken {
        StoredToken {
            token: "stale".to_string(),
            expires_at: Some(0),
        }
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_once() {
        let refresher = Arc::new(CountingRefresher::default());
        let client = ServiceClient::with_refresher(
            reqwest::Client::new(),
            config_with(expired(), Some("refresh")),
            refresher.clone(),
        )
        .unwrap();

        assert_eq!(client.id_token().await.unwrap(), "fresh-1");
        assert_eq!(client.id_token().await.unwrap(), "fresh-1");
        assert_eq!(refresher.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(refresher.saves.load(Ordering::SeqCst), 1);

        let config = client.config.read().await;
        assert_eq!(config.get_refresh_token().as_deref(), Some("rotated"));
    }

    #[tokio::test]
    async fn test_valid_token_skips_refresh() {
        let refresher = Arc::new(CountingRefresher::default());
        let client = ServiceClient::with_refresher(
            reqwest::Client::new(),
            config_with(StoredToken::new("live".to_string(), Some(3600)), Some("refresh")),
            refresher.clone(),
        )
        .unwrap();

        assert_eq!(client.id_token().await.unwrap(), "live");
        assert_eq!(refresher.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_without_refresh_token_asks_for_login() {
        let refresher = Arc::new(CountingRefresher::default());
        let client = ServiceClient::with_refresher(
            reqwest::Client::new(),
            config_with(expired(), None),
            refresher.clone(),
        )
        .unwrap();

        let err = client.id_token().await.unwrap_err().to_string();
        assert!(err.contains("chatapp login"));
        assert_eq!(refresher.refreshes.load(Ordering::SeqCst), 0);
    }
}
