//! Google OAuth2 device code flow, plus Firebase session exchange

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use oauth2::{
    basic::BasicClient, AuthUrl, ClientId, ClientSecret, DeviceAuthorizationUrl, Scope,
    StandardDeviceAuthorizationResponse, TokenResponse, TokenUrl,
};

use super::identity::{refresh_session, sign_in_with_google};
use super::session::{AuthProvider, AuthSession};
use super::{AuthConfig, TokenStore};
use crate::config::Config;
use crate::models::Identity;

/// Build the OAuth2 client from an AuthConfig
fn build_client(auth_config: &AuthConfig) -> Result<BasicClient> {
    if auth_config.client_id.is_empty() {
        bail!("Missing [google] client_id in config.toml");
    }

    let client_secret = if auth_config.client_secret.is_empty() {
        None
    } else {
        Some(ClientSecret::new(auth_config.client_secret.clone()))
    };

    Ok(BasicClient::new(
        ClientId::new(auth_config.client_id.clone()),
        client_secret,
        AuthUrl::new(auth_config.auth_url.to_string())?,
        Some(TokenUrl::new(auth_config.token_url.to_string())?),
    )
    .set_device_authorization_url(DeviceAuthorizationUrl::new(
        auth_config.device_url.to_string(),
    )?))
}

/// Refresh the Firebase id token using the stored refresh token.
/// Returns Ok(true) if refresh succeeded.
pub async fn refresh() -> Result<bool> {
    let mut config = Config::load()?;
    let refresh_token = match config.get_refresh_token() {
        Some(rt) => rt,
        None => return Ok(false),
    };

    tracing::info!("Refreshing session token...");
    let http = reqwest::Client::new();
    let tokens = refresh_session(&http, &config.firebase.api_key, &refresh_token).await?;

    config.set_id_token(tokens.id_token, tokens.expires_in);
    if let Some(rt) = tokens.refresh_token {
        config.set_refresh_token(rt);
    }
    config.save()?;
    tracing::info!("Session token refreshed");
    Ok(true)
}

/// Sign-in through the Google device flow, persisted in the config file.
pub struct GoogleSignIn {
    /// Run the device flow even when a usable session exists.
    force: bool,
}

impl GoogleSignIn {
    pub fn new(force: bool) -> Self {
        Self { force }
    }

    /// Reuse the stored session if it is valid or refreshable.
    async fn existing_session(&self) -> Option<Identity> {
        let config = Config::load().ok()?;
        let identity = config.identity.clone()?;

        if let Some(token) = config.get_id_token() {
            if !token.is_expired() {
                println!("Already signed in. Use --force to re-authenticate.");
                return Some(identity);
            }
        }
        if config.get_refresh_token().is_some() {
            tracing::info!("Session token expired, attempting refresh...");
            match refresh().await {
                Ok(true) => {
                    println!("Session refreshed.");
                    return Some(identity);
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Refresh failed, falling back to device code: {:#}", e);
                }
            }
        }
        None
    }
}

#[async_trait]
impl AuthProvider for GoogleSignIn {
    fn restore(&self) -> Option<Identity> {
        let config = Config::load().ok()?;
        config.get_refresh_token()?;
        config.identity
    }

    async fn sign_in(&self) -> Result<Identity> {
        if !self.force {
            if let Some(identity) = self.existing_session().await {
                return Ok(identity);
            }
        }

        let mut config = Config::load()?;
        config.firebase.ensure_complete()?;
        let auth_config = AuthConfig::from_settings(&config.google);
        let client = build_client(&auth_config)?;

        // Use device code flow for CLI
        tracing::info!("Initiating device code flow...");

        let mut request = client.exchange_device_code()?;
        for scope in auth_config.scopes {
            request = request.add_scope(Scope::new(scope.to_string()));
        }
        let device_auth_response: StandardDeviceAuthorizationResponse = request
            .request_async(oauth2::reqwest::async_http_client)
            .await
            .context("Failed to request device code")?;

        println!();
        println!(
            "To sign in, visit: {}",
            device_auth_response.verification_uri().as_str()
        );
        println!(
            "Enter code:        {}",
            device_auth_response.user_code().secret()
        );
        println!();

        tracing::info!("Waiting for authentication...");

        let token_response = client
            .exchange_device_access_token(&device_auth_response)
            .request_async(oauth2::reqwest::async_http_client, tokio::time::sleep, None)
            .await
            .context("Failed to exchange device code for token")?;

        let http = reqwest::Client::new();
        let session = sign_in_with_google(
            &http,
            &config.firebase.api_key,
            token_response.access_token().secret(),
        )
        .await?;

        config.set_id_token(session.id_token, session.expires_in);
        config.set_refresh_token(session.refresh_token);
        config.set_identity(session.identity.clone());
        config.save()?;

        Ok(session.identity)
    }

    async fn sign_out(&self) -> Result<()> {
        let mut config = Config::load()?;
        config.clear_session();
        config.save()
    }
}

/// Perform the sign-in flow and report the outcome.
pub async fn login(force: bool) -> Result<()> {
    let session = AuthSession::new(GoogleSignIn::new(force));
    let notice = session.sign_in().await;
    if notice.is_error() {
        bail!("{}", notice);
    }
    println!("{}", notice);
    if let Some(identity) = session.current() {
        println!("Signed in as {} ({})", identity.display_name(), identity.uid);
    }
    Ok(())
}

/// Clear the stored session
pub async fn logout() -> Result<()> {
    let session = AuthSession::new(GoogleSignIn::new(false));
    let notice = session.sign_out().await;
    if notice.is_error() {
        bail!("{}", notice);
    }
    println!("{}", notice);
    Ok(())
}

/// Display current auth status
pub async fn status() -> Result<()> {
    let config = Config::load()?;

    println!("Config file:   {}", Config::config_path()?.display());

    match config.get_id_token() {
        Some(token) if !token.is_expired() => {
            println!("Id token:      valid");
            if let Some(exp) = token.expires_at {
                println!("  expires_at:  {}", exp);
            }
        }
        Some(_) => println!("Id token:      expired"),
        None => println!("Id token:      none"),
    }

    match config.get_refresh_token() {
        Some(_) => println!("Refresh token: present"),
        None => println!("Refresh token: none"),
    }

    match config.identity {
        Some(ref identity) => println!(
            "Identity:      {} <{}>",
            identity.display_name(),
            identity.email.as_deref().unwrap_or("")
        ),
        None => println!("Identity:      none"),
    }

    match config.firebase.ensure_complete() {
        Ok(()) => println!("Backend:       {}", config.firebase.project_id),
        Err(e) => println!("Backend:       {:#}", e),
    }

    if config.identity.is_none() {
        println!("\nRun 'chatapp login' to sign in.");
    }

    Ok(())
}
