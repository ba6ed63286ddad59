//! Firebase identity exchange
//!
//! After the Google device flow yields an access token, exchange it for a
//! Firebase session via the Identity Toolkit `signInWithIdp` endpoint. The
//! Firebase id token is what the database and storage APIs accept.

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::models::Identity;

const SIGN_IN_WITH_IDP_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:signInWithIdp";
const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";

/// Response from `accounts:signInWithIdp`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdpResponse {
    local_id: Option<String>,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    id_token: Option<String>,
    refresh_token: Option<String>,
    /// Seconds, encoded as a string
    expires_in: Option<String>,
}

/// Response from the secure token refresh endpoint
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<String>,
}

/// A Firebase session: tokens plus the identity they belong to.
#[derive(Debug)]
pub struct FirebaseSession {
    pub identity: Identity,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_in: Option<u64>,
}

/// Refreshed session tokens.
#[derive(Debug)]
pub struct RefreshedTokens {
    pub id_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
}

/// Exchange a Google OAuth access token for a Firebase session.
pub async fn sign_in_with_google(
    http: &reqwest::Client,
    api_key: &str,
    google_access_token: &str,
) -> Result<FirebaseSession> {
    tracing::debug!("Exchanging Google token at {}", SIGN_IN_WITH_IDP_URL);

    let body = serde_json::json!({
        "postBody": format!("access_token={}&providerId=google.com", google_access_token),
        "requestUri": "http://localhost",
        "returnSecureToken": true,
        "returnIdpCredential": true,
    });

    let resp = http
        .post(SIGN_IN_WITH_IDP_URL)
        .query(&[("key", api_key)])
        .json(&body)
        .send()
        .await
        .context("Failed to call signInWithIdp")?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!(
            "Identity exchange failed (HTTP {}): {}",
            status.as_u16(),
            body
        );
    }

    let idp: IdpResponse = resp
        .json()
        .await
        .context("Failed to parse signInWithIdp response")?;
    session_from_idp(idp)
}

fn session_from_idp(idp: IdpResponse) -> Result<FirebaseSession> {
    let uid = idp
        .local_id
        .context("signInWithIdp response missing 'localId'")?;
    let id_token = idp
        .id_token
        .context("signInWithIdp response missing 'idToken'")?;
    let refresh_token = idp
        .refresh_token
        .context("signInWithIdp response missing 'refreshToken'")?;

    Ok(FirebaseSession {
        identity: Identity {
            uid,
            email: idp.email,
            display_name: idp.display_name,
            photo_url: idp.photo_url,
        },
        id_token,
        refresh_token,
        expires_in: idp.expires_in.and_then(|s| s.parse().ok()),
    })
}

/// Trade a refresh token for a fresh id token.
pub async fn refresh_session(
    http: &reqwest::Client,
    api_key: &str,
    refresh_token: &str,
) -> Result<RefreshedTokens> {
    tracing::debug!("Refreshing id token at {}", SECURE_TOKEN_URL);

    let resp = http
        .post(SECURE_TOKEN_URL)
        .query(&[("key", api_key)])
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .send()
        .await
        .context("Failed to call secure token endpoint")?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("Token refresh failed (HTTP {}): {}", status.as_u16(), body);
    }

    let refreshed: RefreshResponse = resp
        .json()
        .await
        .context("Failed to parse token refresh response")?;

    Ok(RefreshedTokens {
        id_token: refreshed
            .id_token
            .context("Token refresh response missing 'id_token'")?,
        refresh_token: refreshed.refresh_token,
        expires_in: refreshed.expires_in.and_then(|s| s.parse().ok()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_from_idp_response() {
        let idp: IdpResponse = serde_json::from_str(
            r#"{
                "localId": "uid-1",
                "email": "ada@example.com",
                "displayName": "Ada",
                "photoUrl": "https://img/ada.png",
                "idToken": "id",
                "refreshToken": "refresh",
                "expiresIn": "3600"
            }"#,
        )
        .unwrap();
        let session = session_from_idp(idp).unwrap();
        assert_eq!(session.identity.uid, "uid-1");
        assert_eq!(session.identity.display_name.as_deref(), Some("Ada"));
        assert_eq!(session.expires_in, Some(3600));
    }

    #[test]
    fn test_session_from_idp_requires_tokens() {
        let idp: IdpResponse = serde_json::from_str(r#"{"localId": "uid-1"}"#).unwrap();
        let err = session_from_idp(idp).unwrap_err().to_string();
        assert!(err.contains("idToken"));
    }
}
