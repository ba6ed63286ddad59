//! Identity state shared with the rest of the client
//!
//! `AuthSession` owns the current identity and publishes every change
//! through a watch channel. Sign-in and sign-out failures leave the state
//! untouched and come back as a destructive notice.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::watch;

use crate::models::Identity;
use crate::notice::Notice;

/// External identity provider.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Identity from a previous session, if one is stored.
    fn restore(&self) -> Option<Identity>;
    async fn sign_in(&self) -> Result<Identity>;
    async fn sign_out(&self) -> Result<()>;
}

pub struct AuthSession {
    provider: Arc<dyn AuthProvider>,
    state: watch::Sender<Option<Identity>>,
}

impl AuthSession {
    pub fn new(provider: impl AuthProvider + 'static) -> Self {
        let provider: Arc<dyn AuthProvider> = Arc::new(provider);
        let (state, _) = watch::channel(provider.restore());
        Self { provider, state }
    }

    pub fn current(&self) -> Option<Identity> {
        self.state.borrow().clone()
    }

    /// Receive identity-state changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.state.subscribe()
    }

    pub async fn sign_in(&self) -> Notice {
        match self.provider.sign_in().await {
            Ok(identity) => {
                tracing::info!("Signed in as {}", identity.uid);
                self.state.send_replace(Some(identity));
                Notice::success("Success", "You have successfully signed in")
            }
            Err(e) => {
                tracing::warn!("Sign-in failed: {:#}", e);
                Notice::destructive("Error signing in", "Failed to sign in with Google")
            }
        }
    }

    pub async fn sign_out(&self) -> Notice {
        match self.provider.sign_out().await {
            Ok(()) => {
                self.state.send_replace(None);
                Notice::success("Logged Out", "You have been signed out")
            }
            Err(e) => {
                tracing::warn!("Sign-out failed: {:#}", e);
                Notice::destructive("Error signing out", "Failed to sign out")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeProvider {
        stored: Option<Identity>,
        fail: AtomicBool,
    }

    fn ada() -> Identity {
        Identity {
            uid: "ada".to_string(),
            email: Some("ada@example.com".to_string()),
            display_name: Some("Ada".to_string()),
            photo_url: None,
        }
    }

    #[async_trait]
    impl AuthProvider for FakeProvider {
        fn restore(&self) -> Option<Identity> {
            self.stored.clone()
        }

        async fn sign_in(&self) -> Result<Identity> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("popup closed");
            }
            Ok(ada())
        }

        async fn sign_out(&self) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("network down");
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_sign_in_publishes_identity() {
        let session = AuthSession::new(FakeProvider {
            stored: None,
            fail: AtomicBool::new(false),
        });
        let mut rx = session.subscribe();
        assert!(session.current().is_none());

        let notice = session.sign_in().await;
        assert!(!notice.is_error());
        assert_eq!(notice.description, "You have successfully signed in");

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().unwrap().uid, "ada");
    }

    #[tokio::test]
    async fn test_failed_sign_in_leaves_state_unchanged() {
        let session = AuthSession::new(FakeProvider {
            stored: None,
            fail: AtomicBool::new(true),
        });
        let rx = session.subscribe();

        let notice = session.sign_in().await;
        assert!(notice.is_error());
        assert_eq!(notice.description, "Failed to sign in with Google");
        assert!(session.current().is_none());
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_sign_out_clears_identity() {
        let session = AuthSession::new(FakeProvider {
            stored: Some(ada()),
            fail: AtomicBool::new(false),
        });
        assert!(session.current().is_some());

        let notice = session.sign_out().await;
        assert_eq!(notice.title.as_deref(), Some("Logged Out"));
        assert!(session.current().is_none());
    }

    #[tokio::test]
    async fn test_failed_sign_out_keeps_identity() {
        let session = AuthSession::new(FakeProvider {
            stored: Some(ada()),
            fail: AtomicBool::new(true),
        });

        let notice = session.sign_out().await;
        assert!(notice.is_error());
        assert_eq!(session.current().unwrap().uid, "ada");
    }
}
