//! Credential holders.

use std::fmt;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tokio::sync::{watch, RwLock};
use tracing::{info, warn};

/// Why a refresh did not produce a new credential.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("refresh rejected with HTTP {0}")]
    Rejected(StatusCode),

    #[error("refresh request failed: {0}")]
    Network(String),

    #[error("refresh response unreadable: {0}")]
    Decode(String),

    #[error("refresh response carried no access token")]
    MissingToken,
}

/// Source of the bearer credential shared by REST calls and the chat
/// transport.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// The current credential, if logged in.
    async fn access_token(&self) -> Option<String>;

    /// Exchange the expired credential for a new one and store it.
    async fn refresh(&self) -> Result<String, RefreshError>;

    /// Log out: forget the credential.
    async fn teardown(&self);
}

/// Whether a [`TokenSession`] currently holds a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Authenticated,
    LoggedOut,
}

#[derive(Deserialize)]
struct RefreshGrant {
    #[serde(default)]
    access: Option<String>,
    /// Present when the server rotates refresh tokens.
    #[serde(default)]
    refresh: Option<String>,
}

/// Token-pair session backed by the server's refresh endpoint.
///
/// The refresh token normally rides along as an HTTP-only cookie in the
/// client's cookie store. One passed to [`with_refresh_token`](Self::with_refresh_token)
/// is also sent in the request body.
pub struct TokenSession {
    http: reqwest::Client,
    refresh_url: Url,
    access_token: RwLock<Option<String>>,
    refresh_token: RwLock<Option<String>>,
    state_tx: watch::Sender<AuthState>,
}

impl TokenSession {
    pub fn new(http: reqwest::Client, refresh_url: Url, access_token: Option<String>) -> Self {
        let state = if access_token.is_some() {
            AuthState::Authenticated
        } else {
            AuthState::LoggedOut
        };
        let (state_tx, _) = watch::channel(state);
        Self {
            http,
            refresh_url,
            access_token: RwLock::new(access_token),
            refresh_token: RwLock::new(None),
            state_tx,
        }
    }

    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = RwLock::new(Some(token.into()));
        self
    }

    /// Store a credential obtained by logging in.
    pub async fn set_access_token(&self, token: impl Into<String>) {
        *self.access_token.write().await = Some(token.into());
        self.publish(AuthState::Authenticated);
    }

    pub fn state(&self) -> AuthState {
        *self.state_tx.borrow()
    }

    /// Watch for logout, e.g. to send the user back to a login screen.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    fn publish(&self, state: AuthState) {
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }
}

#[async_trait]
impl SessionProvider for TokenSession {
    async fn access_token(&self) -> Option<String> {
        self.access_token.read().await.clone()
    }

    async fn refresh(&self) -> Result<String, RefreshError> {
        let body = match self.refresh_token.read().await.as_deref() {
            Some(token) => serde_json::json!({ "refresh": token }),
            None => serde_json::json!({}),
        };

        let response = self
            .http
            .post(self.refresh_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| RefreshError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Refresh endpoint rejected the session");
            return Err(RefreshError::Rejected(status));
        }

        let grant: RefreshGrant = response
            .json()
            .await
            .map_err(|e| RefreshError::Decode(e.to_string()))?;
        let access = grant
            .access
            .filter(|t| !t.is_empty())
            .ok_or(RefreshError::MissingToken)?;

        if let Some(rotated) = grant.refresh {
            *self.refresh_token.write().await = Some(rotated);
        }
        *self.access_token.write().await = Some(access.clone());
        self.publish(AuthState::Authenticated);
        info!("Access token refreshed");
        Ok(access)
    }

    async fn teardown(&self) {
        *self.access_token.write().await = None;
        *self.refresh_token.write().await = None;
        self.publish(AuthState::LoggedOut);
        info!("Session torn down");
    }
}

impl fmt::Debug for TokenSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSession")
            .field("refresh_url", &self.refresh_url.as_str())
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("state", &self.state())
            .finish()
    }
}
