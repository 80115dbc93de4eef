//! Bearer attachment with one-shot refresh-and-retry.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Method, Response, StatusCode, Url};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::provider::SessionProvider;
use crate::error::SessionError;

/// Build the HTTP client shared by [`AuthenticatedClient`] and
/// [`TokenSession`](super::TokenSession). Cookies persist across requests so
/// an HTTP-only refresh cookie reaches the refresh endpoint.
pub fn build_http_client(
    connect_timeout: Duration,
    request_timeout: Duration,
) -> Result<reqwest::Client, SessionError> {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .cookie_store(true)
        .build()
        .map_err(|e| SessionError::Network(format!("failed to build HTTP client: {e}")))
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A request that can be issued more than once.
#[derive(Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post_json(url: Url, body: serde_json::Value) -> Self {
        Self {
            body: Some(body),
            ..Self::new(Method::POST, url)
        }
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

// Header values may carry credentials; print names only.
impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("body", &self.body.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of [`AuthenticatedClient::send_with_refresh`].
///
/// `Succeeded` carries whatever the server answered last, a 401 from the
/// single retry included. `Expired` means the refresh failed and the session
/// has been torn down.
#[derive(Debug)]
pub enum AuthOutcome {
    Succeeded(Response),
    Expired,
}

impl AuthOutcome {
    pub fn into_response(self) -> Result<Response, SessionError> {
        match self {
            Self::Succeeded(response) => Ok(response),
            Self::Expired => Err(SessionError::AuthExpired),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Refresh attempts completed so far, and whether the latest one failed.
#[derive(Debug, Default)]
struct RefreshGeneration {
    value: u64,
    last_failed: bool,
}

/// What a 401 turned into once the refresh lock was held.
enum RetryPlan {
    Retry(Option<String>),
    GiveUp,
    Expired,
}

pub struct AuthenticatedClient {
    http: reqwest::Client,
    provider: Arc<dyn SessionProvider>,
    issuance_marker: String,
    refresh: Mutex<RefreshGeneration>,
}

impl AuthenticatedClient {
    /// `issuance_marker` is a URL fragment identifying credential-issuing
    /// endpoints; a 401 from those is returned as-is.
    pub fn new(
        http: reqwest::Client,
        provider: Arc<dyn SessionProvider>,
        issuance_marker: impl Into<String>,
    ) -> Self {
        Self {
            http,
            provider,
            issuance_marker: issuance_marker.into(),
            refresh: Mutex::new(RefreshGeneration::default()),
        }
    }

    pub fn provider(&self) -> &Arc<dyn SessionProvider> {
        &self.provider
    }

    /// Issue `request`, returning the response or [`SessionError::AuthExpired`].
    pub async fn request(&self, request: ApiRequest) -> Result<Response, SessionError> {
        self.send_with_refresh(request).await?.into_response()
    }

    /// Issue `request`; on a 401 refresh the credential and retry once.
    ///
    /// A transport failure on either attempt is returned as
    /// [`SessionError::Network`].
    pub async fn send_with_refresh(&self, request: ApiRequest) -> Result<AuthOutcome, SessionError> {
        let generation = self.refresh.lock().await.value;
        let token = self.provider.access_token().await;

        let response = self.send_once(&request, token.as_deref(), false).await?;
        if response.status() != StatusCode::UNAUTHORIZED || self.is_issuance(&request.url) {
            return Ok(AuthOutcome::Succeeded(response));
        }

        debug!(path = request.url.path(), "Request unauthorized");
        match self.plan_retry(generation).await {
            RetryPlan::Retry(token) => {
                let retried = self.send_once(&request, token.as_deref(), true).await?;
                if retried.status() == StatusCode::UNAUTHORIZED {
                    warn!(path = request.url.path(), "Request still unauthorized after refresh");
                }
                Ok(AuthOutcome::Succeeded(retried))
            }
            RetryPlan::GiveUp => Ok(AuthOutcome::Succeeded(response)),
            RetryPlan::Expired => Ok(AuthOutcome::Expired),
        }
    }

    /// Run or join the refresh for the generation a request was sent under.
    async fn plan_retry(&self, sent_under: u64) -> RetryPlan {
        let mut refresh = self.refresh.lock().await;

        if refresh.value != sent_under {
            if refresh.last_failed {
                debug!("Session already expired by a concurrent refresh");
                return RetryPlan::GiveUp;
            }
            return RetryPlan::Retry(self.provider.access_token().await);
        }

        refresh.value += 1;
        match self.provider.refresh().await {
            Ok(token) => {
                refresh.last_failed = false;
                info!(generation = refresh.value, "Credential refreshed");
                RetryPlan::Retry(Some(token))
            }
            Err(e) => {
                refresh.last_failed = true;
                warn!(error = %e, "Credential refresh failed, ending session");
                self.provider.teardown().await;
                RetryPlan::Expired
            }
        }
    }

    async fn send_once(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
        overwrite: bool,
    ) -> Result<Response, SessionError> {
        let mut headers = request.headers.clone();
        if let Some(token) = token {
            if overwrite || !headers.contains_key(AUTHORIZATION) {
                headers.insert(AUTHORIZATION, bearer(token)?);
            }
        }

        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        builder
            .send()
            .await
            .map_err(|e| SessionError::Network(e.to_string()))
    }

    fn is_issuance(&self, url: &Url) -> bool {
        url.as_str().contains(&self.issuance_marker)
    }
}

impl fmt::Debug for AuthenticatedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedClient")
            .field("issuance_marker", &self.issuance_marker)
            .finish_non_exhaustive()
    }
}

fn bearer(token: &str) -> Result<HeaderValue, SessionError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| SessionError::InvalidRequest("credential is not a valid header value".into()))?;
    value.set_sensitive(true);
    Ok(value)
}
