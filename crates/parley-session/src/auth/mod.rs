//! Authenticated REST requests.
//!
//! [`AuthenticatedClient`] attaches the bearer credential from a
//! [`SessionProvider`] to each request and, on a 401, refreshes the
//! credential and retries exactly once. Concurrent 401s share one refresh.

mod client;
mod provider;

pub use client::{build_http_client, ApiRequest, AuthOutcome, AuthenticatedClient};
pub use provider::{AuthState, RefreshError, SessionProvider, TokenSession};
