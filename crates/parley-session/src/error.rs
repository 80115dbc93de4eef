use parley_common::ParleyError;
use reqwest::StatusCode;

/// Failures that cross the session-core boundary.
///
/// Transport-side conditions (socket errors, malformed frames, stale
/// frames, sends while disconnected) never show up here; they are logged
/// and reflected in [`crate::SessionStatus`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The credential was rejected and could not be refreshed. The session
    /// has been torn down; the caller should send the user back to login.
    #[error("authentication session expired, please log in again")]
    AuthExpired,

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<SessionError> for ParleyError {
    fn from(err: SessionError) -> Self {
        ParleyError::Session(err.to_string())
    }
}
