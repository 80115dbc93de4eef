//! Real-time chat session core.
//!
//! Three pieces keep a client's chat view in step with the conversation
//! service:
//!
//! - [`ConversationStore`]: per-conversation, delivery-ordered message logs.
//! - [`ConnectionManager`]: owns the single live WebSocket transport, switches
//!   rooms, and routes inbound `chat.message` frames into the store.
//! - [`AuthenticatedClient`]: attaches the bearer credential to REST calls and
//!   refreshes it once on a 401.
//!
//! [`ChatApi`] layers the typed REST endpoints on top of the client.

pub mod api;
pub mod auth;
pub mod error;
pub mod realtime;
pub mod store;

pub use api::{Analytics, ChatApi, ConnectedUser, LeadType, Sentiment};
pub use auth::{
    build_http_client, ApiRequest, AuthOutcome, AuthState, AuthenticatedClient, RefreshError,
    SessionProvider, TokenSession,
};
pub use error::SessionError;
pub use realtime::{ChatEvent, ConnectionManager, RealtimeConfig, SessionSnapshot, SessionStatus};
pub use store::{ConversationStore, Message};

pub use parley_common::ConversationId;
