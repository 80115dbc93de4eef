//! Configuration, wire frames, and event enums for the chat transport.

use std::fmt;
use std::time::Duration;

use parley_common::ConversationId;
use serde::{Deserialize, Deserializer, Serialize};

use crate::store::Message;

/// Tag carried by inbound chat frames.
pub(crate) const CHAT_MESSAGE_TYPE: &str = "chat.message";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Where and how to open the chat transport.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// `ws://host[:port]` or `wss://host[:port]`, without a path.
    pub ws_base: String,
    /// Handshake deadline; a transport that misses it reports an error.
    pub connect_timeout: Duration,
    /// Capacity of the [`ChatEvent`] broadcast channel.
    pub event_capacity: usize,
}

impl RealtimeConfig {
    pub fn new(ws_base: impl Into<String>) -> Self {
        Self {
            ws_base: ws_base.into(),
            ..Self::default()
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ws_base: "ws://localhost:8000".to_string(),
            connect_timeout: Duration::from_secs(15),
            event_capacity: 256,
        }
    }
}

// ---------------------------------------------------------------------------
// Session State
// ---------------------------------------------------------------------------

/// Lifecycle of the current transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Point-in-time view of the connection manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub room: Option<ConversationId>,
    pub status: SessionStatus,
    pub epoch: u64,
}

// ---------------------------------------------------------------------------
// Wire Frames
// ---------------------------------------------------------------------------

/// Frame written to the transport by `send`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct OutboundFrame<'a> {
    pub(crate) conversation_id: &'a ConversationId,
    pub(crate) sender: &'a str,
    pub(crate) text: &'a str,
}

/// Body of an inbound frame tagged `chat.message`.
///
/// `conversation_id` and `sender` are opaque ids; the server may send either
/// as a JSON string or number.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct InboundChatFrame {
    #[serde(deserialize_with = "opaque_conversation_id")]
    pub(crate) conversation_id: ConversationId,
    #[serde(deserialize_with = "opaque_id")]
    pub(crate) sender: String,
    pub(crate) text: String,
    #[serde(default)]
    pub(crate) timestamp: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OpaqueId {
    Text(String),
    Number(serde_json::Number),
}

fn opaque_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match OpaqueId::deserialize(deserializer)? {
        OpaqueId::Text(text) => text,
        OpaqueId::Number(number) => number.to_string(),
    })
}

fn opaque_conversation_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<ConversationId, D::Error> {
    opaque_id(deserializer).map(ConversationId::from)
}

// ---------------------------------------------------------------------------
// Events & Commands
// ---------------------------------------------------------------------------

/// Lifecycle and data events raised by a transport task.
#[derive(Debug, Clone)]
pub(crate) enum TransportEventKind {
    Opened,
    Closed,
    ErrorRaised(String),
    FrameReceived(String),
}

/// A transport event tagged with the epoch of the transport that raised it.
#[derive(Debug, Clone)]
pub(crate) struct TransportEvent {
    pub(crate) epoch: u64,
    pub(crate) kind: TransportEventKind,
}

impl TransportEvent {
    pub(crate) fn new(epoch: u64, kind: TransportEventKind) -> Self {
        Self { epoch, kind }
    }
}

/// Commands from the manager to its transport task.
#[derive(Debug)]
pub(crate) enum TransportCommand {
    Send(String),
    Close,
}

/// Events published to observers of the connection manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// A message from the current transport was appended to the store.
    MessageAppended {
        conversation_id: ConversationId,
        message: Message,
    },
}
