//! Inbound frame parsing.

use parley_common::ConversationId;

use super::types::{InboundChatFrame, CHAT_MESSAGE_TYPE};
use crate::store::Message;

/// What an inbound text frame turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FrameOutcome {
    Chat {
        conversation_id: ConversationId,
        message: Message,
    },
    /// Valid JSON with a `type` other than `chat.message`, or none at all.
    Ignored { tag: Option<String> },
    /// Not JSON, or a chat frame missing required fields.
    Malformed(String),
}

/// Classify a single inbound text frame.
pub(crate) fn parse_frame(text: &str) -> FrameOutcome {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => return FrameOutcome::Malformed(format!("invalid JSON: {e}")),
    };

    let tag = value.get("type").and_then(|t| t.as_str());
    if tag != Some(CHAT_MESSAGE_TYPE) {
        return FrameOutcome::Ignored {
            tag: tag.map(str::to_string),
        };
    }

    let frame: InboundChatFrame = match serde_json::from_value(value) {
        Ok(f) => f,
        Err(e) => return FrameOutcome::Malformed(format!("bad chat.message frame: {e}")),
    };
    if frame.text.is_empty() {
        return FrameOutcome::Malformed("chat.message frame with empty text".to_string());
    }

    FrameOutcome::Chat {
        conversation_id: frame.conversation_id,
        message: Message {
            sender: frame.sender,
            text: frame.text,
            timestamp: frame.timestamp,
        },
    }
}
