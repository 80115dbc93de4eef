//! Per-conversation message logs.
//!
//! Pure volatile state: no I/O, no deduplication, no capacity bound. Order
//! within a log is exactly the order of the writes that built it.

use std::collections::HashMap;

use parley_common::ConversationId;
use serde::{Deserialize, Serialize};

/// A single chat message.
///
/// `sender` is opaque to the core; consumers compare it against their own id
/// to decide which side of the view a message belongs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: String,
    pub text: String,
    /// Assigned by the server when it relays the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Message {
    pub fn new(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }
}

/// In-memory chat logs keyed by conversation.
#[derive(Debug, Default)]
pub struct ConversationStore {
    logs: HashMap<ConversationId, Vec<Message>>,
    active: Option<ConversationId>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, creating the conversation's log if needed.
    pub fn append_message(&mut self, conversation_id: ConversationId, message: Message) {
        self.logs.entry(conversation_id).or_default().push(message);
    }

    /// Overwrite one conversation's log, e.g. when hydrating history.
    pub fn replace_log(&mut self, conversation_id: ConversationId, messages: Vec<Message>) {
        self.logs.insert(conversation_id, messages);
    }

    /// Messages of a conversation, oldest first. Empty if it was never written.
    pub fn get(&self, conversation_id: &ConversationId) -> &[Message] {
        self.logs
            .get(conversation_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Advisory marker of the conversation the view is bound to.
    pub fn set_active_conversation(&mut self, conversation_id: ConversationId) {
        self.active = Some(conversation_id);
    }

    pub fn active_conversation(&self) -> Option<&ConversationId> {
        self.active.as_ref()
    }

    /// Messages of the active conversation, if one is set.
    pub fn active_messages(&self) -> &[Message] {
        match &self.active {
            Some(id) => self.get(id),
            None => &[],
        }
    }

    /// Drop every log and the active marker. Used on logout.
    pub fn clear(&mut self) {
        self.logs.clear();
        self.active = None;
    }

    /// Conversations that have a log.
    pub fn conversations(&self) -> Vec<&ConversationId> {
        self.logs.keys().collect()
    }

    /// Total number of stored messages across all conversations.
    pub fn total_messages(&self) -> usize {
        self.logs.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ConversationId {
        ConversationId::from(s)
    }

    #[test]
    fn append_creates_log_and_keeps_order() {
        let mut store = ConversationStore::new();
        store.append_message(id("42"), Message::new("u1", "one"));
        store.append_message(id("42"), Message::new("u2", "two"));
        store.append_message(id("42"), Message::new("u1", "three"));

        let texts: Vec<&str> = store.get(&id("42")).iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["one", "two", "three"]);
    }

    #[test]
    fn duplicates_are_kept() {
        let mut store = ConversationStore::new();
        let msg = Message::new("u1", "hi").with_timestamp("T1");
        store.append_message(id("42"), msg.clone());
        store.append_message(id("42"), msg.clone());
        assert_eq!(store.get(&id("42")), [msg.clone(), msg]);
    }

    #[test]
    fn unknown_conversation_is_empty() {
        let store = ConversationStore::new();
        assert!(store.get(&id("nope")).is_empty());
        assert!(store.conversations().is_empty());
    }

    #[test]
    fn replace_log_only_touches_one_conversation() {
        let mut store = ConversationStore::new();
        store.append_message(id("42"), Message::new("u1", "old"));
        store.append_message(id("43"), Message::new("u2", "other"));

        store.replace_log(
            id("42"),
            vec![Message::new("u1", "a"), Message::new("u3", "b")],
        );

        assert_eq!(store.get(&id("42")).len(), 2);
        assert_eq!(store.get(&id("42"))[0].text, "a");
        assert_eq!(store.get(&id("43")), [Message::new("u2", "other")]);
    }

    #[test]
    fn replace_log_creates_conversation() {
        let mut store = ConversationStore::new();
        store.replace_log(id("7"), Vec::new());
        assert_eq!(store.conversations(), [&id("7")]);
    }

    #[test]
    fn active_conversation_tracking() {
        let mut store = ConversationStore::new();
        assert!(store.active_conversation().is_none());
        assert!(store.active_messages().is_empty());

        store.append_message(id("42"), Message::new("u1", "hi"));
        store.set_active_conversation(id("42"));
        assert_eq!(store.active_conversation(), Some(&id("42")));
        assert_eq!(store.active_messages().len(), 1);
    }

    #[test]
    fn clear_resets_everything() {
        let mut store = ConversationStore::new();
        store.append_message(id("42"), Message::new("u1", "hi"));
        store.append_message(id("43"), Message::new("u2", "yo"));
        store.set_active_conversation(id("43"));
        assert_eq!(store.total_messages(), 2);

        store.clear();
        assert_eq!(store.total_messages(), 0);
        assert!(store.active_conversation().is_none());
        assert!(store.get(&id("42")).is_empty());
    }

    #[test]
    fn message_without_timestamp_omits_field() {
        let json = serde_json::to_string(&Message::new("u1", "hi")).unwrap();
        assert_eq!(json, r#"{"sender":"u1","text":"hi"}"#);

        let parsed: Message = serde_json::from_str(r#"{"sender":"u1","text":"hi"}"#).unwrap();
        assert_eq!(parsed.timestamp, None);
    }
}
