//! Connection manager: one live transport, epoch-guarded event routing.

use std::sync::Arc;

use parley_common::ConversationId;
use reqwest::Url;
use tokio::sync::{broadcast, mpsc, watch, Mutex, RwLock};
use tracing::{debug, info, warn};

use super::connection::run_transport;
use super::handler::{parse_frame, FrameOutcome};
use super::types::{
    ChatEvent, OutboundFrame, RealtimeConfig, SessionSnapshot, SessionStatus, TransportCommand,
    TransportEvent, TransportEventKind,
};
use crate::store::{ConversationStore, Message};

// ---------------------------------------------------------------------------
// Session State
// ---------------------------------------------------------------------------

/// Handle to the transport task of one epoch.
struct TransportHandle {
    epoch: u64,
    command_tx: mpsc::UnboundedSender<TransportCommand>,
}

/// Everything the manager mutates. Only touched under [`Shared::state`].
pub(crate) struct SessionState {
    room: Option<ConversationId>,
    credential: Option<String>,
    status: SessionStatus,
    epoch: u64,
    transport: Option<TransportHandle>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            room: None,
            credential: None,
            status: SessionStatus::Disconnected,
            epoch: 0,
            transport: None,
        }
    }

    /// True while a transport for exactly this room and credential is
    /// opening or open.
    fn is_bound_to(&self, room: &ConversationId, credential: &str) -> bool {
        matches!(
            self.status,
            SessionStatus::Connecting | SessionStatus::Connected
        ) && self.transport.is_some()
            && self.room.as_ref() == Some(room)
            && self.credential.as_deref() == Some(credential)
    }

    fn close_transport(&mut self) {
        if let Some(transport) = self.transport.take() {
            debug!(epoch = transport.epoch, "Closing chat transport");
            let _ = transport.command_tx.send(TransportCommand::Close);
        }
    }

    /// Apply one transport event. Returns the message to append, if any.
    fn on_event(&mut self, event: TransportEvent) -> Option<(ConversationId, Message)> {
        if event.epoch != self.epoch {
            debug!(
                event_epoch = event.epoch,
                current_epoch = self.epoch,
                "Discarding event from superseded transport"
            );
            return None;
        }

        match event.kind {
            TransportEventKind::Opened => {
                if self.status == SessionStatus::Connecting {
                    info!(room = ?self.room, epoch = self.epoch, "Chat transport connected");
                    self.status = SessionStatus::Connected;
                }
                None
            }
            TransportEventKind::Closed => {
                self.transport = None;
                if self.status != SessionStatus::Error {
                    self.status = SessionStatus::Disconnected;
                }
                None
            }
            TransportEventKind::ErrorRaised(reason) => {
                warn!(room = ?self.room, epoch = self.epoch, %reason, "Chat transport failed");
                self.transport = None;
                self.status = SessionStatus::Error;
                None
            }
            TransportEventKind::FrameReceived(text) => match parse_frame(&text) {
                FrameOutcome::Chat {
                    conversation_id,
                    message,
                } => Some((conversation_id, message)),
                FrameOutcome::Ignored { tag } => {
                    debug!(?tag, "Ignoring non-chat frame");
                    None
                }
                FrameOutcome::Malformed(reason) => {
                    warn!(%reason, "Discarding malformed frame");
                    None
                }
            },
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            room: self.room.clone(),
            status: self.status,
            epoch: self.epoch,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

/// State shared between the manager and its transport tasks.
pub(crate) struct Shared {
    state: Mutex<SessionState>,
    store: Arc<RwLock<ConversationStore>>,
    status_tx: watch::Sender<SessionStatus>,
    events_tx: broadcast::Sender<ChatEvent>,
}

impl Shared {
    /// The single entry point for transport events. Both locks are held
    /// until the append is done, so a concurrent `connect` cannot slip
    /// between the epoch check and the store write.
    ///
    /// Lock order is store, then state. Public manager methods take only the
    /// state lock, so a caller holding a store guard never blocks them.
    pub(crate) async fn dispatch(&self, event: TransportEvent) {
        let mut store = self.store.write().await;
        let mut state = self.state.lock().await;

        if let Some((conversation_id, message)) = state.on_event(event) {
            store.append_message(conversation_id.clone(), message.clone());
            let _ = self.events_tx.send(ChatEvent::MessageAppended {
                conversation_id,
                message,
            });
        }

        self.publish_status(state.status);
    }

    pub(crate) async fn report(&self, epoch: u64, kind: TransportEventKind) {
        self.dispatch(TransportEvent::new(epoch, kind)).await;
    }

    fn publish_status(&self, status: SessionStatus) {
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }
}

// ---------------------------------------------------------------------------
// Connection Manager
// ---------------------------------------------------------------------------

/// Owns the single live chat transport and routes its frames into a
/// [`ConversationStore`].
///
/// Known limitation: there is no outbound queue. [`send`](Self::send) while
/// the transport is not connected drops the message, and nothing is replayed
/// after a reconnect. Reconnecting is also left to the caller; a failed
/// transport parks the status at [`SessionStatus::Error`].
///
/// Dropping the manager closes its transport: the task holds the shared
/// state weakly and exits once the command sender goes away.
///
/// Messages are appended only when the server relays them back as
/// `chat.message` frames. `send` never appends optimistically, so the server
/// stays the sole source of truth for ordering and timestamps.
pub struct ConnectionManager {
    config: RealtimeConfig,
    shared: Arc<Shared>,
}

impl ConnectionManager {
    pub fn new(config: RealtimeConfig) -> Self {
        Self::with_store(config, Arc::new(RwLock::new(ConversationStore::new())))
    }

    /// Build a manager that writes into an existing store.
    pub fn with_store(config: RealtimeConfig, store: Arc<RwLock<ConversationStore>>) -> Self {
        let (status_tx, _) = watch::channel(SessionStatus::Disconnected);
        let (events_tx, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            config,
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState::new()),
                store,
                status_tx,
                events_tx,
            }),
        }
    }

    /// Bind to `room`, replacing any transport bound elsewhere.
    ///
    /// A no-op while a transport for the same room and credential is already
    /// opening or open.
    pub async fn connect(&self, room: ConversationId, credential: impl Into<String>) {
        let credential = credential.into();
        let mut state = self.shared.state.lock().await;

        if state.is_bound_to(&room, &credential) {
            debug!(room = %room, "Already bound to room");
            return;
        }

        state.close_transport();
        state.epoch += 1;
        let epoch = state.epoch;
        state.room = Some(room.clone());
        state.credential = Some(credential.clone());

        let url = match transport_url(&self.config.ws_base, &room, &credential) {
            Ok(url) => url,
            Err(reason) => {
                warn!(room = %room, %reason, "Cannot build chat transport URL");
                state.status = SessionStatus::Error;
                self.shared.publish_status(state.status);
                return;
            }
        };

        info!(room = %room, epoch, "Opening chat transport");
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_transport(
            url.into(),
            epoch,
            self.config.connect_timeout,
            command_rx,
            Arc::downgrade(&self.shared),
        ));

        state.transport = Some(TransportHandle { epoch, command_tx });
        state.status = SessionStatus::Connecting;
        self.shared.publish_status(state.status);
    }

    /// Write a chat frame to the current transport.
    ///
    /// Returns `false`, after logging, when the transport is not connected;
    /// the message is lost.
    pub async fn send(&self, conversation_id: &ConversationId, sender: &str, text: &str) -> bool {
        let state = self.shared.state.lock().await;

        let transport = match (&state.transport, state.status) {
            (Some(transport), SessionStatus::Connected) => transport,
            _ => {
                warn!(
                    conversation = %conversation_id,
                    status = %state.status,
                    "Chat transport not connected, message dropped"
                );
                return false;
            }
        };

        let frame = OutboundFrame {
            conversation_id,
            sender,
            text,
        };
        let json = match serde_json::to_string(&frame) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to encode chat frame");
                return false;
            }
        };

        if transport.command_tx.send(TransportCommand::Send(json)).is_err() {
            warn!(epoch = transport.epoch, "Chat transport task gone, message dropped");
            return false;
        }
        true
    }

    /// Close the transport, if any, and forget the room.
    pub async fn disconnect(&self) {
        let mut state = self.shared.state.lock().await;
        state.close_transport();
        state.epoch += 1;
        state.room = None;
        state.credential = None;
        state.status = SessionStatus::Disconnected;
        info!(epoch = state.epoch, "Chat transport disconnected");
        self.shared.publish_status(state.status);
    }

    pub fn status(&self) -> SessionStatus {
        *self.shared.status_tx.borrow()
    }

    /// Watch status transitions.
    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.shared.status_tx.subscribe()
    }

    /// Receive every message appended from the live transport, in order.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.shared.events_tx.subscribe()
    }

    pub async fn session(&self) -> SessionSnapshot {
        self.shared.state.lock().await.snapshot()
    }

    /// The store frames are appended to. Holding a guard stalls delivery of
    /// incoming frames until it is released, but not the manager itself.
    pub fn store(&self) -> Arc<RwLock<ConversationStore>> {
        Arc::clone(&self.shared.store)
    }

    /// Copy of one conversation's log.
    pub async fn messages(&self, conversation_id: &ConversationId) -> Vec<Message> {
        self.shared.store.read().await.get(conversation_id).to_vec()
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }
}

/// `<ws_base>/ws/chat/<room>/?token=<credential>`, with both parts escaped.
pub(crate) fn transport_url(
    ws_base: &str,
    room: &ConversationId,
    credential: &str,
) -> Result<Url, String> {
    let mut url =
        Url::parse(ws_base).map_err(|e| format!("invalid transport base {ws_base}: {e}"))?;
    url.path_segments_mut()
        .map_err(|()| format!("transport base {ws_base} cannot carry a path"))?
        .pop_if_empty()
        .extend(["ws", "chat", room.as_str(), ""]);
    url.query_pairs_mut().append_pair("token", credential);
    Ok(url)
}
