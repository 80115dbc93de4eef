//! Real-time chat transport over WebSocket.
//!
//! [`ConnectionManager`] keeps exactly one transport open at a time. Every
//! transport event is tagged with the epoch of the transport that raised it
//! and runs through one transition function; events from a superseded
//! transport are dropped before they can touch the store.

mod connection;
mod handler;
mod manager;
mod types;

pub use manager::ConnectionManager;
pub use types::{ChatEvent, RealtimeConfig, SessionSnapshot, SessionStatus};
