//! One WebSocket transport, run as a background task.
//!
//! The task only reports typed, epoch-tagged events back to the manager; it
//! never touches the conversation store itself. It holds the manager weakly,
//! so dropping the manager drops the command sender and ends the task.

use std::sync::Weak;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

use super::manager::Shared;
use super::types::{TransportCommand, TransportEventKind};

/// Hand one event to the manager. False once the manager is gone.
async fn report(shared: &Weak<Shared>, epoch: u64, kind: TransportEventKind) -> bool {
    match shared.upgrade() {
        Some(shared) => {
            shared.report(epoch, kind).await;
            true
        }
        None => false,
    }
}

/// Open `url`, then pump commands out and frames in until either side closes.
///
/// A `Close` (or a dropped sender) that arrives mid-handshake abandons the
/// upgrade, so a superseded transport never reaches the open state.
pub(crate) async fn run_transport(
    url: String,
    epoch: u64,
    connect_timeout: Duration,
    mut command_rx: mpsc::UnboundedReceiver<TransportCommand>,
    shared: Weak<Shared>,
) {
    let handshake = tokio::time::timeout(
        connect_timeout,
        tokio_tungstenite::connect_async(url.as_str()),
    );
    tokio::pin!(handshake);

    let result = loop {
        tokio::select! {
            result = &mut handshake => break result,
            command = command_rx.recv() => match command {
                Some(TransportCommand::Close) | None => {
                    debug!(epoch, "Chat transport superseded during handshake");
                    return;
                }
                // The manager only sends once connected.
                Some(TransportCommand::Send(_)) => {}
            },
        }
    };

    let ws_stream = match result {
        Ok(Ok((ws_stream, _))) => ws_stream,
        Ok(Err(e)) => {
            warn!(epoch, error = %e, "Chat transport failed to connect");
            let reason = format!("connection failed: {e}");
            report(&shared, epoch, TransportEventKind::ErrorRaised(reason)).await;
            return;
        }
        Err(_elapsed) => {
            warn!(epoch, "Chat transport handshake timed out");
            let reason = format!("connection timed out after {}s", connect_timeout.as_secs());
            report(&shared, epoch, TransportEventKind::ErrorRaised(reason)).await;
            return;
        }
    };

    if !report(&shared, epoch, TransportEventKind::Opened).await {
        return;
    }

    let (mut ws_write, mut ws_read) = ws_stream.split();

    loop {
        tokio::select! {
            command = command_rx.recv() => match command {
                Some(TransportCommand::Send(json)) => {
                    if let Err(e) = ws_write.send(WsMessage::Text(json.into())).await {
                        warn!(epoch, error = %e, "Chat transport write failed");
                        let reason = format!("write failed: {e}");
                        report(&shared, epoch, TransportEventKind::ErrorRaised(reason)).await;
                        return;
                    }
                }
                // Dropped sender means the manager let go of this transport.
                Some(TransportCommand::Close) | None => {
                    let _ = ws_write.send(WsMessage::Close(None)).await;
                    break;
                }
            },
            frame = ws_read.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    let text = text.as_str().to_owned();
                    if !report(&shared, epoch, TransportEventKind::FrameReceived(text)).await {
                        let _ = ws_write.send(WsMessage::Close(None)).await;
                        return;
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    info!(epoch, "Server closed chat transport");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(epoch, error = %e, "Chat transport error");
                    report(&shared, epoch, TransportEventKind::ErrorRaised(e.to_string())).await;
                    return;
                }
            },
        }
    }

    report(&shared, epoch, TransportEventKind::Closed).await;
}
