//! Interactive chat on one conversation.

use parley_session::{
    Analytics, ChatEvent, ConnectionManager, ConversationId, Message, SessionError,
    SessionProvider, SessionStatus,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::app::App;

/// Which conversation to join.
pub enum Target {
    Room(String),
    Customer(String),
}

enum Input {
    Send(String),
    Analyze,
    Reconnect,
    Quit,
    Empty,
}

fn parse_input(line: &str) -> Input {
    match line.trim() {
        "" => Input::Empty,
        "/quit" => Input::Quit,
        "/analyze" => Input::Analyze,
        "/reconnect" => Input::Reconnect,
        text => Input::Send(text.to_string()),
    }
}

pub async fn run(
    app: &App,
    target: Target,
    sender: &str,
    auto_analyze: bool,
) -> Result<(), SessionError> {
    let room = match target {
        Target::Room(id) => ConversationId::from(id),
        Target::Customer(customer) => app.api.conversation_id(&customer).await?,
    };

    let manager = app.connection_manager();
    let mut events = manager.subscribe();
    let mut status = manager.subscribe_status();
    connect(app, &manager, &room).await?;
    manager
        .store()
        .write()
        .await
        .set_active_conversation(room.clone());

    println!("joined conversation {room} (/analyze, /reconnect, /quit)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let outcome = loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => match parse_input(&line) {
                    Input::Empty => {}
                    Input::Quit => break Ok(()),
                    Input::Send(text) => {
                        if !manager.send(&room, sender, &text).await {
                            eprintln!("-- not connected ({}), message dropped", manager.status());
                        }
                    }
                    Input::Analyze => {
                        if let Err(e) = analyze(app, &manager).await {
                            break Err(e);
                        }
                    }
                    Input::Reconnect => {
                        if let Err(e) = connect(app, &manager, &room).await {
                            break Err(e);
                        }
                    }
                },
                Ok(None) => break Ok(()),
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin");
                    break Ok(());
                }
            },
            event = events.recv() => match event {
                Ok(ChatEvent::MessageAppended { conversation_id, message }) => {
                    if conversation_id == room {
                        print_message(&message);
                        if auto_analyze && message.sender == sender {
                            if let Err(e) = analyze(app, &manager).await {
                                break Err(e);
                            }
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Display fell behind"),
                Err(RecvError::Closed) => break Ok(()),
            },
            changed = status.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let current = *status.borrow_and_update();
                eprintln!("-- {current}");
                if current == SessionStatus::Error {
                    eprintln!("-- connection lost; /reconnect to try again");
                }
            }
        }
    };

    manager.disconnect().await;
    if matches!(outcome, Err(SessionError::AuthExpired)) {
        manager.store().write().await.clear();
    }
    outcome
}

/// Post the active conversation's log to the analytics endpoint. Only an
/// expired session is returned as an error.
async fn analyze(app: &App, manager: &ConnectionManager) -> Result<(), SessionError> {
    let log = manager.store().read().await.active_messages().to_vec();
    match app.api.analyze(&log).await {
        Ok(analytics) => print_analytics(&analytics),
        Err(SessionError::AuthExpired) => return Err(SessionError::AuthExpired),
        Err(e) => eprintln!("-- analytics failed: {e}"),
    }
    Ok(())
}

/// (Re)bind the manager with the provider's current credential.
async fn connect(
    app: &App,
    manager: &ConnectionManager,
    room: &ConversationId,
) -> Result<(), SessionError> {
    let credential = app
        .session
        .access_token()
        .await
        .ok_or(SessionError::AuthExpired)?;
    manager.connect(room.clone(), credential).await;
    Ok(())
}

fn print_message(message: &Message) {
    match &message.timestamp {
        Some(ts) => println!("[{ts}] {}: {}", message.sender, message.text),
        None => println!("{}: {}", message.sender, message.text),
    }
}

fn print_analytics(analytics: &Analytics) {
    println!("summary:   {}", analytics.summary);
    println!("sentiment: {}", analytics.sentiment);
    println!("loan type: {}", analytics.loan_type);
    println!("lead:      {} ({})", analytics.lead_type, analytics.rationale);
}
