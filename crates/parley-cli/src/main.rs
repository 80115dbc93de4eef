//! parley: terminal client for the parley chat service.
//!
//! Joins a conversation over WebSocket and relays stdin lines as chat
//! messages, or lists the customers connected to a representative. REST
//! calls refresh an expired access token once before giving up.

mod app;
mod args;
mod chat;
mod roster;

use std::process::ExitCode;

use clap::Parser;
use parley_session::SessionError;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::args::{Args, Command};
use crate::chat::Target;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => parley_config::load_from_path(path),
        None => parley_config::load_config(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("parley: {e}");
            return ExitCode::from(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let app = match App::new(config, args.token, args.refresh_token) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("parley: {e}");
            return ExitCode::from(2);
        }
    };

    let result = match args.command {
        Command::Chat {
            room,
            customer,
            analytics,
        } => {
            let target = match (room, customer) {
                (Some(room), _) => Target::Room(room),
                (None, Some(customer)) => Target::Customer(customer),
                (None, None) => {
                    eprintln!("parley: chat needs --room or --customer");
                    return ExitCode::from(2);
                }
            };
            chat::run(&app, target, &args.sender, analytics).await
        }
        Command::Roster { representative } => roster::run(&app, &representative).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(SessionError::AuthExpired) => {
            eprintln!("parley: session expired, log in again");
            ExitCode::from(3)
        }
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("parley: {e}");
            ExitCode::FAILURE
        }
    }
}
