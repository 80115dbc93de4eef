//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "parley", about = "Terminal client for the parley chat service")]
pub struct Args {
    /// Config file (defaults to the platform config dir).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Access token from logging in.
    #[arg(long, env = "PARLEY_ACCESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Refresh token, if the server does not keep it in a cookie.
    #[arg(long, env = "PARLEY_REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: Option<String>,

    /// Sender id written on outgoing messages.
    #[arg(long, default_value = "me")]
    pub sender: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Join a conversation and chat from stdin.
    Chat {
        /// Conversation id to join.
        #[arg(long, conflicts_with = "customer", required_unless_present = "customer")]
        room: Option<String>,

        /// Customer id; the conversation is looked up (or created) on the server.
        #[arg(long)]
        customer: Option<String>,

        /// Post the log to the analytics endpoint each time one of our
        /// messages is relayed back.
        #[arg(long)]
        analytics: bool,
    },

    /// List customers connected to a representative.
    Roster {
        #[arg(long)]
        representative: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn args_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn chat_with_room() {
        let args = Args::try_parse_from(["parley", "--sender", "u1", "chat", "--room", "42"]).unwrap();
        assert_eq!(args.sender, "u1");
        match args.command {
            Command::Chat {
                room,
                customer,
                analytics,
            } => {
                assert_eq!(room.as_deref(), Some("42"));
                assert_eq!(customer, None);
                assert!(!analytics);
            }
            other => panic!("expected chat, got {other:?}"),
        }
    }

    #[test]
    fn chat_needs_exactly_one_target() {
        assert!(Args::try_parse_from(["parley", "chat"]).is_err());
        assert!(Args::try_parse_from(["parley", "chat", "--room", "42", "--customer", "c-1"]).is_err());
        assert!(Args::try_parse_from(["parley", "chat", "--customer", "c-1"]).is_ok());
    }

    #[test]
    fn roster_requires_representative() {
        assert!(Args::try_parse_from(["parley", "roster"]).is_err());
        let args = Args::try_parse_from(["parley", "roster", "--representative", "r-1"]).unwrap();
        assert!(matches!(args.command, Command::Roster { ref representative } if representative == "r-1"));
    }

    #[test]
    fn config_path_is_optional() {
        let args = Args::try_parse_from(["parley", "-c", "/tmp/p.toml", "roster", "--representative", "r"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/tmp/p.toml")));
    }
}
