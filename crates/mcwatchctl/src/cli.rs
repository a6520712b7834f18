//! CLI - Command-line argument parsing
//!
//! Defines the CLI structure using clap.
//! Keeps argument parsing separate from execution logic.

use clap::{Parser, Subcommand};
use mcwatch_shared::{ChannelId, DEFAULT_DAEMON_URL};

/// mcwatch control CLI
#[derive(Parser)]
#[command(name = "mcwatchctl")]
#[command(about = "Query and control a running mcwatchd", long_about = None)]
#[command(version)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Base URL of the daemon's HTTP API
    #[arg(long, global = true, default_value = DEFAULT_DAEMON_URL)]
    pub url: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Live status of one server
    Status {
        server: String,

        /// Output JSON only
        #[arg(long)]
        json: bool,
    },

    /// List configured servers with their last observed state
    Servers {
        /// Output JSON only
        #[arg(long)]
        json: bool,
    },

    /// Manage notification tracking
    Track {
        #[command(subcommand)]
        action: TrackCommands,
    },
}

/// Track subcommands
#[derive(Subcommand)]
pub enum TrackCommands {
    /// Send change notifications for a server to a channel
    On {
        server: String,

        /// Channel id that receives notifications
        #[arg(long)]
        channel: ChannelId,
    },

    /// Stop notifications for a server
    Off { server: String },

    /// Show tracked servers
    List,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_track_on() {
        let cli = Cli::try_parse_from(["mcwatchctl", "track", "on", "lobby", "--channel", "42"]).unwrap();
        assert_eq!(cli.url, DEFAULT_DAEMON_URL);
        match cli.command {
            Commands::Track {
                action: TrackCommands::On { server, channel },
            } => {
                assert_eq!(server, "lobby");
                assert_eq!(channel, ChannelId(42));
            }
            _ => panic!("Expected track on"),
        }
    }

    #[test]
    fn test_track_on_requires_channel() {
        assert!(Cli::try_parse_from(["mcwatchctl", "track", "on", "lobby"]).is_err());
    }

    #[test]
    fn test_global_url_override() {
        let cli = Cli::try_parse_from(["mcwatchctl", "status", "lobby", "--url", "http://10.0.0.2:1701"])
            .unwrap();
        assert_eq!(cli.url, "http://10.0.0.2:1701");
    }
}
