//! Operator commands, as typed into a chat channel.
//!
//! Accepted forms (leading `!` optional, case-insensitive keywords):
//! - `track on <server>`  - notify the invoking channel about <server>
//! - `track off <server>` - stop notifying
//! - `status <server>`    - live status right now
//! - `tracking`           - list tracked servers

use crate::monitor::Monitor;
use mcwatch_shared::{ChannelId, ServerId, StatusSnapshot};
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    TrackOn(String),
    TrackOff(String),
    Status(String),
    Tracking,
    Help,
}

impl ChatCommand {
    /// Parse chat text. Returns `None` for text that is not a command.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let text = text.strip_prefix('!').unwrap_or(text);
        let words: Vec<&str> = text.split_whitespace().collect();

        let lowered: Vec<String> = words.iter().take(2).map(|w| w.to_lowercase()).collect();
        match lowered.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            ["track", "on"] if words.len() == 3 => Some(Self::TrackOn(words[2].to_string())),
            ["track", "off"] if words.len() == 3 => Some(Self::TrackOff(words[2].to_string())),
            ["track", ..] => Some(Self::Help),
            ["status", _] if words.len() == 2 => Some(Self::Status(words[1].to_string())),
            ["status"] => Some(Self::Help),
            ["tracking"] if words.len() == 1 => Some(Self::Tracking),
            _ => None,
        }
    }
}

pub const HELP_TEXT: &str =
    "Usage: `track on <server>`, `track off <server>`, `status <server>`, `tracking`";

/// Start tracking from raw user input
pub async fn track_on(monitor: &Monitor, raw_id: &str, channel: ChannelId) -> String {
    match ServerId::new(raw_id) {
        Ok(id) => monitor.track_on(&id, channel).await,
        Err(e) => e.to_string(),
    }
}

/// Stop tracking from raw user input
pub async fn track_off(monitor: &Monitor, raw_id: &str) -> String {
    match ServerId::new(raw_id) {
        Ok(id) => monitor.track_off(&id).await,
        Err(e) => e.to_string(),
    }
}

/// Run a chat command issued from `channel` and produce the reply text
pub async fn execute(monitor: &Monitor, channel: ChannelId, text: &str) -> Option<String> {
    let reply = match ChatCommand::parse(text)? {
        ChatCommand::TrackOn(server) => track_on(monitor, &server, channel).await,
        ChatCommand::TrackOff(server) => track_off(monitor, &server).await,
        ChatCommand::Status(server) => status_line(monitor, &server).await,
        ChatCommand::Tracking => tracking_summary(monitor).await,
        ChatCommand::Help => HELP_TEXT.to_string(),
    };
    Some(reply)
}

async fn status_line(monitor: &Monitor, raw_id: &str) -> String {
    let Ok(id) = ServerId::new(raw_id) else {
        return HELP_TEXT.to_string();
    };
    let Some(address) = monitor.registry().resolve(&id) else {
        return format!("Unknown server **{}**", id);
    };

    match monitor.provider().query(address).await {
        Ok(snapshot) => format_online(&id, &snapshot),
        Err(failure) => format!("**{}** is offline: {}", id, failure),
    }
}

fn format_online(id: &ServerId, snapshot: &StatusSnapshot) -> String {
    let mut line = format!(
        "**{}** is online ({}/{} players, {:.2}ms)",
        id, snapshot.players_online, snapshot.players_max, snapshot.latency_ms
    );
    if !snapshot.players.is_empty() {
        let names: Vec<&str> = snapshot.players.iter().map(String::as_str).collect();
        let _ = write!(line, ": {}", names.join(", "));
    }
    if !snapshot.motd.is_empty() {
        let _ = write!(line, "\n> {}", snapshot.motd);
    }
    line
}

async fn tracking_summary(monitor: &Monitor) -> String {
    let entries = monitor.tracking().entries().await;
    if entries.is_empty() {
        return "No servers are being tracked".to_string();
    }

    let mut out = String::from("Tracked servers:");
    for (id, channel) in entries {
        let note = if monitor.registry().contains(&id) {
            ""
        } else {
            " (not configured)"
        };
        let _ = write!(out, "\n- **{}** in channel {}{}", id, channel, note);
    }
    out
}
