//! Terminal rendering of daemon responses.

use mcwatch_shared::api::{PresenceView, ServerOverview, StatusResponse};
use owo_colors::OwoColorize;
use std::collections::BTreeMap;
use std::fmt::Write;

pub fn format_status(server: &str, status: &StatusResponse) -> String {
    match status {
        StatusResponse::Online {
            players,
            motd,
            latency_ms,
            ..
        } => {
            let mut out = format!(
                "{} {}  {}/{} players  {:.1}ms",
                "●".green(),
                server.bold(),
                players.online,
                players.max,
                latency_ms
            );
            if !motd.is_empty() {
                let _ = write!(out, "\n  {}", motd.dimmed());
            }
            for name in &players.list {
                let _ = write!(out, "\n  - {}", name);
            }
            out
        }
        StatusResponse::Offline { error, .. } => {
            format!("{} {}  offline ({})", "●".red(), server.bold(), error)
        }
    }
}

pub fn format_servers(rows: &[ServerOverview]) -> String {
    if rows.is_empty() {
        return "No servers configured".to_string();
    }

    let mut out = String::new();
    for row in rows {
        let presence = match row.presence {
            PresenceView::Online => row.presence.as_str().green().to_string(),
            PresenceView::Offline => row.presence.as_str().red().to_string(),
            PresenceView::Unobserved => row.presence.as_str().dimmed().to_string(),
        };
        let tracked = match row.tracked_channel {
            Some(channel) => format!("channel {}", channel),
            None => "untracked".to_string(),
        };
        let _ = writeln!(
            out,
            "{:<16} {:<28} {:<12} {:<20} {}",
            row.server.as_str(),
            row.address,
            presence,
            tracked,
            row.players.join(", ")
        );
    }
    out.trim_end().to_string()
}

pub fn format_tracking(entries: &BTreeMap<String, u64>) -> String {
    if entries.is_empty() {
        return "No servers are being tracked".to_string();
    }
    entries
        .iter()
        .map(|(server, channel)| format!("{:<16} channel {}", server, channel))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcwatch_shared::api::PlayersInfo;
    use mcwatch_shared::{ChannelId, ServerId};

    #[test]
    fn test_online_status_lists_players() {
        let status = StatusResponse::Online {
            online: true,
            players: PlayersInfo {
                online: 2,
                max: 20,
                list: vec!["alex".to_string(), "steve".to_string()],
            },
            motd: "Welcome".to_string(),
            latency_ms: 12.34,
        };
        let text = format_status("lobby", &status);
        assert!(text.contains("2/20 players"));
        assert!(text.contains("- alex"));
        assert!(text.contains("Welcome"));
    }

    #[test]
    fn test_offline_status_shows_error() {
        let text = format_status("lobby", &StatusResponse::offline("timed out after 5s"));
        assert!(text.contains("offline (timed out after 5s)"));
    }

    #[test]
    fn test_servers_table_marks_untracked() {
        let rows = vec![ServerOverview {
            server: ServerId::new("lobby").unwrap(),
            address: "lobby.example:25565".to_string(),
            tracked_channel: None,
            polling: false,
            presence: PresenceView::Unobserved,
            players: vec![],
        }];
        assert!(format_servers(&rows).contains("untracked"));

        let tracked = ServerOverview {
            tracked_channel: Some(ChannelId(9)),
            ..rows[0].clone()
        };
        assert!(format_servers(&[tracked]).contains("channel 9"));
    }

    #[test]
    fn test_empty_tracking() {
        assert_eq!(format_tracking(&BTreeMap::new()), "No servers are being tracked");
    }
}
