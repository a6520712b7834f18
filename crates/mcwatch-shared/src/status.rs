//! Point-in-time status of a game server.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Result of one successful status query. Produced fresh per query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub online: bool,
    /// Names from the player sample; servers may report fewer names than `players_online`
    pub players: BTreeSet<String>,
    pub players_online: u32,
    pub players_max: u32,
    pub latency_ms: f64,
    pub motd: String,
    pub version: String,
    /// PNG bytes of the server icon, when advertised
    #[serde(skip)]
    pub icon: Option<Vec<u8>>,
}

impl StatusSnapshot {
    /// Online snapshot with the given player names and nothing else
    pub fn with_players<I, S>(players: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let players: BTreeSet<String> = players.into_iter().map(Into::into).collect();
        Self {
            online: true,
            players_online: players.len() as u32,
            players,
            ..Self::default()
        }
    }
}
