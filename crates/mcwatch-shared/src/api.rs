//! HTTP payloads exchanged between mcwatchd and its clients.

use crate::server::{ChannelId, ServerId};
use crate::status::StatusSnapshot;
use serde::{Deserialize, Serialize};

/// Player section of the live status response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayersInfo {
    pub online: u32,
    pub max: u32,
    pub list: Vec<String>,
}

/// Live status of one server as served on `/status/:server`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusResponse {
    Online {
        online: bool,
        players: PlayersInfo,
        motd: String,
        latency_ms: f64,
    },
    Offline {
        online: bool,
        error: String,
    },
}

impl StatusResponse {
    pub fn from_snapshot(snapshot: &StatusSnapshot) -> Self {
        StatusResponse::Online {
            online: true,
            players: PlayersInfo {
                online: snapshot.players_online,
                max: snapshot.players_max,
                list: snapshot.players.iter().cloned().collect(),
            },
            motd: snapshot.motd.clone(),
            latency_ms: (snapshot.latency_ms * 100.0).round() / 100.0,
        }
    }

    pub fn offline(error: impl Into<String>) -> Self {
        StatusResponse::Offline {
            online: false,
            error: error.into(),
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, StatusResponse::Online { .. })
    }
}

/// Body of `POST /v1/tracking`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackRequest {
    pub server: String,
    pub channel: ChannelId,
}

/// Body of `POST /v1/command`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    pub channel: ChannelId,
    pub text: String,
}

/// Human-readable acknowledgment of a command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub message: String,
}

/// Last observed presence of a server, as reported over HTTP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceView {
    Unobserved,
    Online,
    Offline,
}

impl PresenceView {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unobserved => "unobserved",
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

/// One row of `GET /v1/servers`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerOverview {
    pub server: ServerId,
    pub address: String,
    pub tracked_channel: Option<ChannelId>,
    pub polling: bool,
    pub presence: PresenceView,
    pub players: Vec<String>,
}
