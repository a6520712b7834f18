//! Change notifications emitted by the monitor.

use crate::server::ServerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    ServerOnline,
    ServerOffline,
    PlayerJoined { name: String },
    PlayerLeft { name: String },
}

/// A single state transition for one server. Ephemeral, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub server: ServerId,
    pub at: DateTime<Utc>,
    pub kind: EventKind,
}

impl NotificationEvent {
    pub fn new(server: ServerId, kind: EventKind) -> Self {
        Self {
            server,
            at: Utc::now(),
            kind,
        }
    }
}
