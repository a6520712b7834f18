//! Last observed state per server and the diff that turns two observations
//! into change events.

use chrono::{DateTime, Utc};
use mcwatch_shared::api::PresenceView;
use mcwatch_shared::{EventKind, ServerId, StatusSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Whether the server answered its last poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Presence {
    /// No poll has completed since the server was admitted
    #[default]
    Unobserved,
    Online,
    Offline,
}

impl From<Presence> for PresenceView {
    fn from(presence: Presence) -> Self {
        match presence {
            Presence::Unobserved => PresenceView::Unobserved,
            Presence::Online => PresenceView::Online,
            Presence::Offline => PresenceView::Offline,
        }
    }
}

/// What the first poll after admission does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaselinePolicy {
    /// Adopt the first observation without emitting anything
    #[default]
    Silent,
    /// Treat the unobserved state as offline, so an online server announces itself
    Announce,
}

/// Outcome of one poll, reduced to what the diff needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub online: bool,
    pub players: BTreeSet<String>,
}

impl Observation {
    pub fn online<I, S>(players: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            online: true,
            players: players.into_iter().map(Into::into).collect(),
        }
    }

    pub fn offline() -> Self {
        Self {
            online: false,
            players: BTreeSet::new(),
        }
    }

    /// A failed query is an offline observation; its reason does not matter here
    pub fn from_query<E>(outcome: &Result<StatusSnapshot, E>) -> Self {
        match outcome {
            Ok(snapshot) => Self {
                online: true,
                players: snapshot.players.clone(),
            },
            Err(_) => Self::offline(),
        }
    }
}

/// Last known state of one server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedState {
    pub presence: Presence,
    pub players: BTreeSet<String>,
    pub checked_at: Option<DateTime<Utc>>,
}

impl ObservedState {
    /// Replace this state with an observation, returning the events the change implies
    pub fn advance(&mut self, candidate: Observation, policy: BaselinePolicy) -> Vec<EventKind> {
        let events = diff(self, &candidate, policy);
        *self = ObservedState {
            presence: if candidate.online {
                Presence::Online
            } else {
                Presence::Offline
            },
            players: candidate.players,
            checked_at: Some(Utc::now()),
        };
        events
    }
}

/// Edge-triggered diff between the previous state and a new observation.
///
/// Leaves come before joins and each group is sorted by name, since the
/// player sets are ordered.
pub fn diff(prev: &ObservedState, candidate: &Observation, policy: BaselinePolicy) -> Vec<EventKind> {
    let prev_presence = match (prev.presence, policy) {
        (Presence::Unobserved, BaselinePolicy::Silent) => return Vec::new(),
        (Presence::Unobserved, BaselinePolicy::Announce) => Presence::Offline,
        (presence, _) => presence,
    };

    let mut events = Vec::new();
    match (prev_presence, candidate.online) {
        (Presence::Offline, true) => {
            events.push(EventKind::ServerOnline);
            events.extend(
                candidate
                    .players
                    .iter()
                    .map(|name| EventKind::PlayerJoined { name: name.clone() }),
            );
        }
        (Presence::Online, false) => events.push(EventKind::ServerOffline),
        (Presence::Online, true) => {
            events.extend(
                prev.players
                    .difference(&candidate.players)
                    .map(|name| EventKind::PlayerLeft { name: name.clone() }),
            );
            events.extend(
                candidate
                    .players
                    .difference(&prev.players)
                    .map(|name| EventKind::PlayerJoined { name: name.clone() }),
            );
        }
        _ => {}
    }
    events
}

/// Slot holding one admitted server's state
pub type StateSlot = Arc<Mutex<ObservedState>>;

/// In-memory table of observed state, one slot per admitted server.
///
/// Admission always installs a fresh slot. A poller only ever writes to the
/// slot it was handed, so a stopped poller finishing late cannot touch the
/// state of a re-admitted one.
#[derive(Default)]
pub struct ObservedStateTable {
    slots: RwLock<HashMap<ServerId, StateSlot>>,
}

impl ObservedStateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a fresh `Unobserved` slot for the server and return it
    pub async fn admit(&self, id: &ServerId) -> StateSlot {
        let slot = StateSlot::default();
        self.slots.write().await.insert(id.clone(), Arc::clone(&slot));
        slot
    }

    pub async fn discard(&self, id: &ServerId) {
        self.slots.write().await.remove(id);
    }

    /// Copy of the current state, if the server is admitted
    pub async fn get(&self, id: &ServerId) -> Option<ObservedState> {
        let slot = self.slots.read().await.get(id).cloned()?;
        let state = slot.lock().await.clone();
        Some(state)
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }
}
