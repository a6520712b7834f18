//! Static set of known servers, loaded once at startup.

use crate::config::ServerEntry;
use mcwatch_shared::{ServerAddress, ServerId};
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct ServerRegistry {
    servers: BTreeMap<ServerId, ServerAddress>,
}

impl ServerRegistry {
    /// Build from config entries. Duplicate ids keep the first address.
    pub fn from_entries(entries: &[ServerEntry]) -> Self {
        let mut servers = BTreeMap::new();
        for entry in entries {
            if servers.contains_key(&entry.id) {
                warn!("Duplicate server id '{}' in config, keeping first entry", entry.id);
                continue;
            }
            servers.insert(entry.id.clone(), entry.address.clone());
        }
        info!("Server registry loaded: {} servers", servers.len());
        Self { servers }
    }

    pub fn resolve(&self, id: &ServerId) -> Option<&ServerAddress> {
        self.servers.get(id)
    }

    pub fn contains(&self, id: &ServerId) -> bool {
        self.servers.contains_key(id)
    }

    /// Servers in id order
    pub fn iter(&self) -> impl Iterator<Item = (&ServerId, &ServerAddress)> {
        self.servers.iter()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

impl FromIterator<(ServerId, ServerAddress)> for ServerRegistry {
    fn from_iter<T: IntoIterator<Item = (ServerId, ServerAddress)>>(iter: T) -> Self {
        let entries: Vec<ServerEntry> = iter
            .into_iter()
            .map(|(id, address)| ServerEntry { id, address })
            .collect();
        Self::from_entries(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, addr: &str) -> ServerEntry {
        ServerEntry {
            id: ServerId::new(id).unwrap(),
            address: ServerAddress::parse(addr).unwrap(),
        }
    }

    #[test]
    fn test_resolve_is_case_insensitive_through_id() {
        let registry = ServerRegistry::from_entries(&[entry("Survival", "a.example:25565")]);
        let id = ServerId::new("SURVIVAL").unwrap();
        assert_eq!(registry.resolve(&id).unwrap().host(), "a.example");
    }

    #[test]
    fn test_duplicate_keeps_first() {
        let registry = ServerRegistry::from_entries(&[
            entry("lobby", "first.example"),
            entry("LOBBY", "second.example"),
        ]);
        assert_eq!(registry.len(), 1);
        let id = ServerId::new("lobby").unwrap();
        assert_eq!(registry.resolve(&id).unwrap().host(), "first.example");
    }
}
