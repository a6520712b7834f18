//! Server identity and addressing.

use crate::error::SharedError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Port used when an address omits one
pub const DEFAULT_GAME_PORT: u16 = 25565;

/// Case-normalized server key. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServerId(String);

impl ServerId {
    pub fn new(raw: &str) -> Result<Self, SharedError> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(SharedError::InvalidServerId);
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ServerId {
    type Error = SharedError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<ServerId> for String {
    fn from(id: ServerId) -> Self {
        id.0
    }
}

impl FromStr for ServerId {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Chat channel that receives notifications for a server
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChannelId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(ChannelId)
    }
}

/// Network location of a game server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServerAddress {
    host: String,
    port: u16,
    /// Port was left out, so an SRV record may redirect the connection
    implicit_port: bool,
}

impl ServerAddress {
    pub fn new(host: &str, port: u16) -> Result<Self, SharedError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(SharedError::InvalidAddress(
                host.to_string(),
                "missing host".to_string(),
            ));
        }
        if port == 0 {
            return Err(SharedError::InvalidAddress(
                format!("{}:{}", host, port),
                "port must be between 1 and 65535".to_string(),
            ));
        }
        Ok(Self {
            host: host.to_string(),
            port,
            implicit_port: false,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether the connection target should come from a `_minecraft._tcp`
    /// SRV record: the port was not given and the host is a name, not an IP.
    pub fn wants_srv_lookup(&self) -> bool {
        self.implicit_port && self.host.parse::<IpAddr>().is_err()
    }

    /// Parse `host`, `host:port` or `[v6]:port`
    pub fn parse(raw: &str) -> Result<Self, SharedError> {
        let raw = raw.trim();
        let invalid = |why: &str| SharedError::InvalidAddress(raw.to_string(), why.to_string());

        let (host, port) = if let Some(rest) = raw.strip_prefix('[') {
            let end = rest.find(']').ok_or_else(|| invalid("unterminated '['"))?;
            let host = &rest[..end];
            match rest[end + 1..].strip_prefix(':') {
                Some(port) => (host, Some(port)),
                None if rest[end + 1..].is_empty() => (host, None),
                None => return Err(invalid("unexpected text after ']'")),
            }
        } else if raw.matches(':').count() == 1 {
            let (host, port) = raw.split_once(':').ok_or_else(|| invalid("bad separator"))?;
            (host, Some(port))
        } else {
            (raw, None)
        };

        let implicit_port = port.is_none();
        let port = match port {
            Some(p) => p
                .parse::<u16>()
                .map_err(|_| invalid("port must be between 1 and 65535"))?,
            None => DEFAULT_GAME_PORT,
        };

        let mut address = Self::new(host, port).map_err(|e| match e {
            SharedError::InvalidAddress(_, why) => invalid(&why),
            other => other,
        })?;
        address.implicit_port = implicit_port;
        Ok(address)
    }
}

impl TryFrom<String> for ServerAddress {
    type Error = SharedError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ServerAddress> for String {
    fn from(addr: ServerAddress) -> Self {
        addr.to_string()
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.implicit_port {
            if self.host.contains(':') {
                write!(f, "[{}]", self.host)
            } else {
                write!(f, "{}", self.host)
            }
        } else if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_id_normalizes_case_and_whitespace() {
        let id = ServerId::new("  Survival ").unwrap();
        assert_eq!(id.as_str(), "survival");
        assert_eq!(id, ServerId::new("SURVIVAL").unwrap());
    }

    #[test]
    fn test_server_id_rejects_blank() {
        assert_eq!(ServerId::new("   "), Err(SharedError::InvalidServerId));
        assert!(serde_json::from_str::<ServerId>("\"\"").is_err());
    }

    #[test]
    fn test_address_defaults_port() {
        let addr = ServerAddress::parse("play.example.net").unwrap();
        assert_eq!(addr.host(), "play.example.net");
        assert_eq!(addr.port(), DEFAULT_GAME_PORT);
    }

    #[test]
    fn test_srv_lookup_only_for_names_without_port() {
        assert!(ServerAddress::parse("play.example.net").unwrap().wants_srv_lookup());
        assert!(!ServerAddress::parse("play.example.net:25565").unwrap().wants_srv_lookup());
        assert!(!ServerAddress::parse("10.0.0.5").unwrap().wants_srv_lookup());
        assert!(!ServerAddress::parse("[::1]").unwrap().wants_srv_lookup());
        assert!(!ServerAddress::new("play.example.net", 25565).unwrap().wants_srv_lookup());

        // The omitted port survives a trip through the config string form
        let addr = ServerAddress::parse("play.example.net").unwrap();
        assert_eq!(addr.to_string(), "play.example.net");
        assert!(ServerAddress::parse(&addr.to_string()).unwrap().wants_srv_lookup());
    }

    #[test]
    fn test_address_with_port_and_v6() {
        let addr = ServerAddress::parse("10.0.0.5:25570").unwrap();
        assert_eq!(addr.port(), 25570);

        let v6 = ServerAddress::parse("[::1]:25566").unwrap();
        assert_eq!(v6.host(), "::1");
        assert_eq!(v6.to_string(), "[::1]:25566");
    }

    #[test]
    fn test_address_rejects_port_zero_and_garbage() {
        assert!(ServerAddress::parse("host:0").is_err());
        assert!(ServerAddress::parse("host:70000").is_err());
        assert!(ServerAddress::parse(":25565").is_err());
    }

    #[test]
    fn test_channel_id_is_plain_integer_in_json() {
        let json = serde_json::to_string(&ChannelId(123456789012345678)).unwrap();
        assert_eq!(json, "123456789012345678");
    }
}
