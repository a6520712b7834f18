//! Configuration management for mcwatchd.
//!
//! Loads settings from /etc/mcwatch/config.toml (or an explicit `--config`
//! path) and falls back to defaults when no file exists.

use crate::error::Result;
use crate::observed::BaselinePolicy;
use mcwatch_shared::{ServerAddress, ServerId, DEFAULT_HTTP_ADDR};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/mcwatch/config.toml";

/// Default config file path for fallback
pub const DEFAULT_CONFIG_PATH: &str = "/var/lib/mcwatch/config.toml";

/// Where tracking state lives unless configured otherwise
pub const DEFAULT_TRACKING_PATH: &str = "/var/lib/mcwatch/tracking.json";

/// Polling behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between two polls of the same server
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// What the first poll after (re)admission does
    #[serde(default)]
    pub baseline: BaselinePolicy,
}

fn default_interval() -> u64 {
    30
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            baseline: BaselinePolicy::default(),
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        // A zero interval would make tokio's interval panic
        Duration::from_secs(self.interval_secs.max(1))
    }
}

/// Server List Ping settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Upper bound for one whole status exchange
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Protocol version announced in the handshake
    #[serde(default = "default_protocol_version")]
    pub protocol_version: i32,

    /// Follow `_minecraft._tcp` SRV records for addresses without a port
    #[serde(default = "default_srv_lookup")]
    pub srv_lookup: bool,
}

fn default_timeout() -> u64 {
    5
}

fn default_protocol_version() -> i32 {
    47
}

fn default_srv_lookup() -> bool {
    true
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            protocol_version: default_protocol_version(),
            srv_lookup: default_srv_lookup(),
        }
    }
}

/// HTTP surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    DEFAULT_HTTP_ADDR.to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Tracking persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    #[serde(default = "default_tracking_path")]
    pub path: PathBuf,
}

fn default_tracking_path() -> PathBuf {
    PathBuf::from(DEFAULT_TRACKING_PATH)
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            path: default_tracking_path(),
        }
    }
}

/// Discord delivery. Without a token, events are only logged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

/// One entry of the static server registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerEntry {
    pub id: ServerId,
    pub address: ServerAddress,
}

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub tracking: TrackingConfig,

    #[serde(default)]
    pub discord: DiscordConfig,

    #[serde(default)]
    pub servers: Vec<ServerEntry>,
}

impl Config {
    /// Load config from an explicit path, or from the standard locations.
    ///
    /// A file that exists but does not parse is an error; a missing file
    /// yields defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }

        for candidate in [CONFIG_PATH, DEFAULT_CONFIG_PATH] {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        warn!("Config not found, using defaults");
        Ok(Config::default())
    }

    /// Load config from specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.monitor.interval_secs, 30);
        assert_eq!(config.monitor.baseline, BaselinePolicy::Silent);
        assert_eq!(config.provider.timeout_secs, 5);
        assert_eq!(config.http.bind, "0.0.0.0:1701");
        assert!(config.discord.token.is_none());
        assert!(config.servers.is_empty());
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
[monitor]
interval_secs = 10
baseline = "announce"

[discord]
token = "abc"

[[servers]]
id = "Survival"
address = "play.example.net"

[[servers]]
id = "creative"
address = "10.0.0.2:25570"
"#;
        let config = Config::parse(toml_str).unwrap();
        assert_eq!(config.monitor.interval_secs, 10);
        assert_eq!(config.monitor.baseline, BaselinePolicy::Announce);
        assert_eq!(config.discord.token.as_deref(), Some("abc"));
        assert_eq!(config.discord.api_base, "https://discord.com/api/v10");
        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.servers[0].id.as_str(), "survival");
        assert_eq!(config.servers[0].address.port(), 25565);
        assert_eq!(config.servers[1].address.port(), 25570);
        assert!(config.servers[0].address.wants_srv_lookup());
        assert!(!config.servers[1].address.wants_srv_lookup());
        // Defaults for missing sections
        assert_eq!(config.provider.protocol_version, 47);
        assert!(config.provider.srv_lookup);
    }

    #[test]
    fn test_invalid_server_entry_is_rejected() {
        let toml_str = r#"
[[servers]]
id = "  "
address = "host"
"#;
        assert!(Config::parse(toml_str).is_err());
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = Config::parse("[monitor]\ninterval_secs = 0\n").unwrap();
        assert_eq!(config.monitor.interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_explicit_missing_path_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(Config::load(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
