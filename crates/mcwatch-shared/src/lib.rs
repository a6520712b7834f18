//! Shared types for mcwatch components.
//!
//! Both the daemon and the control CLI speak in these types, so the HTTP
//! payloads and the persisted tracking file stay in one place.

pub mod api;
pub mod error;
pub mod event;
pub mod server;
pub mod status;

pub use error::SharedError;
pub use event::{EventKind, NotificationEvent};
pub use server::{ChannelId, ServerAddress, ServerId, DEFAULT_GAME_PORT};
pub use status::StatusSnapshot;

/// Crate version, reported by the daemon and the CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Address the daemon's HTTP surface binds to unless configured otherwise
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:1701";

/// Base URL the CLI uses to reach a local daemon
pub const DEFAULT_DAEMON_URL: &str = "http://127.0.0.1:1701";
