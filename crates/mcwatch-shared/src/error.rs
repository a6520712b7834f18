//! Error types for shared value parsing.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    #[error("Server id must not be empty")]
    InvalidServerId,

    #[error("Invalid server address '{0}': {1}")]
    InvalidAddress(String, String),
}
