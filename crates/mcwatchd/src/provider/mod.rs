//! Status providers - where snapshots come from.
//!
//! An offline server is ordinary data here: every way a query can go wrong
//! collapses into a [`QueryFailure`] value and the caller decides what it
//! means. Providers never retry.

mod slp;
mod srv;

pub use slp::SlpProvider;
pub use srv::SrvResolver;

use async_trait::async_trait;
use mcwatch_shared::{ServerAddress, StatusSnapshot};
use thiserror::Error;

/// Why a status query produced no snapshot
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct QueryFailure {
    pub message: String,
}

impl QueryFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type QueryResult = Result<StatusSnapshot, QueryFailure>;

#[async_trait]
pub trait StatusProvider: Send + Sync {
    async fn query(&self, address: &ServerAddress) -> QueryResult;
}
