//! mcwatch daemon library - exposes modules for testing.

pub mod commands;
pub mod config;
pub mod error;
pub mod monitor;
pub mod observed;
pub mod provider;
pub mod registry;
pub mod routes;
pub mod server;
pub mod sink;
pub mod tracking;
