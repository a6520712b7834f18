//! mcwatchctl library - CLI parsing, daemon client and output formatting.

pub mod cli;
pub mod client;
pub mod output;
