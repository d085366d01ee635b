//! CLI module
//!
//! Command-line interface for running migrations.
//!
//! # Commands
//!
//! - `migrate` (default) - Extract, snapshot, filter and load into the target
//! - `serve` - Start the import HTTP service

mod commands;
mod runner;
mod server;

pub use commands::{Cli, Commands};
pub use runner::{confirm_reset, Migration, MigrationSummary, PayloadSource, RunOutcome, Runner};
pub use server::{router, serve, AppState, ServerConfig};

#[cfg(test)]
mod tests;
