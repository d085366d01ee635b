//! Target database module
//!
//! Embedded DuckDB database the migration loads into.
//!
//! # Overview
//!
//! - [`schema`] holds the table and sequence definitions
//! - [`TargetDb`] owns the connection and offers natural-key lookups and
//!   inserts; a record and its association rows commit together

mod db;
pub mod schema;

pub use db::{backup_file, TargetDb};

#[cfg(test)]
mod tests;
