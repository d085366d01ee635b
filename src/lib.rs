// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # dataport
//!
//! Moves a whole dataset from a source instance's export API into a fresh
//! embedded target database.
//!
//! ## Features
//!
//! - **Session login**: one login per run, explicit credential value
//! - **Paginated extraction**: page-number pagination with per-page retries
//! - **Snapshots**: the payload is saved locally and used as a fallback
//! - **Default-data filter**: seed identities are never imported twice
//! - **Ordered loading**: ten idempotent stages in dependency order
//! - **Import service**: the same stages behind HTTP endpoints
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dataport::cli::{Migration, RunOutcome};
//! use dataport::config::DataportConfig;
//!
//! #[tokio::main]
//! async fn main() -> dataport::Result<()> {
//!     let config = DataportConfig::load(None)?;
//!     let stdin = std::io::stdin();
//!     let outcome = Migration::new(config)
//!         .run(&mut stdin.lock(), &mut std::io::stdout())
//!         .await?;
//!     if let RunOutcome::Completed(summary) = outcome {
//!         println!("{} records created", summary.report.totals().created);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐
//! │   Auth   │ → │  Extract  │ → │ Snapshot │ → │  Filter  │ → │   Load   │
//! ├──────────┤   ├───────────┤   ├──────────┤   ├──────────┤   ├──────────┤
//! │ Session  │   │ Paginate  │   │ Backup   │   │ Seeds    │   │ Stages   │
//! │ Origin   │   │ Retry     │   │ Fallback │   │ Authors  │   │ Remap    │
//! └──────────┘   └───────────┘   └──────────┘   └──────────┘   └──────────┘
//!                                                                   │
//!                                                              ┌────┴─────┐
//!                                                              │  Target  │
//!                                                              │ (DuckDB) │
//!                                                              └──────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Entity catalogue, records and payload
pub mod types;

/// YAML + environment configuration
pub mod config;

/// Session login
pub mod auth;

/// HTTP transport with retries
pub mod http;

/// Page-number pagination
pub mod pagination;

/// Whole-dataset extraction
pub mod extract;

/// Local payload snapshots
pub mod snapshot;

/// Typed record normalization
pub mod model;

/// Default-data filter
pub mod filter;

/// Target database (DuckDB)
pub mod target;

/// Dependency-ordered load stages
pub mod load;

/// Command-line interface and import service
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use config::DataportConfig;
pub use extract::Extractor;
pub use load::{LoadPipeline, LoadReport};
pub use snapshot::SnapshotStore;
pub use target::TargetDb;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
