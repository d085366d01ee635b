//! Load pipeline module
//!
//! Writes payload collections into the target database.
//!
//! # Overview
//!
//! - [`reinitialize`] drops and recreates the target schema and provisions
//!   the seed records
//! - [`LoadPipeline`] runs the ten stages in dependency order; every record
//!   is created, skipped, or failed independently of the others
//! - Replies are attached to their parents through an old → new post id
//!   remap built while the posts stage runs

mod pipeline;
mod types;

pub use pipeline::{reinitialize, LoadPipeline};
pub use types::{LoadReport, Outcome, RecordLoadError, SkipReason, StageReport, StageTally};
