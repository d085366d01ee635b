//! Extraction module
//!
//! Drives an [`ExportSource`] across every entity type and aggregates the
//! pages into whole-collection arrays.
//!
//! # Overview
//!
//! - Paginated entity types are fetched page by page until an empty page or
//!   `has_next=false`; single-shot types are fetched with one request.
//! - A failing entity type is recorded and skipped; the others continue.
//! - If a critical entity type (`users`, `sections`) fails, the extraction
//!   as a whole fails with [`Error::CriticalExtraction`].
//!
//! [`Error::CriticalExtraction`]: crate::Error::CriticalExtraction

mod extractor;
mod types;

pub use extractor::Extractor;
pub use types::{ExportSource, Extraction, Strategy};
