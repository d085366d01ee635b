//! Pagination module
//!
//! The source serves large collections with page-number pagination:
//! `?page=P&per_page=N`, pages starting at 1. Each response is an envelope
//! carrying the records under the entity's wire key plus `has_next`.
//!
//! # Termination
//!
//! A collection is complete when a page returns zero records or reports
//! `has_next=false`, whichever comes first.

mod types;

pub use types::{ExportPage, NextPage, PageCursor};

#[cfg(test)]
mod tests;
