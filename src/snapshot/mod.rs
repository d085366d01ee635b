//! Snapshot module
//!
//! Persists an extracted payload as a JSON document and reads it back when
//! the live source is unavailable.
//!
//! # Overview
//!
//! - `SnapshotStore::save` copies any existing snapshot to a timestamped
//!   backup, then writes the new document atomically (temp file + rename).
//! - `SnapshotStore::load` distinguishes a missing snapshot from an invalid one.

mod store;

pub use store::{SnapshotStore, BACKUP_TIMESTAMP_FORMAT};
