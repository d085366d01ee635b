//! Authentication module
//!
//! Logs in to the source once per run and produces a [`SessionCredential`].
//!
//! The credential is an explicit value: it is handed to every transport
//! call instead of living in shared mutable state, and it is dropped when
//! the run ends.

mod session;

pub use session::{login, SessionCredential, ORIGIN_HEADER};
pub(crate) use session::truncate;
