//! HTTP transport module
//!
//! Provides the transport client used to talk to the source's export API.
//!
//! # Features
//!
//! - **Session login**: one login per run, credential passed to every call
//! - **Fixed-delay retries**: timeouts and 504s are retried per page
//! - **Error classification**: transient vs terminal failures
//! - **Envelope decoding**: export responses decoded into [`ExportPage`]
//!
//! [`ExportPage`]: crate::pagination::ExportPage

mod client;

pub use client::{TransportClient, TransportClientConfig};

#[cfg(test)]
mod tests;
