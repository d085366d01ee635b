//! Error types for dataport
//!
//! This module defines the error hierarchy for the whole migration engine.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Record-level problems during loading are not represented here: they are
//! recovered per record and tallied (see [`crate::load::RecordLoadError`]).

use thiserror::Error;

/// The main error type for dataport
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    // ============================================================================
    // Transport Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Timeout or gateway timeout; retried up to the attempt limit
    #[error("Transient transport failure: {message}")]
    TransientTransport { message: String },

    /// Any other non-2xx status or a malformed body; never retried
    #[error("{message}")]
    TerminalTransport { status: Option<u16>, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Extraction Errors
    // ============================================================================
    #[error("Extraction of '{entity}' failed: {message}")]
    EntityExtraction { entity: String, message: String },

    #[error("Critical endpoints failed: {}", entities.join(", "))]
    CriticalExtraction { entities: Vec<String> },

    #[error("Run failed: {message}")]
    RunFailure { message: String },

    // ============================================================================
    // Snapshot Errors
    // ============================================================================
    #[error("Snapshot not found: {path}")]
    SnapshotNotFound { path: String },

    #[error("Snapshot '{path}' is invalid: {message}")]
    SnapshotInvalid { path: String, message: String },

    // ============================================================================
    // Target Database Errors
    // ============================================================================
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a transient transport error
    pub fn transient(message: impl Into<String>) -> Self {
        Self::TransientTransport {
            message: message.into(),
        }
    }

    /// Create a terminal transport error
    pub fn terminal(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::TerminalTransport {
            status,
            message: message.into(),
        }
    }

    /// Create an entity extraction error
    pub fn extraction(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EntityExtraction {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Create a run failure
    pub fn run_failure(message: impl Into<String>) -> Self {
        Self::RunFailure {
            message: message.into(),
        }
    }

    /// Create a snapshot-invalid error
    pub fn snapshot_invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SnapshotInvalid {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Check if this error may succeed when the same request is repeated
    pub fn is_transient(&self) -> bool {
        match self {
            Error::TransientTransport { .. } => true,
            Error::Http(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Whether the runner may recover from this error by loading the snapshot
    pub fn is_recoverable_by_snapshot(&self) -> bool {
        matches!(
            self,
            Error::Auth { .. }
                | Error::Http(_)
                | Error::TransientTransport { .. }
                | Error::TerminalTransport { .. }
                | Error::EntityExtraction { .. }
                | Error::CriticalExtraction { .. }
        )
    }
}

/// Check if an HTTP status code is transient for the export protocol
pub(crate) fn is_transient_status(status: u16) -> bool {
    status == 504
}

/// Result type alias for dataport
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::missing_field("source.base_url");
        assert_eq!(
            err.to_string(),
            "Missing required config field: source.base_url"
        );

        let err = Error::terminal(Some(404), "HTTP 404: Not found");
        assert_eq!(err.to_string(), "HTTP 404: Not found");

        let err = Error::CriticalExtraction {
            entities: vec!["users".to_string(), "sections".to_string()],
        };
        assert_eq!(err.to_string(), "Critical endpoints failed: users, sections");
    }

    #[test]
    fn test_is_transient() {
        assert!(Error::transient("HTTP 504").is_transient());
        assert!(!Error::terminal(Some(500), "HTTP 500").is_transient());
        assert!(!Error::terminal(None, "malformed body").is_transient());
        assert!(!Error::config("test").is_transient());
    }

    #[test]
    fn test_transient_status() {
        assert!(is_transient_status(504));
        assert!(!is_transient_status(500));
        assert!(!is_transient_status(429));
        assert!(!is_transient_status(404));
    }

    #[test]
    fn test_snapshot_recovery_classification() {
        assert!(Error::auth("bad password").is_recoverable_by_snapshot());
        assert!(Error::CriticalExtraction {
            entities: vec!["users".to_string()]
        }
        .is_recoverable_by_snapshot());
        assert!(!Error::run_failure("no snapshot").is_recoverable_by_snapshot());
        assert!(!Error::SnapshotNotFound {
            path: "x".to_string()
        }
        .is_recoverable_by_snapshot());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
