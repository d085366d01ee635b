//! Migration configuration
//!
//! Configuration is read from an optional YAML file (`dataport.yaml` by
//! default) and then overridden by environment variables, so a migration can
//! run with no command-line flags at all.
//!
//! ```yaml
//! source:
//!   base_url: https://source.example.com
//!   uid: admin
//! transport:
//!   page_size: 50
//!   max_attempts: 3
//! snapshot:
//!   path: instance/data.json
//! target:
//!   database: instance/dataport.duckdb
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "dataport.yaml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete migration configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataportConfig {
    /// Remote source system
    #[serde(default)]
    pub source: SourceConfig,

    /// Transport tuning (page size, timeouts, retries)
    #[serde(default)]
    pub transport: TransportConfig,

    /// Local snapshot file
    #[serde(default)]
    pub snapshot: SnapshotConfig,

    /// Local target database
    #[serde(default)]
    pub target: TargetConfig,

    /// Seed records recreated by provisioning and removed by the filter
    #[serde(default)]
    pub seeds: SeedConfig,

    /// Import service settings
    #[serde(default)]
    pub server: ServerSettings,
}

impl DataportConfig {
    /// Load configuration from a file (or the default file if present),
    /// then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply `DATAPORT_*` overrides using the given variable lookup
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("DATAPORT_SOURCE_URL") {
            self.source.base_url = url;
        }
        if let Some(uid) = lookup("DATAPORT_ADMIN_UID") {
            self.source.uid = Some(uid);
        }
        if let Some(password) = lookup("DATAPORT_ADMIN_PASSWORD") {
            self.source.password = Some(password);
        }
        if let Some(token) = lookup("DATAPORT_ADMIN_TOKEN") {
            self.server.admin_token = Some(token);
        }
        if let Some(db) = lookup("DATAPORT_TARGET_DB") {
            self.target.database = PathBuf::from(db);
        }
        if let Some(snapshot) = lookup("DATAPORT_SNAPSHOT") {
            self.snapshot.path = PathBuf::from(snapshot);
        }
    }

    /// Validate values that would otherwise fail deep inside a run
    pub fn validate(&self) -> Result<()> {
        if self.transport.page_size == 0 {
            return Err(Error::InvalidConfigValue {
                field: "transport.page_size".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.transport.max_attempts == 0 {
            return Err(Error::InvalidConfigValue {
                field: "transport.max_attempts".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if !self.source.base_url.is_empty() {
            url::Url::parse(&self.source.base_url)?;
        }
        Ok(())
    }
}

// ============================================================================
// Source
// ============================================================================

/// Remote source system and its administrator credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the source server
    #[serde(default)]
    pub base_url: String,

    /// Login endpoint path
    #[serde(default = "default_auth_path")]
    pub auth_path: String,

    /// Prefix of the per-entity export endpoints
    #[serde(default = "default_export_path")]
    pub export_path: String,

    /// Administrator uid (export requires elevated privilege)
    #[serde(default)]
    pub uid: Option<String>,

    /// Administrator password
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            auth_path: default_auth_path(),
            export_path: default_export_path(),
            uid: None,
            password: None,
        }
    }
}

impl SourceConfig {
    /// Administrator credentials, failing when either half is missing
    pub fn credentials(&self) -> Result<(String, String)> {
        let uid = self
            .uid
            .clone()
            .ok_or_else(|| Error::missing_field("source.uid"))?;
        let password = self
            .password
            .clone()
            .ok_or_else(|| Error::missing_field("source.password"))?;
        Ok((uid, password))
    }
}

fn default_auth_path() -> String {
    "/api/authenticate".to_string()
}

fn default_export_path() -> String {
    "/api/export".to_string()
}

// ============================================================================
// Transport
// ============================================================================

/// Page size, timeouts and the fixed-delay retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Records per page for paginated entity types
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Timeout for one paginated request, in seconds
    #[serde(default = "default_page_timeout")]
    pub page_timeout_secs: u64,

    /// Timeout for one single-shot collection request, in seconds
    #[serde(default = "default_collection_timeout")]
    pub collection_timeout_secs: u64,

    /// Attempts per page for transient failures
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts, in milliseconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            page_timeout_secs: default_page_timeout(),
            collection_timeout_secs: default_collection_timeout(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

impl TransportConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn collection_timeout(&self) -> Duration {
        Duration::from_secs(self.collection_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn default_page_size() -> u32 {
    50
}

fn default_page_timeout() -> u64 {
    180
}

fn default_collection_timeout() -> u64 {
    120
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    2000
}

// ============================================================================
// Snapshot / Target
// ============================================================================

/// Location of the JSON snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    #[serde(default = "default_snapshot_path")]
    pub path: PathBuf,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: default_snapshot_path(),
        }
    }
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("instance/data.json")
}

/// Target DuckDB database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Database file
    #[serde(default = "default_target_db")]
    pub database: PathBuf,

    /// Copy the existing database file aside before it is reset
    #[serde(default = "default_true")]
    pub backup: bool,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            database: default_target_db(),
            backup: true,
        }
    }
}

fn default_target_db() -> PathBuf {
    PathBuf::from("instance/dataport.duckdb")
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Seeds
// ============================================================================

/// A user recreated by provisioning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedUser {
    pub uid: String,
    pub name: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "User".to_string()
}

/// A section recreated by provisioning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedSection {
    pub abbreviation: String,
    pub name: String,
}

/// A topic recreated by provisioning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedTopic {
    pub page_path: String,
    pub display_name: String,
}

/// Bootstrap records with fixed identities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedConfig {
    #[serde(default = "default_seed_users")]
    pub users: Vec<SeedUser>,
    #[serde(default = "default_seed_sections")]
    pub sections: Vec<SeedSection>,
    #[serde(default = "default_seed_topics")]
    pub topics: Vec<SeedTopic>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            users: default_seed_users(),
            sections: default_seed_sections(),
            topics: default_seed_topics(),
        }
    }
}

fn seed_user(uid: &str, name: &str, role: &str) -> SeedUser {
    SeedUser {
        uid: uid.to_string(),
        name: name.to_string(),
        role: role.to_string(),
    }
}

fn default_seed_users() -> Vec<SeedUser> {
    vec![
        seed_user("admin", "Administrator", "Admin"),
        seed_user("user", "Default User", "User"),
        seed_user("niko", "Nikola Tesla", "User"),
    ]
}

fn default_seed_sections() -> Vec<SeedSection> {
    [
        ("CSA", "Computer Science A"),
        ("CSP", "Computer Science Principles"),
        ("Robotics", "Engineering Robotics"),
        ("CSSE", "Computer Science and Software Engineering"),
    ]
    .into_iter()
    .map(|(abbreviation, name)| SeedSection {
        abbreviation: abbreviation.to_string(),
        name: name.to_string(),
    })
    .collect()
}

fn default_seed_topics() -> Vec<SeedTopic> {
    [
        ("/lessons/flask-introduction", "Flask Introduction"),
        ("/hacks/javascript-basics", "JavaScript Basics"),
        ("/projects/portfolio-showcase", "Portfolio Showcase"),
        ("/general/daily-standup", "Daily Standup"),
        ("/resources/study-materials", "Study Materials"),
    ]
    .into_iter()
    .map(|(page_path, display_name)| SeedTopic {
        page_path: page_path.to_string(),
        display_name: display_name.to_string(),
    })
    .collect()
}

// ============================================================================
// Server
// ============================================================================

/// Import service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token required on import requests; open when unset
    #[serde(default)]
    pub admin_token: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            admin_token: None,
        }
    }
}

fn default_port() -> u16 {
    8587
}
