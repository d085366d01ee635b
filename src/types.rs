//! Common types used throughout dataport
//!
//! This module contains the entity catalogue, the record type alias and
//! the whole-dataset payload that flows from extraction to loading.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// A single exported record: field name to value
pub type Record = JsonObject;

// ============================================================================
// Entity Types
// ============================================================================

/// The ten entity collections moved by a migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Sections,
    Users,
    Topics,
    Microblogs,
    Posts,
    Classrooms,
    Feedback,
    Study,
    Personas,
    UserPersonas,
}

impl EntityType {
    /// Extraction order, matching the source's export endpoint catalogue
    pub const EXPORT_ORDER: [EntityType; 10] = [
        EntityType::Sections,
        EntityType::Users,
        EntityType::Topics,
        EntityType::Microblogs,
        EntityType::Posts,
        EntityType::Classrooms,
        EntityType::Feedback,
        EntityType::Study,
        EntityType::Personas,
        EntityType::UserPersonas,
    ];

    /// Load order, fixed by foreign-key dependencies
    pub const LOAD_ORDER: [EntityType; 10] = [
        EntityType::Sections,
        EntityType::Users,
        EntityType::Topics,
        EntityType::Microblogs,
        EntityType::Posts,
        EntityType::Personas,
        EntityType::UserPersonas,
        EntityType::Classrooms,
        EntityType::Feedback,
        EntityType::Study,
    ];

    /// Wire key, also used as the export path segment and snapshot key
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Sections => "sections",
            EntityType::Users => "users",
            EntityType::Topics => "topics",
            EntityType::Microblogs => "microblogs",
            EntityType::Posts => "posts",
            EntityType::Classrooms => "classrooms",
            EntityType::Feedback => "feedback",
            EntityType::Study => "study",
            EntityType::Personas => "personas",
            EntityType::UserPersonas => "user_personas",
        }
    }

    /// Whether the source serves this collection in pages
    pub fn is_paginated(self) -> bool {
        matches!(
            self,
            EntityType::Users
                | EntityType::Topics
                | EntityType::Microblogs
                | EntityType::Posts
                | EntityType::Personas
                | EntityType::UserPersonas
        )
    }

    /// Root entities every later stage depends on
    pub fn is_critical(self) -> bool {
        matches!(self, EntityType::Users | EntityType::Sections)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::EXPORT_ORDER
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| crate::Error::Other(format!("Unknown entity type: {s}")))
    }
}

// ============================================================================
// Export Metadata
// ============================================================================

/// An entity type that could not be extracted, with the cause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedEntity {
    pub entity: String,
    pub error: String,
}

/// Aggregate metadata recorded alongside an extracted payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// When the extraction finished
    ///
    /// Snapshots written by other tools may carry a naive timestamp (no
    /// offset), which is read as UTC. An unparseable value reads as `None`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_timestamp"
    )]
    pub exported_at: Option<DateTime<Utc>>,
    /// Total records across all collections
    #[serde(default)]
    pub total_records: usize,
    /// Entity types attempted
    #[serde(default)]
    pub tables: Vec<String>,
    /// Entity types that failed, with the error
    #[serde(default)]
    pub failed_endpoints: Vec<FailedEntity>,
}

fn lenient_timestamp<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(JsonValue::as_str).and_then(parse_timestamp))
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

// ============================================================================
// Payload
// ============================================================================

/// The whole dataset: one record list per entity type
///
/// A collection that was not extracted is absent (`None`), which is distinct
/// from an extracted but empty collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<Record>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<Record>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<Record>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub microblogs: Option<Vec<Record>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posts: Option<Vec<Record>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classrooms: Option<Vec<Record>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Vec<Record>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study: Option<Vec<Record>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personas: Option<Vec<Record>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_personas: Option<Vec<Record>>,
    #[serde(
        rename = "_metadata",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub metadata: Option<ExportMetadata>,
}

impl Payload {
    /// Create an empty payload
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, entity: EntityType) -> &Option<Vec<Record>> {
        match entity {
            EntityType::Sections => &self.sections,
            EntityType::Users => &self.users,
            EntityType::Topics => &self.topics,
            EntityType::Microblogs => &self.microblogs,
            EntityType::Posts => &self.posts,
            EntityType::Classrooms => &self.classrooms,
            EntityType::Feedback => &self.feedback,
            EntityType::Study => &self.study,
            EntityType::Personas => &self.personas,
            EntityType::UserPersonas => &self.user_personas,
        }
    }

    fn slot_mut(&mut self, entity: EntityType) -> &mut Option<Vec<Record>> {
        match entity {
            EntityType::Sections => &mut self.sections,
            EntityType::Users => &mut self.users,
            EntityType::Topics => &mut self.topics,
            EntityType::Microblogs => &mut self.microblogs,
            EntityType::Posts => &mut self.posts,
            EntityType::Classrooms => &mut self.classrooms,
            EntityType::Feedback => &mut self.feedback,
            EntityType::Study => &mut self.study,
            EntityType::Personas => &mut self.personas,
            EntityType::UserPersonas => &mut self.user_personas,
        }
    }

    /// Records of a collection (empty when absent)
    pub fn records(&self, entity: EntityType) -> &[Record] {
        self.slot(entity).as_deref().unwrap_or(&[])
    }

    /// Whether the collection is present at all
    pub fn contains(&self, entity: EntityType) -> bool {
        self.slot(entity).is_some()
    }

    /// Replace a collection
    pub fn set(&mut self, entity: EntityType, records: Vec<Record>) {
        *self.slot_mut(entity) = Some(records);
    }

    /// Take a collection out, leaving it absent
    pub fn take(&mut self, entity: EntityType) -> Option<Vec<Record>> {
        self.slot_mut(entity).take()
    }

    /// Record count of one collection
    pub fn count(&self, entity: EntityType) -> usize {
        self.records(entity).len()
    }

    /// Record count across every collection
    pub fn total_records(&self) -> usize {
        EntityType::EXPORT_ORDER
            .iter()
            .map(|e| self.count(*e))
            .sum()
    }

    /// True when no collection holds any record
    pub fn is_empty(&self) -> bool {
        self.total_records() == 0
    }
}
