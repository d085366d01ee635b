//! Load pipeline types

use crate::error::Error;
use crate::model::InvalidRecord;
use crate::types::EntityType;
use serde::Serialize;
use std::fmt;

/// Result of loading one record that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Created with the given target id (0 for id-less association rows)
    Created(i64),
    /// Deliberately not created
    Skipped(SkipReason),
}

/// Why a record was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// A record with the same natural key already exists
    AlreadyExists,
    /// An optional dependency could not be resolved
    UnresolvedReference(String),
    /// The record carries nothing to load
    Empty(&'static str),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyExists => write!(f, "already exists"),
            SkipReason::UnresolvedReference(what) => write!(f, "{what} not found"),
            SkipReason::Empty(field) => write!(f, "empty {field}"),
        }
    }
}

/// Per-record failure; tallied, never aborts a stage
#[derive(Debug, thiserror::Error)]
pub enum RecordLoadError {
    #[error("{0}")]
    Invalid(#[from] InvalidRecord),

    #[error("{kind} '{key}' not found")]
    MissingDependency { kind: &'static str, key: String },

    #[error("no author reference")]
    NoAuthor,

    #[error("parent post {parent_id} not found")]
    OrphanReply { parent_id: i64 },

    #[error("{0}")]
    Target(#[from] Error),
}

impl RecordLoadError {
    pub(crate) fn missing(kind: &'static str, key: impl Into<String>) -> Self {
        Self::MissingDependency {
            kind,
            key: key.into(),
        }
    }
}

/// Counts for one stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageTally {
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
    /// `"<stage> <record id>: <cause>"` per failure
    pub errors: Vec<String>,
}

impl StageTally {
    /// Fold one record's result into the tally
    pub fn record(
        &mut self,
        entity: EntityType,
        label: &str,
        result: std::result::Result<Outcome, RecordLoadError>,
    ) {
        match result {
            Ok(Outcome::Created(_)) => self.created += 1,
            Ok(Outcome::Skipped(reason)) => {
                tracing::debug!("{entity} {label}: skipped ({reason})");
                self.skipped += 1;
            }
            Err(e) => self.fail(entity, label, &e),
        }
    }

    pub fn fail(&mut self, entity: EntityType, label: &str, error: &RecordLoadError) {
        let message = format!("{entity} {label}: {error}");
        tracing::warn!("{message}");
        self.failed += 1;
        self.errors.push(message);
    }

    pub fn total(&self) -> usize {
        self.created + self.skipped + self.failed
    }

    /// Merge another tally into this one
    pub fn absorb(&mut self, other: StageTally) {
        self.created += other.created;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.errors.extend(other.errors);
    }
}

/// One stage's result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub entity: EntityType,
    #[serde(flatten)]
    pub tally: StageTally,
}

/// Results of every stage that ran, in load order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub stages: Vec<StageReport>,
}

impl LoadReport {
    /// Tally for one entity type, if its stage ran
    pub fn tally(&self, entity: EntityType) -> Option<&StageTally> {
        self.stages
            .iter()
            .find(|s| s.entity == entity)
            .map(|s| &s.tally)
    }

    pub fn push(&mut self, entity: EntityType, tally: StageTally) {
        self.stages.push(StageReport { entity, tally });
    }

    /// All stages summed
    pub fn totals(&self) -> StageTally {
        let mut totals = StageTally::default();
        for stage in &self.stages {
            totals.absorb(stage.tally.clone());
        }
        totals
    }

    pub fn has_failures(&self) -> bool {
        self.stages.iter().any(|s| s.tally.failed > 0)
    }
}
