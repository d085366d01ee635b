//! Snapshot store implementation

use crate::error::{Error, Result, ResultExt};
use crate::types::{EntityType, JsonValue, Payload};
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Timestamp embedded in backup file names
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// File-backed snapshot of an extracted payload
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Create a store for the given snapshot path
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Snapshot file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a snapshot currently exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Save a payload, backing up the previous snapshot first
    ///
    /// Returns the backup path when one was written.
    pub async fn save(&self, payload: &Payload) -> Result<Option<PathBuf>> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let backup = if self.path.exists() {
            let backup = self.backup_path(&Local::now().format(BACKUP_TIMESTAMP_FORMAT).to_string());
            tokio::fs::copy(&self.path, &backup)
                .await
                .with_context(|| format!("Failed to back up snapshot to {}", backup.display()))?;
            info!("Backed up previous snapshot to {}", backup.display());
            Some(backup)
        } else {
            None
        };

        let contents = serde_json::to_string_pretty(payload)?;

        // Write to temp file first, then rename into place
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .with_context(|| format!("Failed to move snapshot into {}", self.path.display()))?;

        info!(
            "Saved snapshot with {} records to {}",
            payload.total_records(),
            self.path.display()
        );
        Ok(backup)
    }

    /// Load the snapshot
    pub async fn load(&self) -> Result<Payload> {
        if !self.path.exists() {
            return Err(Error::SnapshotNotFound {
                path: self.path.display().to_string(),
            });
        }

        let contents = tokio::fs::read_to_string(&self.path).await?;
        let payload = self.parse(&contents)?;

        info!(
            "Loaded snapshot with {} records from {}",
            payload.total_records(),
            self.path.display()
        );
        Ok(payload)
    }

    /// Existing backups of this snapshot, oldest first
    pub fn backups(&self) -> Result<Vec<PathBuf>> {
        let Some(file_name) = self.path.file_name().and_then(|n| n.to_str()) else {
            return Ok(Vec::new());
        };
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let prefix = format!("{file_name}.");
        let mut backups: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .and_then(|n| n.strip_prefix(&prefix))
                    .and_then(|rest| rest.strip_suffix(".bak"))
                    .is_some_and(|stamp| {
                        stamp.len() == 14 && stamp.chars().all(|c| c.is_ascii_digit())
                    })
            })
            .collect();

        // Timestamps are fixed-width, so lexical order is chronological
        backups.sort();
        Ok(backups)
    }

    fn backup_path(&self, stamp: &str) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(format!(".{stamp}.bak"));
        PathBuf::from(name)
    }

    fn parse(&self, contents: &str) -> Result<Payload> {
        let path = self.path.display().to_string();
        let value: JsonValue = serde_json::from_str(contents)
            .map_err(|e| Error::snapshot_invalid(&path, format!("not JSON: {e}")))?;

        let Some(map) = value.as_object() else {
            return Err(Error::snapshot_invalid(&path, "top level is not a mapping"));
        };

        for entity in EntityType::EXPORT_ORDER {
            match map.get(entity.as_str()) {
                None | Some(JsonValue::Null) => {}
                Some(JsonValue::Array(items)) => {
                    if let Some(pos) = items.iter().position(|item| !item.is_object()) {
                        return Err(Error::snapshot_invalid(
                            &path,
                            format!("{entity}[{pos}] is not an object"),
                        ));
                    }
                }
                Some(_) => {
                    return Err(Error::snapshot_invalid(&path, format!("{entity} is not a list")));
                }
            }
        }

        debug!("Snapshot {path} passed structural checks");
        serde_json::from_value(value).map_err(|e| Error::snapshot_invalid(&path, e.to_string()))
    }
}
