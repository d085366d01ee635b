//! Extractor implementation

use super::types::{ExportSource, Extraction, Strategy};
use crate::auth::SessionCredential;
use crate::error::{Error, Result};
use crate::pagination::PageCursor;
use crate::types::{EntityType, ExportMetadata, FailedEntity, Payload, Record};
use chrono::Utc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Drives an export source across the entity catalogue
pub struct Extractor<'a, S: ExportSource + ?Sized> {
    source: &'a S,
    page_size: u32,
    entities: Vec<EntityType>,
}

impl<'a, S: ExportSource + ?Sized> Extractor<'a, S> {
    /// Create an extractor over every entity type
    pub fn new(source: &'a S, page_size: u32) -> Self {
        Self {
            source,
            page_size,
            entities: EntityType::EXPORT_ORDER.to_vec(),
        }
    }

    /// Restrict extraction to the given entity types
    #[must_use]
    pub fn with_entities(mut self, entities: Vec<EntityType>) -> Self {
        self.entities = entities;
        self
    }

    /// Extract every configured entity type
    ///
    /// Fails with [`Error::CriticalExtraction`] when a critical entity type
    /// could not be extracted; other failures are reported in the result.
    pub async fn extract_all(&self, session: &SessionCredential) -> Result<Extraction> {
        let start = Instant::now();
        let mut payload = Payload::new();
        let mut failures = Vec::new();

        for &entity in &self.entities {
            let mut records = Vec::new();
            match self.extract_into(session, entity, &mut records).await {
                Ok(()) => {
                    info!("Fetched {entity}: {} records", records.len());
                    payload.set(entity, records);
                }
                Err(e) => {
                    warn!("Extraction of {entity} failed: {e}");
                    // Pages fetched before the failure are kept
                    if !records.is_empty() && !entity.is_critical() {
                        info!(
                            "Keeping {} {entity} records fetched before the failure",
                            records.len()
                        );
                        payload.set(entity, records);
                    }
                    failures.push(FailedEntity {
                        entity: entity.as_str().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let total_records = payload.total_records();
        payload.metadata = Some(ExportMetadata {
            exported_at: Some(Utc::now()),
            total_records,
            tables: self.entities.iter().map(|e| e.as_str().to_string()).collect(),
            failed_endpoints: failures.clone(),
        });

        info!(
            "Extracted {total_records} records in {:.1}s ({} failed entity types)",
            start.elapsed().as_secs_f64(),
            failures.len()
        );

        let critical: Vec<String> = failures
            .iter()
            .filter(|f| {
                f.entity
                    .parse::<EntityType>()
                    .is_ok_and(EntityType::is_critical)
            })
            .map(|f| f.entity.clone())
            .collect();
        if !critical.is_empty() {
            return Err(Error::CriticalExtraction { entities: critical });
        }

        Ok(Extraction { payload, failures })
    }

    /// Extract one entity type
    #[cfg(test)]
    pub(crate) async fn extract_entity(
        &self,
        session: &SessionCredential,
        entity: EntityType,
    ) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        self.extract_into(session, entity, &mut records).await?;
        Ok(records)
    }

    /// Append an entity's records to `records`
    async fn extract_into(
        &self,
        session: &SessionCredential,
        entity: EntityType,
        records: &mut Vec<Record>,
    ) -> Result<()> {
        match Strategy::for_entity(entity, self.page_size) {
            Strategy::SingleShot => {
                records.extend(self.source.fetch_collection(session, entity).await?);
                Ok(())
            }
            Strategy::Paginated { per_page } => {
                let mut cursor = PageCursor::new(per_page);
                loop {
                    let page = self
                        .source
                        .fetch_page(session, entity, cursor.page, per_page)
                        .await
                        .map_err(|e| {
                            Error::extraction(entity.as_str(), format!("page {}: {e}", cursor.page))
                        })?;

                    debug!("{entity} page {}: {} records", cursor.page, page.len());
                    let next = cursor.advance(page.len(), page.has_next);
                    records.extend(page.records);

                    if next.is_done() {
                        debug!(
                            "{entity}: {} record(s) over {} page(s)",
                            cursor.total_fetched, cursor.pages_fetched
                        );
                        return Ok(());
                    }
                }
            }
        }
    }
}
