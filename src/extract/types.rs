//! Extraction types

use crate::auth::SessionCredential;
use crate::error::Result;
use crate::pagination::ExportPage;
use crate::types::{EntityType, FailedEntity, Payload, Record};
use async_trait::async_trait;

/// Something that serves export pages (the transport client in production)
#[async_trait]
pub trait ExportSource: Send + Sync {
    /// Fetch one page of a paginated collection
    async fn fetch_page(
        &self,
        session: &SessionCredential,
        entity: EntityType,
        page: u32,
        per_page: u32,
    ) -> Result<ExportPage>;

    /// Fetch a whole collection in one request
    async fn fetch_collection(
        &self,
        session: &SessionCredential,
        entity: EntityType,
    ) -> Result<Vec<Record>>;
}

/// How an entity type is fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Page-number loop with a fixed page size
    Paginated { per_page: u32 },
    /// One request, no pagination
    SingleShot,
}

impl Strategy {
    /// Strategy for an entity type at the given page size
    pub fn for_entity(entity: EntityType, per_page: u32) -> Self {
        if entity.is_paginated() {
            Strategy::Paginated { per_page }
        } else {
            Strategy::SingleShot
        }
    }
}

/// Result of a completed extraction
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Extracted collections, with `_metadata` filled in
    pub payload: Payload,
    /// Non-critical entity types that failed
    pub failures: Vec<FailedEntity>,
}

impl Extraction {
    /// True when every entity type was extracted completely
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Total records extracted
    pub fn total_records(&self) -> usize {
        self.payload.total_records()
    }
}
