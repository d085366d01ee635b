//! Default-data filter
//!
//! Removes records that collide with the identities the target provisions
//! for itself (seed users, sections and topics), along with microblogs and
//! posts authored by seed users.

use crate::config::SeedConfig;
use crate::model::{fields, AuthorRef, SourceUserIndex};
use crate::types::{EntityType, Payload, Record};
use std::collections::{BTreeMap, HashSet};
use tracing::info;

/// Filtered payload plus per-entity removal counts
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub payload: Payload,
    /// Removed records per entity type (only types with removals)
    pub removed: BTreeMap<EntityType, usize>,
}

impl FilterOutcome {
    pub fn total_removed(&self) -> usize {
        self.removed.values().sum()
    }
}

/// Seed identity sets
#[derive(Debug, Clone, Default)]
pub struct DefaultDataFilter {
    user_uids: HashSet<String>,
    section_abbreviations: HashSet<String>,
    topic_paths: HashSet<String>,
}

impl DefaultDataFilter {
    /// Build from the provisioning seed lists
    pub fn from_seeds(seeds: &SeedConfig) -> Self {
        Self {
            user_uids: seeds.users.iter().map(|u| u.uid.clone()).collect(),
            section_abbreviations: seeds.sections.iter().map(|s| s.abbreviation.clone()).collect(),
            topic_paths: seeds.topics.iter().map(|t| t.page_path.clone()).collect(),
        }
    }

    pub fn is_default_user(&self, uid: &str) -> bool {
        self.user_uids.contains(uid)
    }

    pub fn is_default_section(&self, abbreviation: &str) -> bool {
        self.section_abbreviations.contains(abbreviation)
    }

    pub fn is_default_topic(&self, page_path: &str) -> bool {
        self.topic_paths.contains(page_path)
    }

    /// Drop seed identities and content authored by seed users
    pub fn filter(&self, mut payload: Payload) -> FilterOutcome {
        // The index must see the unfiltered users so seed authors still resolve
        let index = SourceUserIndex::from_users(payload.records(EntityType::Users));
        let mut removed = BTreeMap::new();

        let mut retain = |payload: &mut Payload, entity: EntityType, keep: &dyn Fn(&Record) -> bool| {
            if let Some(records) = payload.take(entity) {
                let before = records.len();
                let kept: Vec<Record> = records.into_iter().filter(|r| keep(r)).collect();
                if kept.len() < before {
                    removed.insert(entity, before - kept.len());
                }
                payload.set(entity, kept);
            }
        };

        retain(&mut payload, EntityType::Users, &|r| {
            !fields::string(r, "uid").is_some_and(|uid| self.is_default_user(&uid))
        });
        retain(&mut payload, EntityType::Sections, &|r| {
            !fields::string(r, "abbreviation").is_some_and(|a| self.is_default_section(&a))
        });
        retain(&mut payload, EntityType::Topics, &|r| {
            !fields::resolve_str(r, fields::PAGE_PATH).is_some_and(|p| self.is_default_topic(&p))
        });
        let authored_by_seed = |r: &Record| {
            AuthorRef::from_raw(r)
                .resolve_uid(&index)
                .is_some_and(|uid| self.is_default_user(&uid))
        };
        retain(&mut payload, EntityType::Microblogs, &|r| !authored_by_seed(r));
        retain(&mut payload, EntityType::Posts, &|r| !authored_by_seed(r));

        for (entity, count) in &removed {
            info!("Filtered {count} default {entity} record(s)");
        }

        FilterOutcome { payload, removed }
    }
}
