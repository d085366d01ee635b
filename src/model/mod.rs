//! Record normalization module
//!
//! Turns raw export records (JSON objects whose field names vary between
//! camelCase and snake_case) into canonical typed records.
//!
//! # Overview
//!
//! - [`fields`] holds the ordered candidate-key lists and resolvers
//! - [`FromRecord`] is implemented by one typed record per entity type
//! - [`SourceUserIndex`] translates source-local user ids into uids
//! - [`category_weight`] gives a persona category's default weight

pub mod fields;
mod records;

pub use records::{
    raw_label, AuthorRef, ClassroomRecord, FeedbackRecord, FromRecord, InvalidRecord,
    MicroblogRecord, PersonaRecord, PostRecord, SectionRecord, StudyRecord, TopicRecord,
    UserPersonaRecord, UserRecord, DEFAULT_MAX_POSTS_PER_USER, DEFAULT_TOPIC_COLOR,
};

use crate::types::Record;
use std::collections::HashMap;

/// Weight of a user-persona association whose persona has no known category
pub const FALLBACK_PERSONA_WEIGHT: i64 = 1;

/// Default weight for a persona category
pub fn category_weight(category: Option<&str>) -> i64 {
    match category.map(str::to_ascii_lowercase).as_deref() {
        Some("student") => 50,
        Some("social" | "achievement") => 25,
        Some("fantasy") => 0,
        _ => FALLBACK_PERSONA_WEIGHT,
    }
}

/// Source user id → uid, built from the extracted users collection
#[derive(Debug, Clone, Default)]
pub struct SourceUserIndex {
    uids: HashMap<i64, String>,
}

impl SourceUserIndex {
    /// Index the `id`/`uid` pairs of raw user records
    pub fn from_users(users: &[Record]) -> Self {
        let uids = users
            .iter()
            .filter_map(|user| {
                let id = fields::resolve_i64(user, &["id"])?;
                let uid = fields::string(user, "uid")?;
                Some((id, uid))
            })
            .collect();
        Self { uids }
    }

    pub fn uid_for(&self, source_id: i64) -> Option<&str> {
        self.uids.get(&source_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.uids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uids.is_empty()
    }
}

impl AuthorRef {
    /// Author uid, directly or through the source user index
    pub fn resolve_uid(&self, index: &SourceUserIndex) -> Option<String> {
        self.uid.clone().or_else(|| {
            self.source_user_id
                .and_then(|id| index.uid_for(id))
                .map(String::from)
        })
    }
}
