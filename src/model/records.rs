//! Canonical typed records
//!
//! Raw export records are normalized here once, so the load stages never
//! deal with alternate spellings.

use super::fields::{self, resolve, resolve_bool, resolve_f64, resolve_i64, resolve_str, resolve_str_list, string};
use crate::types::{JsonValue, Record};
use serde_json::json;

/// Topic color when the source does not carry one
pub const DEFAULT_TOPIC_COLOR: &str = "#007bff";
/// Per-user post cap when the source does not carry one
pub const DEFAULT_MAX_POSTS_PER_USER: i64 = 10;

/// A raw record lacks a field its type cannot do without
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("missing required field '{field}'")]
pub struct InvalidRecord {
    pub field: &'static str,
}

/// Normalization from a raw export record
pub trait FromRecord: Sized {
    fn from_record(record: &Record) -> Result<Self, InvalidRecord>;

    /// Identifier used in error strings
    fn label(&self) -> String;
}

/// Label for a raw record that could not be normalized
pub fn raw_label(record: &Record) -> String {
    ["id", "uid", "abbreviation", "alias"]
        .iter()
        .find_map(|key| string(record, key))
        .or_else(|| resolve_str(record, fields::PAGE_PATH))
        .unwrap_or_else(|| "?".to_string())
}

fn required(record: &Record, candidates: &[&str], field: &'static str) -> Result<String, InvalidRecord> {
    resolve_str(record, candidates).ok_or(InvalidRecord { field })
}

fn id_label(source_id: Option<i64>) -> String {
    source_id.map_or_else(|| "?".to_string(), |id| id.to_string())
}

/// JSON columns are stored as text
fn json_text(value: Option<&JsonValue>) -> Option<String> {
    value.map(JsonValue::to_string)
}

// ============================================================================
// Reference types
// ============================================================================

/// How a record names its author
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorRef {
    /// Natural key, when carried
    pub uid: Option<String>,
    /// Source-local user id, translated through the source user index
    pub source_user_id: Option<i64>,
    /// Display name, last-resort lookup
    pub name: Option<String>,
}

impl AuthorRef {
    /// Author reference carried by a raw record
    pub fn from_raw(record: &Record) -> Self {
        Self {
            uid: resolve_str(record, fields::AUTHOR_UID),
            source_user_id: resolve_i64(record, fields::SOURCE_USER_ID),
            name: resolve_str(record, fields::STUDENT_NAME).filter(|n| n != "Unknown"),
        }
    }

    /// Whether the record names an author at all
    pub fn is_empty(&self) -> bool {
        self.uid.is_none() && self.source_user_id.is_none() && self.name.is_none()
    }
}

// ============================================================================
// Entity records
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SectionRecord {
    pub abbreviation: String,
    pub name: Option<String>,
}

impl FromRecord for SectionRecord {
    fn from_record(record: &Record) -> Result<Self, InvalidRecord> {
        Ok(Self {
            abbreviation: required(record, &["abbreviation"], "abbreviation")?,
            name: string(record, "name"),
        })
    }

    fn label(&self) -> String {
        self.abbreviation.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub uid: String,
    pub source_id: Option<i64>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: String,
    pub sid: Option<String>,
    pub role: String,
    pub pfp: Option<String>,
    pub kasm_server_needed: bool,
    pub grade_data: Option<String>,
    pub ap_exam: Option<String>,
    pub school: Option<String>,
    pub classes: Option<String>,
    /// Section abbreviations the user belongs to
    pub sections: Vec<String>,
}

impl FromRecord for UserRecord {
    fn from_record(record: &Record) -> Result<Self, InvalidRecord> {
        let sections = record
            .get("sections")
            .and_then(JsonValue::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| match item {
                        JsonValue::Object(section) => string(section, "abbreviation"),
                        JsonValue::String(abbreviation) if !abbreviation.is_empty() => {
                            Some(abbreviation.clone())
                        }
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            uid: required(record, &["uid"], "uid")?,
            source_id: resolve_i64(record, &["id"]),
            name: string(record, "name"),
            email: string(record, "email"),
            password: string(record, "password").unwrap_or_default(),
            sid: string(record, "sid"),
            role: string(record, "role").unwrap_or_else(|| "User".to_string()),
            pfp: string(record, "pfp"),
            kasm_server_needed: resolve_bool(record, &["kasm_server_needed"]).unwrap_or(false),
            grade_data: json_text(resolve(record, fields::GRADE_DATA)),
            ap_exam: json_text(resolve(record, fields::AP_EXAM)),
            school: string(record, "school"),
            classes: json_text(resolve(record, fields::CLASSES)),
            sections,
        })
    }

    fn label(&self) -> String {
        self.uid.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopicRecord {
    pub page_path: String,
    pub page_title: Option<String>,
    pub page_description: Option<String>,
    pub display_name: Option<String>,
    pub color: String,
    pub icon: Option<String>,
    pub allow_anonymous: bool,
    pub moderated: bool,
    pub max_posts_per_user: i64,
    pub settings: String,
}

impl FromRecord for TopicRecord {
    fn from_record(record: &Record) -> Result<Self, InvalidRecord> {
        Ok(Self {
            page_path: required(record, fields::PAGE_PATH, "page_path")?,
            page_title: resolve_str(record, fields::PAGE_TITLE),
            page_description: resolve_str(record, fields::PAGE_DESCRIPTION),
            display_name: resolve_str(record, fields::DISPLAY_NAME),
            color: string(record, "color").unwrap_or_else(|| DEFAULT_TOPIC_COLOR.to_string()),
            icon: string(record, "icon"),
            allow_anonymous: resolve_bool(record, fields::ALLOW_ANONYMOUS).unwrap_or(false),
            moderated: resolve_bool(record, &["moderated"]).unwrap_or(false),
            max_posts_per_user: resolve_i64(record, fields::MAX_POSTS_PER_USER)
                .unwrap_or(DEFAULT_MAX_POSTS_PER_USER),
            settings: resolve(record, &["settings"])
                .map_or_else(|| json!({}).to_string(), JsonValue::to_string),
        })
    }

    fn label(&self) -> String {
        self.page_path.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MicroblogRecord {
    pub source_id: Option<i64>,
    pub author: AuthorRef,
    pub topic_path: Option<String>,
    pub content: Option<String>,
    pub data: String,
}

impl FromRecord for MicroblogRecord {
    fn from_record(record: &Record) -> Result<Self, InvalidRecord> {
        Ok(Self {
            source_id: resolve_i64(record, &["id"]),
            author: AuthorRef::from_raw(record),
            topic_path: resolve_str(record, fields::TOPIC_REF),
            content: string(record, "content"),
            data: resolve(record, &["data"])
                .map_or_else(|| json!({}).to_string(), JsonValue::to_string),
        })
    }

    fn label(&self) -> String {
        id_label(self.source_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostRecord {
    pub source_id: Option<i64>,
    pub author: AuthorRef,
    /// Source id of the parent post; `None` for top-level posts
    pub parent_id: Option<i64>,
    pub content: Option<String>,
    pub grade_received: Option<f64>,
    pub page_url: Option<String>,
    pub page_title: Option<String>,
}

impl FromRecord for PostRecord {
    fn from_record(record: &Record) -> Result<Self, InvalidRecord> {
        Ok(Self {
            source_id: resolve_i64(record, &["id"]),
            author: AuthorRef::from_raw(record),
            parent_id: resolve_i64(record, fields::PARENT_ID),
            content: string(record, "content"),
            grade_received: resolve_f64(record, fields::GRADE_RECEIVED),
            page_url: resolve_str(record, fields::PAGE_URL),
            page_title: resolve_str(record, fields::PAGE_TITLE),
        })
    }

    fn label(&self) -> String {
        id_label(self.source_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersonaRecord {
    pub alias: String,
    pub category: Option<String>,
    pub bio_map: Option<String>,
    pub empathy_map: Option<String>,
}

impl FromRecord for PersonaRecord {
    fn from_record(record: &Record) -> Result<Self, InvalidRecord> {
        Ok(Self {
            alias: required(record, &["alias"], "alias")?,
            category: string(record, "category"),
            bio_map: json_text(resolve(record, fields::BIO_MAP)),
            empathy_map: json_text(resolve(record, fields::EMPATHY_MAP)),
        })
    }

    fn label(&self) -> String {
        self.alias.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserPersonaRecord {
    pub user_uid: Option<String>,
    pub persona_alias: Option<String>,
    /// Explicit weight; when absent the persona's category decides
    pub weight: Option<i64>,
    pub selected_at: Option<String>,
}

impl FromRecord for UserPersonaRecord {
    fn from_record(record: &Record) -> Result<Self, InvalidRecord> {
        Ok(Self {
            user_uid: resolve_str(record, fields::AUTHOR_UID),
            persona_alias: resolve_str(record, fields::PERSONA_ALIAS),
            weight: resolve_i64(record, &["weight"]),
            selected_at: resolve_str(record, fields::SELECTED_AT),
        })
    }

    fn label(&self) -> String {
        format!(
            "{}/{}",
            self.user_uid.as_deref().unwrap_or("?"),
            self.persona_alias.as_deref().unwrap_or("?")
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassroomRecord {
    pub source_id: Option<i64>,
    pub name: Option<String>,
    pub school_name: Option<String>,
    pub owner_uid: Option<String>,
    pub status: String,
    pub student_uids: Vec<String>,
}

impl FromRecord for ClassroomRecord {
    fn from_record(record: &Record) -> Result<Self, InvalidRecord> {
        Ok(Self {
            source_id: resolve_i64(record, &["id"]),
            name: string(record, "name"),
            school_name: resolve_str(record, fields::SCHOOL_NAME),
            owner_uid: resolve_str(record, fields::OWNER_UID),
            status: string(record, "status").unwrap_or_else(|| "active".to_string()),
            student_uids: resolve_str_list(record, fields::STUDENT_UIDS),
        })
    }

    fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| id_label(self.source_id))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRecord {
    pub source_id: Option<i64>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub kind: String,
    pub github_username: Option<String>,
    pub github_issue_url: Option<String>,
}

impl FromRecord for FeedbackRecord {
    fn from_record(record: &Record) -> Result<Self, InvalidRecord> {
        Ok(Self {
            source_id: resolve_i64(record, &["id"]),
            title: string(record, "title"),
            body: string(record, "body"),
            kind: string(record, "type").unwrap_or_else(|| "Other".to_string()),
            github_username: string(record, "github_username"),
            github_issue_url: string(record, "github_issue_url"),
        })
    }

    fn label(&self) -> String {
        id_label(self.source_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudyRecord {
    pub source_id: Option<i64>,
    pub user_uid: Option<String>,
    pub topic: Option<String>,
    pub subtopic: Option<String>,
    pub studied: bool,
    pub timestamp: Option<String>,
}

impl FromRecord for StudyRecord {
    fn from_record(record: &Record) -> Result<Self, InvalidRecord> {
        Ok(Self {
            source_id: resolve_i64(record, &["id"]),
            user_uid: resolve_str(record, fields::AUTHOR_UID),
            topic: string(record, "topic"),
            subtopic: string(record, "subtopic"),
            studied: resolve_bool(record, &["studied"]).unwrap_or(false),
            timestamp: string(record, "timestamp"),
        })
    }

    fn label(&self) -> String {
        id_label(self.source_id)
    }
}
