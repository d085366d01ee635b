//! Candidate-key field resolution
//!
//! Each canonical field has an ordered list of candidate keys. A candidate
//! may be a dot path into a nested object (`user.uid`). The first candidate
//! holding a non-null, non-empty value wins.

use crate::types::{JsonValue, Record};

pub const PAGE_PATH: &[&str] = &["pagePath", "page_path"];
pub const PAGE_TITLE: &[&str] = &["pageTitle", "page_title"];
pub const PAGE_DESCRIPTION: &[&str] = &["pageDescription", "page_description"];
pub const DISPLAY_NAME: &[&str] = &["displayName", "display_name"];
pub const ALLOW_ANONYMOUS: &[&str] = &["allowAnonymous", "allow_anonymous"];
pub const MAX_POSTS_PER_USER: &[&str] = &["maxPostsPerUser", "max_posts_per_user"];
pub const AUTHOR_UID: &[&str] = &["userUid", "user.uid"];
pub const SOURCE_USER_ID: &[&str] = &["userId", "user_id"];
pub const TOPIC_REF: &[&str] = &["topicPath", "topicKey", "topic.page_path"];
pub const PARENT_ID: &[&str] = &["parentId", "parent_id"];
pub const GRADE_RECEIVED: &[&str] = &["gradeReceived", "grade_received"];
pub const PAGE_URL: &[&str] = &["pageUrl", "page_url"];
pub const GRADE_DATA: &[&str] = &["grade_data", "gradeData"];
pub const AP_EXAM: &[&str] = &["ap_exam", "apExam"];
pub const CLASSES: &[&str] = &["class", "_class"];
pub const SCHOOL_NAME: &[&str] = &["school_name", "schoolName"];
pub const BIO_MAP: &[&str] = &["bio_map", "bioMap"];
pub const EMPATHY_MAP: &[&str] = &["empathy_map", "empathyMap"];
pub const STUDENT_NAME: &[&str] = &["studentName"];
pub const OWNER_UID: &[&str] = &["ownerUid"];
pub const STUDENT_UIDS: &[&str] = &["studentUids"];
pub const PERSONA_ALIAS: &[&str] = &["personaAlias"];
pub const SELECTED_AT: &[&str] = &["selectedAt"];

/// Value at a single (possibly dotted) key
fn lookup<'a>(record: &'a Record, key: &str) -> Option<&'a JsonValue> {
    let mut parts = key.split('.');
    let mut current = record.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn is_absent(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::String(s) => s.is_empty(),
        _ => false,
    }
}

/// First present value among the candidates
pub fn resolve<'a>(record: &'a Record, candidates: &[&str]) -> Option<&'a JsonValue> {
    candidates
        .iter()
        .filter_map(|key| lookup(record, key))
        .find(|value| !is_absent(value))
}

/// First present value, as an owned string; numbers are rendered
pub fn resolve_str(record: &Record, candidates: &[&str]) -> Option<String> {
    match resolve(record, candidates)? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First present value as an integer; numeric strings are accepted
pub fn resolve_i64(record: &Record, candidates: &[&str]) -> Option<i64> {
    match resolve(record, candidates)? {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// First present value as a float; numeric strings are accepted
pub fn resolve_f64(record: &Record, candidates: &[&str]) -> Option<f64> {
    match resolve(record, candidates)? {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// First present value as a bool; `"true"`/`"false"` and 0/1 are accepted
pub fn resolve_bool(record: &Record, candidates: &[&str]) -> Option<bool> {
    match resolve(record, candidates)? {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::Number(n) => n.as_i64().map(|n| n != 0),
        JsonValue::String(s) => match s.to_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// First present value as a list of strings; non-string items are dropped
pub fn resolve_str_list(record: &Record, candidates: &[&str]) -> Vec<String> {
    resolve(record, candidates)
        .and_then(JsonValue::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().filter(|s| !s.is_empty()).map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// Single-key shorthand for [`resolve_str`]
pub fn string(record: &Record, key: &str) -> Option<String> {
    resolve_str(record, &[key])
}
