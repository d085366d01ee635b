//! Tests for the target database

use super::*;
use crate::config::SeedConfig;
use crate::model::{FromRecord, PostRecord, SectionRecord, UserRecord};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

fn fresh() -> TargetDb {
    let mut db = TargetDb::open_in_memory().unwrap();
    db.reset_schema().unwrap();
    db.provision(&SeedConfig::default()).unwrap();
    db
}

fn record(value: serde_json::Value) -> crate::types::Record {
    value.as_object().cloned().unwrap()
}

#[test]
fn test_reset_creates_schema() {
    let db = TargetDb::open_in_memory().unwrap();
    assert!(!db.has_tables().unwrap());

    db.reset_schema().unwrap();
    let tables = db.list_tables().unwrap();
    assert_eq!(tables.len(), schema::TABLES.len());
    for table in schema::TABLES {
        assert!(tables.iter().any(|t| t == table), "missing {table}");
    }
}

#[test]
fn test_reset_drops_existing_data() {
    let mut db = fresh();
    assert_eq!(db.count("users").unwrap(), 3);

    db.connection()
        .execute_batch("CREATE TABLE leftover (x INTEGER);")
        .unwrap();
    db.reset_schema().unwrap();

    assert_eq!(db.count("users").unwrap(), 0);
    assert!(!db.list_tables().unwrap().contains(&"leftover".to_string()));

    // Sequences restart with the schema
    db.provision(&SeedConfig::default()).unwrap();
    assert_eq!(db.user_id("admin").unwrap(), Some(1));
}

#[test]
fn test_provision_seeds() {
    let db = fresh();
    assert_eq!(db.count("sections").unwrap(), 4);
    assert_eq!(db.count("topics").unwrap(), 5);
    assert!(db.user_id("niko").unwrap().is_some());
    assert!(db.section_id("CSSE").unwrap().is_some());
    assert!(db.topic_id("/resources/study-materials").unwrap().is_some());
}

#[test]
fn test_lookups_miss() {
    let db = fresh();
    assert_eq!(db.user_id("nobody").unwrap(), None);
    assert_eq!(db.persona("ghost").unwrap(), None);
    assert_eq!(db.user_id_by_name("Nobody").unwrap(), None);
    assert_eq!(db.user_id_by_name("Nikola Tesla").unwrap(), db.user_id("niko").unwrap());
}

#[test]
fn test_insert_user_with_sections() {
    let mut db = fresh();
    let section = SectionRecord::from_record(&record(json!({"abbreviation": "AP", "name": "AP"}))).unwrap();
    let section_id = db.insert_section(&section).unwrap();

    let user = UserRecord::from_record(&record(json!({"uid": "alice", "name": "Alice"}))).unwrap();
    let user_id = db.insert_user(&user, &[section_id]).unwrap();

    assert_eq!(db.user_id("alice").unwrap(), Some(user_id));
    assert_eq!(db.count("user_sections").unwrap(), 1);
}

#[test]
fn test_duplicate_natural_key_rejected() {
    let mut db = fresh();
    let section = SectionRecord::from_record(&record(json!({"abbreviation": "CSA"}))).unwrap();
    assert!(db.insert_section(&section).is_err());
    assert_eq!(db.count("sections").unwrap(), 4);
}

#[test]
fn test_failed_user_insert_rolls_back() {
    let mut db = fresh();
    let user = UserRecord::from_record(&record(json!({"uid": "admin"}))).unwrap();
    assert!(db.insert_user(&user, &[1]).is_err());
    assert_eq!(db.count("user_sections").unwrap(), 0);
}

#[test]
fn test_insert_post_and_reply() {
    let mut db = fresh();
    let user_id = db.user_id("niko").unwrap().unwrap();

    let post = PostRecord::from_record(&record(json!({"id": 100, "content": "hi"}))).unwrap();
    let post_id = db.insert_post(&post, user_id, None).unwrap();

    let reply = PostRecord::from_record(&record(json!({"id": 101, "parentId": 100}))).unwrap();
    let reply_id = db.insert_post(&reply, user_id, Some(post_id)).unwrap();

    let parent: Option<i64> = db
        .connection()
        .query_row("SELECT parent_id FROM posts WHERE id = ?", duckdb::params![reply_id], |row| row.get(0))
        .unwrap();
    assert_eq!(parent, Some(post_id));
}

#[test]
fn test_user_persona_exists() {
    let mut db = fresh();
    let persona = crate::model::PersonaRecord::from_record(&record(json!({
        "alias": "scholar",
        "category": "student"
    })))
    .unwrap();
    let persona_id = db.insert_persona(&persona).unwrap();
    let user_id = db.user_id("admin").unwrap().unwrap();

    assert!(!db.user_persona_exists(user_id, persona_id).unwrap());
    db.insert_user_persona(user_id, persona_id, 50, None).unwrap();
    assert!(db.user_persona_exists(user_id, persona_id).unwrap());

    assert_eq!(
        db.persona("scholar").unwrap(),
        Some((persona_id, Some("student".to_string())))
    );
}

#[test]
fn test_table_counts() {
    let db = fresh();
    let counts = db.table_counts().unwrap();
    assert_eq!(counts.get("users"), Some(&3));
    assert_eq!(counts.get("posts"), Some(&0));
}

#[test]
fn test_open_file_and_backup() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("instance").join("target.duckdb");

    assert_eq!(backup_file(&path).unwrap(), None);

    {
        let db = TargetDb::open(&path).unwrap();
        db.reset_schema().unwrap();
        db.checkpoint().unwrap();
    }

    let backup = backup_file(&path).unwrap().unwrap();
    assert!(backup.to_str().unwrap().ends_with("target.duckdb.bak"));
    assert!(backup.exists());

    let reopened = TargetDb::open(&path).unwrap();
    assert!(reopened.has_tables().unwrap());
}
