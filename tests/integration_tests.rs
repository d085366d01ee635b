//! Integration tests using a mock source
//!
//! Tests the full end-to-end flow: login → paginated export → snapshot →
//! filter → load into a DuckDB file

use dataport::cli::{Migration, PayloadSource, RunOutcome};
use dataport::config::{DataportConfig, SeedConfig};
use dataport::load::reinitialize;
use dataport::model::{FeedbackRecord, FromRecord};
use dataport::snapshot::SnapshotStore;
use dataport::{EntityType, Error, Payload, Record, TargetDb};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Fixtures
// ============================================================================

fn config(dir: &Path, base_url: &str) -> DataportConfig {
    let mut config = DataportConfig::default();
    config.source.base_url = base_url.to_string();
    config.source.uid = Some("admin".to_string());
    config.source.password = Some("pw".to_string());
    config.transport.page_size = 2;
    config.transport.retry_delay_ms = 10;
    config.snapshot.path = dir.join("data.json");
    config.target.database = dir.join("target.duckdb");
    config
}

async fn migrate(config: DataportConfig, answer: &str) -> (dataport::Result<RunOutcome>, String) {
    let mut input = Cursor::new(answer.as_bytes().to_vec());
    let mut output = Vec::new();
    let result = Migration::new(config).run(&mut input, &mut output).await;
    (result, String::from_utf8(output).unwrap())
}

fn summary(outcome: RunOutcome) -> dataport::cli::MigrationSummary {
    match outcome {
        RunOutcome::Completed(summary) => summary,
        RunOutcome::Declined => panic!("migration was declined"),
    }
}

fn records(values: Vec<Value>) -> Vec<Record> {
    values
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect()
}

async fn mount_export(server: &MockServer, entity: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/export/{entity}")))
        .and(header("Cookie", "jwt=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// A source with a small dataset; users span two pages
async fn mount_source(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/authenticate"))
        .respond_with(ResponseTemplate::new(200).append_header("Set-Cookie", "jwt=abc; HttpOnly"))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/export/users"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [
                {"id": 1, "uid": "alice", "name": "Alice", "sections": [{"abbreviation": "AP"}]},
                {"id": 2, "uid": "bob", "name": "Bob"}
            ],
            "has_next": true
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/export/users"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [{"id": 3, "uid": "admin", "name": "Administrator"}],
            "has_next": false
        })))
        .mount(server)
        .await;

    mount_export(
        server,
        "sections",
        json!({"sections": [
            {"abbreviation": "AP", "name": "AP Prep"},
            {"abbreviation": "CSA", "name": "Computer Science A"}
        ]}),
    )
    .await;
    mount_export(
        server,
        "topics",
        json!({"topics": [
            {"pagePath": "/custom/topic", "displayName": "Custom"},
            {"pagePath": "/lessons/flask-introduction", "displayName": "Flask Introduction"}
        ], "has_next": false}),
    )
    .await;
    mount_export(
        server,
        "microblogs",
        json!({"microblogs": [
            {"id": 1, "userUid": "alice", "topicPath": "/custom/topic", "content": "hello"},
            {"id": 2, "userUid": "admin", "content": "welcome"}
        ], "has_next": false}),
    )
    .await;
    mount_export(
        server,
        "posts",
        json!({"posts": [
            {"id": 100, "userId": 1, "content": "top"},
            {"id": 101, "userId": 2, "parentId": 100, "content": "reply"}
        ], "has_next": false}),
    )
    .await;
    mount_export(server, "classrooms", json!({"classrooms": [
        {"name": "Period 1", "ownerUid": "alice", "studentUids": ["bob"]}
    ]}))
    .await;
    mount_export(server, "feedback", json!({"feedback": [{"title": "Bug", "body": "It broke"}]}))
        .await;
    mount_export(server, "study", json!({"study": []})).await;
    mount_export(
        server,
        "personas",
        json!({"personas": [{"alias": "scholar", "category": "student"}], "has_next": false}),
    )
    .await;
    mount_export(
        server,
        "user_personas",
        json!({"user_personas": [{"userUid": "alice", "personaAlias": "scholar"}], "has_next": false}),
    )
    .await;
}

/// A target that already holds a previous migration
fn existing_target(path: &Path) {
    let mut db = TargetDb::open(path).unwrap();
    reinitialize(&mut db, &SeedConfig::default()).unwrap();
    db.checkpoint().unwrap();
}

// ============================================================================
// Live extraction
// ============================================================================

#[tokio::test]
async fn test_live_migration_end_to_end() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_source(&server).await;

    let config = config(dir.path(), &server.uri());
    let (result, output) = migrate(config.clone(), "").await;
    let summary = summary(result.unwrap());

    assert_eq!(summary.source, PayloadSource::Live);
    assert!(summary.extraction_failures.is_empty());
    // seed user, seed section, seed topic, and the seed user's microblog
    assert_eq!(summary.filtered, 4);
    assert!(!summary.report.has_failures());
    assert!(output.contains("Database initialized successfully."));

    let db = TargetDb::open(&config.target.database).unwrap();
    let seeds = SeedConfig::default();
    assert_eq!(db.count("users").unwrap(), seeds.users.len() + 2);
    assert_eq!(db.count("sections").unwrap(), seeds.sections.len() + 1);
    assert_eq!(db.count("topics").unwrap(), seeds.topics.len() + 1);
    assert_eq!(db.count("microblogs").unwrap(), 1);
    assert_eq!(db.count("posts").unwrap(), 2);
    assert_eq!(db.count("user_sections").unwrap(), 1);
    assert_eq!(db.count("classroom_students").unwrap(), 1);
    assert_eq!(db.count("user_personas").unwrap(), 1);
    assert_eq!(db.count("feedback").unwrap(), 1);

    // The snapshot holds the unfiltered payload
    let snapshot = SnapshotStore::new(&config.snapshot.path).load().await.unwrap();
    assert_eq!(snapshot.count(EntityType::Users), 3);
    assert_eq!(snapshot.count(EntityType::Study), 0);
    assert!(snapshot.contains(EntityType::Study));
    let total = snapshot.total_records();
    let metadata = snapshot.metadata.unwrap();
    assert_eq!(metadata.total_records, total);
}

#[tokio::test]
async fn test_non_critical_failure_continues() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    // Mounted first so it wins over the working feedback endpoint
    Mock::given(method("GET"))
        .and(path("/api/export/feedback"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "Forbidden"})))
        .mount(&server)
        .await;
    mount_source(&server).await;

    let config = config(dir.path(), &server.uri());
    let (result, output) = migrate(config.clone(), "").await;
    let summary = summary(result.unwrap());

    assert_eq!(summary.source, PayloadSource::Live);
    assert_eq!(summary.extraction_failures.len(), 1);
    assert_eq!(summary.extraction_failures[0].entity, "feedback");
    assert!(summary.report.tally(EntityType::Feedback).is_none());
    assert!(output.contains("Warning: feedback not extracted"));

    let snapshot = SnapshotStore::new(&config.snapshot.path).load().await.unwrap();
    assert!(!snapshot.contains(EntityType::Feedback));
    let failed = snapshot.metadata.unwrap().failed_endpoints;
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].entity, "feedback");
}

#[tokio::test]
async fn test_existing_snapshot_is_backed_up() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_source(&server).await;

    let config = config(dir.path(), &server.uri());
    let store = SnapshotStore::new(&config.snapshot.path);
    let mut old = Payload::new();
    old.set(EntityType::Sections, records(vec![json!({"abbreviation": "OLD"})]));
    store.save(&old).await.unwrap();

    let (result, _) = migrate(config, "").await;
    result.unwrap();

    assert_eq!(store.backups().unwrap().len(), 1);
    assert_eq!(store.load().await.unwrap().count(EntityType::Users), 3);
}

// ============================================================================
// Reset gate
// ============================================================================

#[tokio::test]
async fn test_declined_prompt_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/authenticate"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = config(dir.path(), &server.uri());
    existing_target(&config.target.database);

    let (result, output) = migrate(config.clone(), "n\n").await;
    assert!(matches!(result.unwrap(), RunOutcome::Declined));
    assert!(output.contains("Do you want to continue? (y/n)"));
    assert!(output.contains("Exiting without making changes."));
    assert!(!config.snapshot.path.exists());
}

#[tokio::test]
async fn test_confirmed_reset_backs_up_target() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_source(&server).await;

    let config = config(dir.path(), &server.uri());
    existing_target(&config.target.database);

    let (result, _) = migrate(config.clone(), "y\n").await;
    result.unwrap();

    let mut backup = config.target.database.clone().into_os_string();
    backup.push(".bak");
    assert!(Path::new(&backup).exists());
}

// ============================================================================
// Snapshot fallback
// ============================================================================

#[tokio::test]
async fn test_critical_failure_without_snapshot_leaves_target() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/export/users"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    mount_source(&server).await;

    let config = config(dir.path(), &server.uri());
    existing_target(&config.target.database);
    {
        let mut db = TargetDb::open(&config.target.database).unwrap();
        let feedback = records(vec![json!({"title": "keep", "body": "me"})]);
        db.insert_feedback(&FeedbackRecord::from_record(&feedback[0]).unwrap())
            .unwrap();
    }

    let (result, _) = migrate(config.clone(), "y\n").await;
    let err = result.unwrap_err();
    assert!(matches!(err, Error::RunFailure { .. }));
    assert!(err.to_string().contains("Cannot proceed"));

    let db = TargetDb::open(&config.target.database).unwrap();
    assert_eq!(db.count("feedback").unwrap(), 1);
}

#[tokio::test]
async fn test_critical_failure_falls_back_to_snapshot() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/export/sections"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_source(&server).await;

    let config = config(dir.path(), &server.uri());
    let mut saved = Payload::new();
    saved.set(
        EntityType::Users,
        records(vec![json!({"uid": "carol", "name": "Carol"})]),
    );
    SnapshotStore::new(&config.snapshot.path).save(&saved).await.unwrap();

    let (result, output) = migrate(config.clone(), "").await;
    let summary = summary(result.unwrap());

    assert_eq!(summary.source, PayloadSource::Snapshot);
    assert!(output.contains("as fallback"));
    let db = TargetDb::open(&config.target.database).unwrap();
    assert!(db.user_id("carol").unwrap().is_some());
}

#[tokio::test]
async fn test_unconfigured_source_uses_snapshot() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path(), "");

    let mut saved = Payload::new();
    saved.set(
        EntityType::Sections,
        records(vec![json!({"abbreviation": "BIO", "name": "Biology"})]),
    );
    SnapshotStore::new(&config.snapshot.path).save(&saved).await.unwrap();

    let (result, _) = migrate(config.clone(), "").await;
    let summary = summary(result.unwrap());

    assert_eq!(summary.source, PayloadSource::Snapshot);
    assert_eq!(summary.report.stages.len(), 1);
    let db = TargetDb::open(&config.target.database).unwrap();
    assert!(db.section_id("BIO").unwrap().is_some());
}

#[tokio::test]
async fn test_empty_snapshot_is_a_failure() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path(), "");
    std::fs::write(&config.snapshot.path, "{}").unwrap();

    let (result, _) = migrate(config, "").await;
    let err = result.unwrap_err();
    assert!(err.to_string().contains("No data was extracted"));
}
