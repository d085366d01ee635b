//! Tests for pagination module

use super::*;
use crate::types::EntityType;
use serde_json::json;

// ============================================================================
// NextPage Tests
// ============================================================================

#[test]
fn test_next_page_flags() {
    assert!(!NextPage::Continue { page: 2 }.is_done());
    assert!(NextPage::Done.is_done());
}

// ============================================================================
// ExportPage Tests
// ============================================================================

#[test]
fn test_export_page_paginated_envelope() {
    let body = json!({
        "users": [{"uid": "a"}, {"uid": "b"}],
        "count": 2,
        "total": 7,
        "page": 1,
        "per_page": 2,
        "has_next": true,
        "has_prev": false
    });

    let page = ExportPage::from_body(EntityType::Users, &body).unwrap();
    assert_eq!(page.len(), 2);
    assert!(page.has_next);
    assert_eq!(page.total, Some(7));
    assert_eq!(page.records[1]["uid"], "b");
}

#[test]
fn test_export_page_single_shot_envelope() {
    let body = json!({"sections": [{"abbreviation": "AP"}], "count": 1});
    let page = ExportPage::from_body(EntityType::Sections, &body).unwrap();
    assert_eq!(page.len(), 1);
    assert!(!page.has_next);
}

#[test]
fn test_export_page_missing_key_is_empty() {
    let body = json!({"count": 0});
    let page = ExportPage::from_body(EntityType::Feedback, &body).unwrap();
    assert!(page.is_empty());
}

#[test]
fn test_export_page_malformed() {
    assert!(ExportPage::from_body(EntityType::Users, &json!([1, 2])).is_err());
    assert!(ExportPage::from_body(EntityType::Users, &json!({"users": "nope"})).is_err());
    assert!(ExportPage::from_body(EntityType::Users, &json!({"users": [1]})).is_err());
}

// ============================================================================
// PageCursor Tests
// ============================================================================

#[test]
fn test_cursor_starts_at_page_one() {
    let cursor = PageCursor::new(50);
    assert_eq!(cursor.page, 1);
    assert_eq!(cursor.per_page, 50);
    assert_eq!(cursor.pages_fetched, 0);
    assert!(!cursor.done);
}

#[test]
fn test_cursor_stops_on_empty_page() {
    let mut cursor = PageCursor::new(50);

    assert_eq!(cursor.advance(50, true), NextPage::Continue { page: 2 });
    assert_eq!(cursor.advance(50, true), NextPage::Continue { page: 3 });
    assert_eq!(cursor.advance(0, false), NextPage::Done);

    assert!(cursor.done);
    assert_eq!(cursor.pages_fetched, 3);
    assert_eq!(cursor.total_fetched, 100);
}

#[test]
fn test_cursor_stops_on_has_next_false() {
    let mut cursor = PageCursor::new(50);
    assert_eq!(cursor.advance(12, false), NextPage::Done);
    assert_eq!(cursor.total_fetched, 12);
    assert_eq!(cursor.pages_fetched, 1);
}

#[test]
fn test_cursor_empty_page_wins_over_has_next() {
    let mut cursor = PageCursor::new(10);
    assert_eq!(cursor.advance(0, true), NextPage::Done);
    assert_eq!(cursor.total_fetched, 0);
}
