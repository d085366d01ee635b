//! Tests for the transport client

use super::client::status_message;
use super::*;
use crate::auth::SessionCredential;
use crate::error::Error;
use crate::types::EntityType;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> TransportClient {
    let config = TransportClientConfig::builder()
        .base_url(server.uri())
        .timeout(Duration::from_millis(500))
        .retry(3, Duration::from_millis(10))
        .build();
    TransportClient::with_config(config).unwrap()
}

fn session() -> SessionCredential {
    SessionCredential::from_cookie("jwt=abc")
}

#[test]
fn test_config_default() {
    let config = TransportClientConfig::default();
    assert_eq!(config.max_attempts, 3);
    assert_eq!(config.retry_delay, Duration::from_secs(2));
    assert_eq!(config.page_timeout, Duration::from_secs(180));
    assert_eq!(config.collection_timeout, Duration::from_secs(120));
}

#[test]
fn test_config_from_migration_config() {
    let mut migration = crate::config::DataportConfig::default();
    migration.source.base_url = "https://source.example.com".to_string();
    migration.transport.max_attempts = 5;

    let config = TransportClientConfig::from_config(&migration);
    assert_eq!(config.base_url, "https://source.example.com");
    assert_eq!(config.max_attempts, 5);
}

#[test]
fn test_missing_base_url() {
    let err = TransportClient::with_config(TransportClientConfig::default()).unwrap_err();
    assert!(matches!(err, Error::MissingConfigField { .. }));
}

#[test]
fn test_export_url() {
    let config = TransportClientConfig::builder()
        .base_url("https://source.example.com")
        .export_path("/api/export/")
        .build();
    let client = TransportClient::with_config(config).unwrap();

    assert_eq!(
        client.export_url(EntityType::UserPersonas).unwrap().as_str(),
        "https://source.example.com/api/export/user_personas"
    );
}

#[test]
fn test_status_message() {
    assert_eq!(
        status_message(403, r#"{"message": "Admin privileges required"}"#),
        "HTTP 403: Admin privileges required"
    );
    assert_eq!(status_message(500, "boom"), "HTTP 500: boom");
    assert_eq!(status_message(502, ""), "HTTP 502");
    assert_eq!(status_message(500, &"x".repeat(300)).len(), "HTTP 500: ".len() + 100);
}

#[tokio::test]
async fn test_fetch_page_sends_session_and_params() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/export/users"))
        .and(query_param("page", "2"))
        .and(query_param("per_page", "50"))
        .and(header("Cookie", "jwt=abc"))
        .and(header("X-Origin", "client"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [{"uid": "alice"}],
            "count": 1,
            "has_next": false
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let page = client
        .fetch_page(&session(), EntityType::Users, 2, 50)
        .await
        .unwrap();

    assert_eq!(page.len(), 1);
    assert!(!page.has_next);
}

#[tokio::test]
async fn test_fetch_collection_single_shot() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/export/sections"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sections": [{"abbreviation": "AP"}, {"abbreviation": "BIO"}],
            "count": 2
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let records = client
        .fetch_collection(&session(), EntityType::Sections)
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn test_retry_on_gateway_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/export/posts"))
        .respond_with(ResponseTemplate::new(504))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/export/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "posts": [{"id": 1}],
            "has_next": false
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let page = client
        .fetch_page(&session(), EntityType::Posts, 1, 50)
        .await
        .unwrap();

    assert_eq!(page.len(), 1);
}

#[tokio::test]
async fn test_gateway_timeout_exhausts_attempts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/export/posts"))
        .respond_with(ResponseTemplate::new(504))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let err = client
        .fetch_page(&session(), EntityType::Posts, 1, 50)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::TransientTransport { .. }));
    assert!(err.to_string().contains("HTTP 504"));
}

#[tokio::test]
async fn test_timeout_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/export/topics"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"topics": []}))
                .set_delay(Duration::from_secs(2)),
        )
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let err = client
        .fetch_page(&session(), EntityType::Topics, 1, 50)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::TransientTransport { .. }));
    assert!(err.to_string().contains("timed out"));
}

#[tokio::test]
async fn test_client_error_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/export/users"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({"message": "Admin privileges required"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let err = client
        .fetch_page(&session(), EntityType::Users, 1, 50)
        .await
        .unwrap_err();

    match err {
        Error::TerminalTransport { status, message } => {
            assert_eq!(status, Some(403));
            assert_eq!(message, "HTTP 403: Admin privileges required");
        }
        other => panic!("Expected terminal error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/export/feedback"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let err = client
        .fetch_collection(&session(), EntityType::Feedback)
        .await
        .unwrap_err();

    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_malformed_body_is_terminal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/export/study"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let err = client
        .fetch_collection(&session(), EntityType::Study)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::TerminalTransport { .. }));
    assert!(err.to_string().contains("Malformed"));
}

#[tokio::test]
async fn test_authenticate_uses_auth_path() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/authenticate"))
        .respond_with(
            ResponseTemplate::new(200).append_header("Set-Cookie", "jwt=fresh; HttpOnly"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let credential = client.authenticate("admin", "pw").await.unwrap();
    assert_eq!(credential.cookie(), Some("jwt=fresh"));
}
