//! HTTP server mode: the load stages behind import endpoints
//!
//! Imports never reset the target; natural-key records that already exist
//! are skipped, everything else is appended.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{DataportConfig, SeedConfig};
use crate::error::{Error, Result};
use crate::load::{reinitialize, LoadPipeline, LoadReport, StageTally};
use crate::target::TargetDb;
use crate::types::{EntityType, Payload};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Target database file
    pub database: PathBuf,
    /// Bearer token required on import requests; open when unset
    pub admin_token: Option<String>,
    /// Seeds provisioned when the target has no schema yet
    pub seeds: SeedConfig,
}

impl ServerConfig {
    /// Server settings from the migration config, with an optional port override
    pub fn from_config(config: &DataportConfig, port: Option<u16>) -> Self {
        Self {
            port: port.unwrap_or(config.server.port),
            database: config.target.database.clone(),
            admin_token: config.server.admin_token.clone(),
            seeds: config.seeds.clone(),
        }
    }
}

/// App state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Single writer; held only inside blocking tasks
    db: Arc<Mutex<TargetDb>>,
    admin_token: Option<String>,
}

impl AppState {
    pub fn new(db: TargetDb, admin_token: Option<String>) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            admin_token,
        }
    }
}

/// Per-entity counts as reported by the import endpoints
#[derive(Debug, Serialize)]
struct ImportTally {
    imported: usize,
    skipped: usize,
    failed: usize,
    errors: Vec<String>,
}

impl From<StageTally> for ImportTally {
    fn from(tally: StageTally) -> Self {
        Self {
            imported: tally.created,
            skipped: tally.skipped,
            failed: tally.failed,
            errors: tally.errors,
        }
    }
}

/// Build the import router
pub fn router(state: AppState) -> Router {
    // Build CORS layer - allow all origins for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/import", post(import_all))
        .route("/import/:entity", post(import_entity))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server
pub async fn serve(config: ServerConfig) -> Result<()> {
    let mut db = TargetDb::open(&config.database)?;
    if !db.has_tables()? {
        tracing::info!("Target has no schema yet, creating it");
        reinitialize(&mut db, &config.seeds)?;
    }
    if config.admin_token.is_none() {
        tracing::warn!("No admin token configured; import endpoints are open");
    }

    let app = router(AppState::new(db, config.admin_token));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting import service on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::config(format!("Failed to bind to port {}: {e}", config.port)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::config(format!("Server error: {e}")))?;

    Ok(())
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "message": message.into() }))).into_response()
}

/// Reject requests without the configured bearer token
fn authorize(state: &AppState, headers: &HeaderMap) -> std::result::Result<(), Response> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Ok(());
    };
    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if provided == Some(expected) {
        Ok(())
    } else {
        Err(error_response(
            StatusCode::FORBIDDEN,
            "Admin privileges required",
        ))
    }
}

/// Decode a request body into a payload; the body must be a JSON object
fn parse_payload(body: &Bytes) -> std::result::Result<Payload, Response> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, format!("Invalid JSON: {e}")))?;
    if !value.is_object() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Request body must be a JSON object",
        ));
    }
    serde_json::from_value(value)
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, format!("Invalid payload: {e}")))
}

/// Run a load closure against the shared database on the blocking pool
async fn with_db<T, F>(state: &AppState, work: F) -> std::result::Result<T, Response>
where
    T: Send + 'static,
    F: FnOnce(&mut TargetDb) -> T + Send + 'static,
{
    let db = Arc::clone(&state.db);
    tokio::task::spawn_blocking(move || {
        let mut guard = db
            .lock()
            .map_err(|_| "Target database lock poisoned".to_string())?;
        Ok::<T, String>(work(&mut *guard))
    })
    .await
    .map_err(|e| e.to_string())
    .and_then(|r| r)
    .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e))
}

/// Import one entity type: body `{ <entity>: [...] }`
async fn import_entity(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    let Ok(entity) = entity.parse::<EntityType>() else {
        return error_response(StatusCode::NOT_FOUND, format!("Unknown entity: {entity}"));
    };
    let mut payload = match parse_payload(&body) {
        Ok(payload) => payload,
        Err(rejection) => return rejection,
    };

    let records = payload.take(entity).unwrap_or_default();
    let count = records.len();
    let tally = match with_db(&state, move |db| {
        LoadPipeline::new(db).load_stage(entity, &records)
    })
    .await
    {
        Ok(tally) => tally,
        Err(rejection) => return rejection,
    };

    let message = format!(
        "Imported {} of {count} {entity} record(s)",
        tally.created
    );
    let mut response = Map::new();
    response.insert(entity.as_str().to_string(), json!(ImportTally::from(tally)));
    response.insert("message".to_string(), Value::String(message));
    (StatusCode::OK, Json(Value::Object(response))).into_response()
}

/// Import any subset of the entity types, in load order
async fn import_all(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    let payload = match parse_payload(&body) {
        Ok(payload) => payload,
        Err(rejection) => return rejection,
    };

    let report: LoadReport = match with_db(&state, move |db| LoadPipeline::new(db).load(&payload)).await {
        Ok(report) => report,
        Err(rejection) => return rejection,
    };

    let results: Map<String, Value> = report
        .stages
        .into_iter()
        .map(|stage| {
            (
                stage.entity.as_str().to_string(),
                json!(ImportTally::from(stage.tally)),
            )
        })
        .collect();

    (
        StatusCode::OK,
        Json(json!({ "results": results, "message": "Import completed" })),
    )
        .into_response()
}
