//! Transport client with fixed-delay retry
//!
//! Provides the client that handles:
//! - Session login against the source
//! - Paginated and single-shot export requests
//! - Retries for transient failures (timeout, 504) with a fixed delay
//! - Error classification and message normalization

use crate::auth::{self, truncate, SessionCredential};
use crate::config::DataportConfig;
use crate::error::{is_transient_status, Error, Result};
use crate::extract::ExportSource;
use crate::pagination::ExportPage;
use crate::types::{EntityType, Record};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Configuration for the transport client
#[derive(Debug, Clone)]
pub struct TransportClientConfig {
    /// Base URL of the source
    pub base_url: String,
    /// Login endpoint path
    pub auth_path: String,
    /// Prefix of the per-entity export endpoints
    pub export_path: String,
    /// Timeout for one paginated request
    pub page_timeout: Duration,
    /// Timeout for one single-shot request
    pub collection_timeout: Duration,
    /// Attempts per request for transient failures
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub retry_delay: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Default for TransportClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            auth_path: "/api/authenticate".to_string(),
            export_path: "/api/export".to_string(),
            page_timeout: Duration::from_secs(180),
            collection_timeout: Duration::from_secs(120),
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
            user_agent: format!("dataport/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl TransportClientConfig {
    /// Create a new config builder
    pub fn builder() -> TransportClientConfigBuilder {
        TransportClientConfigBuilder::default()
    }

    /// Build from the migration configuration
    pub fn from_config(config: &DataportConfig) -> Self {
        Self {
            base_url: config.source.base_url.clone(),
            auth_path: config.source.auth_path.clone(),
            export_path: config.source.export_path.clone(),
            page_timeout: config.transport.page_timeout(),
            collection_timeout: config.transport.collection_timeout(),
            max_attempts: config.transport.max_attempts,
            retry_delay: config.transport.retry_delay(),
            ..Self::default()
        }
    }
}

/// Builder for transport client config
#[derive(Default)]
pub struct TransportClientConfigBuilder {
    config: TransportClientConfig,
}

impl TransportClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the export path prefix
    pub fn export_path(mut self, path: impl Into<String>) -> Self {
        self.config.export_path = path.into();
        self
    }

    /// Set the login path
    pub fn auth_path(mut self, path: impl Into<String>) -> Self {
        self.config.auth_path = path.into();
        self
    }

    /// Set both request timeouts
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.page_timeout = timeout;
        self.config.collection_timeout = timeout;
        self
    }

    /// Set the retry policy
    pub fn retry(mut self, max_attempts: u32, delay: Duration) -> Self {
        self.config.max_attempts = max_attempts;
        self.config.retry_delay = delay;
        self
    }

    /// Build the config
    pub fn build(self) -> TransportClientConfig {
        self.config
    }
}

/// HTTP client for the source's export API
pub struct TransportClient {
    client: Client,
    config: TransportClientConfig,
    base_url: Url,
}

impl TransportClient {
    /// Create a transport client
    pub fn with_config(config: TransportClientConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(Error::missing_field("source.base_url"));
        }
        let base_url = Url::parse(&config.base_url)?;

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    /// Log in to the source, producing the credential for this run
    pub async fn authenticate(&self, uid: &str, password: &str) -> Result<SessionCredential> {
        let url = self.url_for(&self.config.auth_path)?;
        auth::login(
            &self.client,
            url.as_str(),
            uid,
            password,
            self.config.collection_timeout,
        )
        .await
    }

    /// Fetch one page of a paginated collection
    pub async fn fetch_page(
        &self,
        session: &SessionCredential,
        entity: EntityType,
        page: u32,
        per_page: u32,
    ) -> Result<ExportPage> {
        let mut url = self.export_url(entity)?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("per_page", &per_page.to_string());

        let body = self
            .get_json(session, url, self.config.page_timeout)
            .await?;
        ExportPage::from_body(entity, &body)
    }

    /// Fetch a whole collection in one request
    pub async fn fetch_collection(
        &self,
        session: &SessionCredential,
        entity: EntityType,
    ) -> Result<Vec<Record>> {
        let url = self.export_url(entity)?;
        let body = self
            .get_json(session, url, self.config.collection_timeout)
            .await?;
        Ok(ExportPage::from_body(entity, &body)?.records)
    }

    /// Export endpoint for an entity type
    pub fn export_url(&self, entity: EntityType) -> Result<Url> {
        let prefix = self.config.export_path.trim_end_matches('/');
        self.url_for(&format!("{prefix}/{}", entity.as_str()))
    }

    fn url_for(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// GET a JSON body, retrying transient failures with a fixed delay
    async fn get_json(
        &self,
        session: &SessionCredential,
        url: Url,
        timeout: Duration,
    ) -> Result<Value> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.get_json_once(session, url.clone(), timeout).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    warn!(
                        "{e} for {url}, attempt {attempt}/{max_attempts}, retrying in {:?}",
                        self.config.retry_delay
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                    attempt += 1;
                }
                Err(e) if e.is_transient() => {
                    return Err(Error::transient(format!(
                        "{e} (gave up after {max_attempts} attempts)"
                    )));
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_json_once(
        &self,
        session: &SessionCredential,
        url: Url,
        timeout: Duration,
    ) -> Result<Value> {
        let req = session.apply(self.client.get(url.clone()).timeout(timeout));

        let response = match req.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Err(Error::transient("Request timed out"));
            }
            Err(e) => return Err(Error::terminal(None, format!("Request failed: {e}"))),
        };

        let status = response.status().as_u16();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) if e.is_timeout() => return Err(Error::transient("Request timed out")),
            Err(e) => return Err(Error::terminal(Some(status), format!("Failed to read body: {e}"))),
        };

        if !(200..300).contains(&status) {
            let message = status_message(status, &text);
            if is_transient_status(status) {
                return Err(Error::transient(message));
            }
            return Err(Error::terminal(Some(status), message));
        }

        debug!("GET {url} -> {status}");
        serde_json::from_str(&text).map_err(|e| {
            Error::terminal(Some(status), format!("Malformed response body: {e}"))
        })
    }
}

#[async_trait]
impl ExportSource for TransportClient {
    async fn fetch_page(
        &self,
        session: &SessionCredential,
        entity: EntityType,
        page: u32,
        per_page: u32,
    ) -> Result<ExportPage> {
        TransportClient::fetch_page(self, session, entity, page, per_page).await
    }

    async fn fetch_collection(
        &self,
        session: &SessionCredential,
        entity: EntityType,
    ) -> Result<Vec<Record>> {
        TransportClient::fetch_collection(self, session, entity).await
    }
}

impl std::fmt::Debug for TransportClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// `HTTP <status>` plus the body's `message` field, or a body excerpt
pub(crate) fn status_message(status: u16, body: &str) -> String {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| truncate(body, 100).to_string());

    if detail.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {detail}")
    }
}
