//! Session login and credential
//!
//! The source authenticates with `{uid, password}` and answers with a session
//! cookie; some deployments also return a `token` field in the body. Both are
//! captured so the credential works against either flavour.

use crate::error::{Error, Result};
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Header the source uses to distinguish API clients from browsers
pub const ORIGIN_HEADER: (&str, &str) = ("X-Origin", "client");

/// Session credential reused for every request of one run
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionCredential {
    /// `Cookie` header value (`name=value; name2=value2`)
    cookie: Option<String>,
    /// Bearer token returned in the login body
    token: Option<String>,
}

impl SessionCredential {
    /// Credential carrying session cookies
    pub fn from_cookie(cookie: impl Into<String>) -> Self {
        Self {
            cookie: Some(cookie.into()),
            token: None,
        }
    }

    /// Credential carrying a bearer token
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            cookie: None,
            token: Some(token.into()),
        }
    }

    /// Cookie header value, if any
    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    /// Bearer token, if any
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// True when the credential carries nothing to authenticate with
    pub fn is_empty(&self) -> bool {
        self.cookie.is_none() && self.token.is_none()
    }

    /// Attach the credential to a request
    pub fn apply(&self, req: RequestBuilder) -> RequestBuilder {
        let mut req = req.header(ORIGIN_HEADER.0, ORIGIN_HEADER.1);
        if let Some(cookie) = &self.cookie {
            req = req.header(COOKIE, cookie.as_str());
        }
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req
    }
}

impl std::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredential")
            .field("has_cookie", &self.cookie.is_some())
            .field("has_token", &self.token.is_some())
            .finish()
    }
}

#[derive(Serialize)]
struct LoginBody<'a> {
    uid: &'a str,
    password: &'a str,
}

/// Log in to the source and return the session credential
pub async fn login(
    client: &Client,
    login_url: &str,
    uid: &str,
    password: &str,
    timeout: Duration,
) -> Result<SessionCredential> {
    let response = client
        .post(login_url)
        .header(ORIGIN_HEADER.0, ORIGIN_HEADER.1)
        .json(&LoginBody { uid, password })
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| Error::auth(format!("Login request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::auth(format!(
            "Login request failed with status {}: {}",
            status.as_u16(),
            truncate(&body, 100)
        )));
    }

    let cookies: Vec<String> = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(|pair| pair.trim().to_string())
        .filter(|pair| !pair.is_empty())
        .collect();

    let body = response.text().await.unwrap_or_default();
    let token = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("token").and_then(Value::as_str).map(String::from));

    let credential = SessionCredential {
        cookie: (!cookies.is_empty()).then(|| cookies.join("; ")),
        token,
    };

    if credential.is_empty() {
        return Err(Error::auth(
            "Login succeeded but returned no session cookie or token",
        ));
    }

    debug!("Authenticated as {uid}: {credential:?}");
    Ok(credential)
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
