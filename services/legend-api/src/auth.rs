//! Caller identity resolution.
//!
//! The identity is taken from a trusted header set by an upstream gateway
//! when one is configured. Otherwise Basic credentials are verified against
//! the tenant's login endpoints. Callers without either are anonymous.

use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Username and password from an `Authorization: Basic` header.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Parse Basic credentials from request headers.
pub fn basic_credentials(headers: &HeaderMap) -> Option<Credentials> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some(Credentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

/// Extract the identity from a login endpoint response.
///
/// Accepts `{"identity": "alice"}` and `{"identity": {"username": "alice"}}`.
pub fn identity_from_login_response(body: &Value) -> Option<String> {
    match body.get("identity")? {
        Value::String(name) if !name.is_empty() => Some(name.clone()),
        Value::Object(obj) => obj
            .get("username")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

/// Resolves request identities for one deployment.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    client: reqwest::Client,
    identity_header: Option<String>,
    tenant_header: Option<String>,
}

impl IdentityResolver {
    pub fn new(
        client: reqwest::Client,
        identity_header: Option<String>,
        tenant_header: Option<String>,
    ) -> Self {
        Self {
            client,
            identity_header,
            tenant_header,
        }
    }

    /// Identity of the caller, `None` for anonymous requests.
    ///
    /// Each login endpoint call is bounded by `timeout`.
    #[instrument(skip_all)]
    pub async fn resolve(
        &self,
        headers: &HeaderMap,
        login_urls: &[String],
        timeout: Duration,
    ) -> Option<String> {
        if let Some(name) = self.header_identity(headers) {
            return Some(name);
        }

        if login_urls.is_empty() {
            return None;
        }
        let credentials = basic_credentials(headers)?;

        for url in login_urls {
            match self.verify(url, &credentials, headers, timeout).await {
                Some(identity) => {
                    debug!(identity = %identity, url = %url, "Basic auth verified");
                    return Some(identity);
                }
                None => debug!(url = %url, "Basic auth rejected"),
            }
        }

        warn!(username = %credentials.username, "Basic auth failed, treating caller as anonymous");
        None
    }

    fn header_identity(&self, headers: &HeaderMap) -> Option<String> {
        let name = self.identity_header.as_deref()?;
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    async fn verify(
        &self,
        url: &str,
        credentials: &Credentials,
        headers: &HeaderMap,
        timeout: Duration,
    ) -> Option<String> {
        let mut request = self
            .client
            .post(url)
            .timeout(timeout)
            .form(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ]);

        if let Some(name) = self.tenant_header.as_deref() {
            if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
                request = request.header(name, value);
            }
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "Login endpoint unreachable");
                return None;
            }
        };

        if !response.status().is_success() {
            return None;
        }

        let body: Value = response.json().await.ok()?;
        identity_from_login_response(&body)
    }
}
