//! HTTP transport for the management REST API.
//!
//! `RestTransport` is the seam between query logic and the wire: the
//! schema resolver and paginated fetcher are written against the trait so
//! they can be driven by an in-memory fixture in tests. `HttpTransport`
//! is the production implementation over reqwest.

use async_trait::async_trait;
use infrasnap_core::error::{SourceError, SourceResult};
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Minimal read-only HTTP capability the API client needs.
#[async_trait]
pub trait RestTransport: Send + Sync {
    /// GET `url` and parse the JSON body.
    async fn get_json(&self, url: &str) -> SourceResult<Value>;

    /// OPTIONS `url` and parse the JSON body (schema introspection).
    async fn options_json(&self, url: &str) -> SourceResult<Value>;
}

/// Token-authenticated reqwest transport.
pub struct HttpTransport {
    client: Client,
    token: String,
}

impl HttpTransport {
    /// Build a transport; `insecure` skips TLS verification for
    /// self-signed lab certificates.
    pub fn new(token: impl Into<String>, insecure: bool, timeout_secs: u64) -> SourceResult<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(insecure)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SourceError::connection(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            token: token.into(),
        })
    }

    async fn request_json(&self, method: Method, url: &str) -> SourceResult<Value> {
        let resp = self
            .client
            .request(method, url)
            .header("accept", "application/json")
            .header("x-auth-token", &self.token)
            .send()
            .await
            .map_err(from_reqwest)?;
        let resp = check_status(resp).await?;
        parse_response(resp).await
    }
}

#[async_trait]
impl RestTransport for HttpTransport {
    async fn get_json(&self, url: &str) -> SourceResult<Value> {
        self.request_json(Method::GET, url).await
    }

    async fn options_json(&self, url: &str) -> SourceResult<Value> {
        self.request_json(Method::OPTIONS, url).await
    }
}

pub(crate) fn from_reqwest(e: reqwest::Error) -> SourceError {
    if e.is_timeout() {
        SourceError::timeout(format!("HTTP timeout: {e}"))
    } else if e.is_connect() {
        SourceError::connection(format!("Connection failed: {e}"))
    } else {
        SourceError::other(format!("HTTP error: {e}"))
    }
}

pub(crate) async fn check_status(resp: Response) -> SourceResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let code = status.as_u16();
    let body = resp.text().await.unwrap_or_default();

    match status {
        StatusCode::UNAUTHORIZED => Err(SourceError::auth(format!(
            "Authentication failed (401): token rejected — {body}"
        ))),
        _ => Err(SourceError::transport(
            code,
            format!("The REST request failed with code {code}"),
            body,
        )),
    }
}

pub(crate) async fn parse_response(resp: Response) -> SourceResult<Value> {
    let text = resp
        .text()
        .await
        .map_err(|e| SourceError::parse(format!("Failed to read response body: {e}")))?;

    if text.is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&text).map_err(|e| {
        SourceError::parse(format!(
            "JSON parse error: {e} — body: {}",
            &text[..text.len().min(500)]
        ))
    })
}
