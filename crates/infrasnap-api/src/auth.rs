//! Token exchange against the management API.
//!
//! `GET /api/auth` with basic auth returns `{"auth_token": "..."}`; the
//! token is then sent as `x-auth-token` on every collection query.

use crate::transport::{check_status, from_reqwest, parse_response};
use infrasnap_core::error::{SourceError, SourceResult};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Obtain an API authentication token for `username`/`password`.
pub async fn fetch_token(
    server: &str,
    username: &str,
    password: &str,
    insecure: bool,
    timeout_secs: u64,
) -> SourceResult<String> {
    let client = Client::builder()
        .danger_accept_invalid_certs(insecure)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| SourceError::connection(format!("Failed to build HTTP client: {e}")))?;

    let url = format!("https://{server}/api/auth");
    let resp = client
        .get(&url)
        .basic_auth(username, Some(password))
        .header("accept", "application/json")
        .send()
        .await
        .map_err(from_reqwest)?;
    let resp = check_status(resp).await?;
    let body = parse_response(resp).await?;
    token_from_body(&body)
}

fn token_from_body(body: &Value) -> SourceResult<String> {
    match body.get("auth_token").and_then(|t| t.as_str()) {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => Err(SourceError::auth(
            "Couldn't get an authentication token from the auth endpoint",
        )),
    }
}
