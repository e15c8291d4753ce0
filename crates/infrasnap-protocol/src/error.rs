//! Error types for the management-protocol crate.
//!
//! Every failure here is non-fatal to a collection run: the enricher logs
//! it and emits the entity without protocol data.

use std::fmt;

/// Categorised error kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolErrorKind {
    /// Endpoint unreachable or TLS failure
    Connection,
    /// Credentials rejected
    Authentication,
    /// Protocol call returned a non-success status
    Api(u16),
    /// Response could not be interpreted
    Parse,
    /// Call timed out
    Timeout,
    /// Generic
    Other,
}

/// Protocol error carrying a kind + human-readable message.
#[derive(Debug, Clone)]
pub struct ProtocolError {
    pub kind: ProtocolErrorKind,
    pub message: String,
}

impl ProtocolError {
    pub fn new(kind: ProtocolErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
        }
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::new(ProtocolErrorKind::Connection, msg)
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::new(ProtocolErrorKind::Authentication, msg)
    }

    pub fn api(status: u16, msg: impl Into<String>) -> Self {
        Self::new(ProtocolErrorKind::Api(status), msg)
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::new(ProtocolErrorKind::Parse, msg)
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(ProtocolErrorKind::Timeout, msg)
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

impl std::error::Error for ProtocolError {}

impl From<reqwest::Error> for ProtocolError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::timeout(format!("protocol call timed out: {e}"))
        } else if e.is_connect() {
            Self::connection(format!("connection failed: {e}"))
        } else {
            Self::new(ProtocolErrorKind::Other, format!("HTTP error: {e}"))
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {e}"))
    }
}

/// Convenience alias.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
