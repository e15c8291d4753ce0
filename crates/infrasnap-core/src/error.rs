//! Error type for the query-side data sources.

use std::fmt;

/// Categorised error kinds for inventory-source queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// Server unreachable, TLS failure, or similar
    Connection,
    /// Authentication failed (401) or token missing
    Auth,
    /// Metadata query failed or returned no usable attributes
    Schema,
    /// HTTP request returned a non-success status code
    Transport(u16),
    /// JSON parse / deserialization error
    Parse,
    /// Request timed out
    Timeout,
    /// Generic
    Other,
}

/// Source error carrying a kind, a message, and (for transport errors)
/// the raw response body for diagnostics.
#[derive(Debug, Clone)]
pub struct SourceError {
    pub kind: SourceErrorKind,
    pub message: String,
    pub body: Option<String>,
}

impl SourceError {
    pub fn new(kind: SourceErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            body: None,
        }
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Connection, msg)
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Auth, msg)
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Schema, msg)
    }

    pub fn transport(status: u16, msg: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Transport(status),
            message: msg.into(),
            body: Some(body.into()),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Parse, msg)
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Timeout, msg)
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Other, msg)
    }

    /// HTTP status code, when this is a transport error.
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            SourceErrorKind::Transport(code) => Some(code),
            _ => None,
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)?;
        if let Some(ref body) = self.body {
            if !body.is_empty() {
                write!(f, " — response body: {}", &body[..body.len().min(500)])?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for SourceError {}

impl From<serde_json::Error> for SourceError {
    fn from(e: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {e}"))
    }
}

/// Convenience alias.
pub type SourceResult<T> = Result<T, SourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_carries_status_and_body() {
        let e = SourceError::transport(404, "entity query failed", "{\"error\":\"not found\"}");
        assert_eq!(e.status(), Some(404));
        let shown = e.to_string();
        assert!(shown.contains("entity query failed"));
        assert!(shown.contains("not found"));
    }

    #[test]
    fn non_transport_has_no_status() {
        assert_eq!(SourceError::schema("no attributes").status(), None);
    }
}
