//! Error types and the subtree degradation policy.
//!
//! Only mandatory-path failures (root selection, root schema resolution,
//! root entity lookup) abort a run. Everything below the root degrades the
//! affected branch to an empty collection, with a warning at the point of
//! failure.

use infrasnap_core::error::{SourceError, SourceErrorKind};
use std::fmt;

/// Categorised error kinds for the assembly layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectErrorKind {
    /// Zero or ambiguous root entities for the selection predicate
    Selection,
    /// Metadata query failed or returned nothing usable
    Schema,
    /// A REST call failed; carries the HTTP status when one was received
    Transport(Option<u16>),
    /// A snapshot file could not be written
    Write,
    /// Generic
    Other,
}

/// Assembly-layer error with a kind + human-readable message.
#[derive(Debug, Clone)]
pub struct CollectError {
    pub kind: CollectErrorKind,
    pub message: String,
}

impl CollectError {
    pub fn new(kind: CollectErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
        }
    }

    pub fn selection(msg: impl Into<String>) -> Self {
        Self::new(CollectErrorKind::Selection, msg)
    }

    pub fn write(msg: impl Into<String>) -> Self {
        Self::new(CollectErrorKind::Write, msg)
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::new(CollectErrorKind::Other, msg)
    }
}

impl fmt::Display for CollectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

impl std::error::Error for CollectError {}

impl From<SourceError> for CollectError {
    fn from(e: SourceError) -> Self {
        let kind = match e.kind {
            SourceErrorKind::Schema => CollectErrorKind::Schema,
            SourceErrorKind::Transport(code) => CollectErrorKind::Transport(Some(code)),
            SourceErrorKind::Connection | SourceErrorKind::Timeout => {
                CollectErrorKind::Transport(None)
            }
            _ => CollectErrorKind::Other,
        };
        Self::new(kind, e.to_string())
    }
}

/// Convenience alias.
pub type CollectResult<T> = Result<T, CollectError>;

/// Absorb a failed child fetch into an empty branch ("incomplete subtree").
pub(crate) fn degrade<T>(
    branch: &str,
    result: Result<Vec<T>, SourceError>,
) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!("incomplete subtree: {branch} could not be fetched ({e}); emitting an empty collection");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_error_kinds_map_across() {
        let schema: CollectError = SourceError::schema("nope").into();
        assert_eq!(schema.kind, CollectErrorKind::Schema);

        let transport: CollectError = SourceError::transport(502, "bad gateway", "").into();
        assert_eq!(transport.kind, CollectErrorKind::Transport(Some(502)));

        let conn: CollectError = SourceError::connection("refused").into();
        assert_eq!(conn.kind, CollectErrorKind::Transport(None));
    }

    #[test]
    fn degrade_turns_failures_into_empty_collections() {
        let ok: Vec<u8> = degrade("hosts", Ok(vec![1, 2]));
        assert_eq!(ok, vec![1, 2]);

        let empty: Vec<u8> = degrade("hosts", Err(SourceError::transport(500, "boom", "")));
        assert!(empty.is_empty());
    }
}
