//! Typed errors for the metrics engine.
//!
//! Commit and issue data is trusted only when it parses; anything else
//! aborts the run. Project-board data is allowed to be wrong.

use std::fmt;
use thiserror::Error;

/// Which input stream an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Commit,
    Issue,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Commit => write!(f, "commit"),
            EventKind::Issue => write!(f, "issue"),
        }
    }
}

#[derive(Debug, Error)]
pub enum MetricsError {
    /// A required field is missing or unparsable. Fatal to the run.
    #[error("malformed {kind} event #{index}: {field}: {reason}")]
    MalformedEvent {
        kind: EventKind,
        index: usize,
        field: String,
        reason: String,
    },

    /// The project board returned something we could not read.
    /// Recovered by counting zero tasks.
    #[error("unreliable source: {0}")]
    UnreliableSource(String),
}

impl MetricsError {
    pub fn malformed(kind: EventKind, index: usize, field: &str, reason: impl Into<String>) -> Self {
        Self::MalformedEvent {
            kind,
            index,
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn unreliable(msg: impl Into<String>) -> Self {
        Self::UnreliableSource(msg.into())
    }
}
