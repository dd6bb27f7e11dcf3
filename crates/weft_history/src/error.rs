//! History loading and fetch errors.

/// Errors produced by a history provider
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    /// Reading the history source failed
    #[error("IO error reading {path}: {reason}")]
    Io {
        /// Source path
        path: String,
        /// Underlying error
        reason: String,
    },
    /// The history document is malformed
    #[error("parse error: {reason}")]
    Parse {
        /// Underlying error
        reason: String,
    },
    /// The requested run does not exist
    #[error("workflow not found: {execution}")]
    NotFound {
        /// Requested execution
        execution: String,
    },
    /// Transport failure talking to the service
    ///
    /// Returned by network-backed [`HistoryProvider`](crate::HistoryProvider)
    /// implementations living outside this crate; the file and in-memory
    /// providers never produce it.
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<serde_json::Error> for HistoryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            reason: err.to_string(),
        }
    }
}

/// Errors surfaced by a bounded, cancelable fetch
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The fetch did not finish in time
    #[error("history fetch timed out after {after_ms}ms")]
    Timeout {
        /// Configured bound
        after_ms: u64,
    },
    /// The fetch was cancelled before it finished
    #[error("history fetch cancelled")]
    Cancelled,
    /// The provider failed
    #[error(transparent)]
    Provider(#[from] HistoryError),
}

impl FetchError {
    /// Whether the error should be shown to the user
    #[must_use]
    pub fn is_reportable(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}
