//! History fetch boundary.
//!
//! A [`HistoryProvider`] returns the ordered event sequence of one run. The
//! grouping pipeline never talks to a provider directly; callers go through
//! [`fetch_history`], which bounds the call with a timeout and abandons it
//! when the cancellation token fires.

use crate::error::{FetchError, HistoryError};
use crate::event::CorrelatedEvent;
use crate::ingest::parse_history_slice;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use weft_core::WorkflowExecution;

/// Source of workflow histories
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Fetch the ordered history of one run
    async fn fetch(&self, execution: &WorkflowExecution) -> Result<Vec<CorrelatedEvent>, HistoryError>;

    /// Human description of the source, for status lines
    fn describe(&self) -> String;
}

/// Provider backed by an exported JSON history file
#[derive(Debug, Clone)]
pub struct JsonFileProvider {
    path: PathBuf,
}

impl JsonFileProvider {
    /// Create a provider reading `path` on every fetch
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the export file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl HistoryProvider for JsonFileProvider {
    async fn fetch(&self, execution: &WorkflowExecution) -> Result<Vec<CorrelatedEvent>, HistoryError> {
        tracing::debug!(path = %self.path.display(), %execution, "reading history export");
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HistoryError::NotFound {
                    execution: execution.to_string(),
                }
            } else {
                HistoryError::Io {
                    path: self.path.display().to_string(),
                    reason: e.to_string(),
                }
            }
        })?;
        parse_history_slice(&bytes)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Provider returning a fixed, in-memory history
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    events: Vec<CorrelatedEvent>,
    delay: Option<Duration>,
}

impl StaticProvider {
    /// Create a provider that always returns `events`
    #[must_use]
    pub fn new(events: Vec<CorrelatedEvent>) -> Self {
        Self { events, delay: None }
    }

    /// Wait before answering
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl HistoryProvider for StaticProvider {
    async fn fetch(&self, _execution: &WorkflowExecution) -> Result<Vec<CorrelatedEvent>, HistoryError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.events.clone())
    }

    fn describe(&self) -> String {
        format!("in-memory ({} events)", self.events.len())
    }
}

/// Fetch a history, bounded by `timeout` and abandoned on `cancel`.
///
/// # Errors
///
/// Returns [`FetchError::Timeout`] when the bound elapses,
/// [`FetchError::Cancelled`] when the token fires first, and
/// [`FetchError::Provider`] when the provider fails.
pub async fn fetch_history(
    provider: &dyn HistoryProvider,
    execution: &WorkflowExecution,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<Vec<CorrelatedEvent>, FetchError> {
    tracing::debug!(%execution, timeout_ms = timeout.as_millis() as u64, "fetching history");

    let result = tokio::select! {
        biased;
        () = cancel.cancelled() => Err(FetchError::Cancelled),
        bounded = tokio::time::timeout(timeout, provider.fetch(execution)) => match bounded {
            Err(_) => Err(FetchError::Timeout {
                after_ms: timeout.as_millis() as u64,
            }),
            Ok(fetched) => fetched.map_err(FetchError::from),
        },
    };

    match &result {
        Ok(events) => tracing::debug!(%execution, count = events.len(), "history fetched"),
        Err(FetchError::Cancelled) => tracing::debug!(%execution, "history fetch cancelled"),
        Err(err) => tracing::warn!(%execution, error = %err, "history fetch failed"),
    }
    result
}
