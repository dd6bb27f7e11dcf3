//! JSON ingestion of exported histories.

use crate::error::HistoryError;
use crate::event::{CorrelatedEvent, EventRecord};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum HistoryDocument {
    List(Vec<EventRecord>),
    Wrapped { events: Vec<EventRecord> },
    Nested { history: NestedHistory },
}

#[derive(Deserialize)]
struct NestedHistory {
    events: Vec<EventRecord>,
}

impl HistoryDocument {
    fn into_records(self) -> Vec<EventRecord> {
        match self {
            Self::List(records) | Self::Wrapped { events: records } => records,
            Self::Nested { history } => history.events,
        }
    }
}

/// Parse a history document: a bare array, `{"events": [...]}` or
/// `{"history": {"events": [...]}}`.
///
/// Order is preserved exactly as given.
///
/// # Errors
///
/// Returns error if the document is not valid JSON of one of those shapes
pub fn parse_history(json: &str) -> Result<Vec<CorrelatedEvent>, HistoryError> {
    let document: HistoryDocument = serde_json::from_str(json)?;
    Ok(into_events(document))
}

/// Parse a history document from bytes
///
/// # Errors
///
/// Returns error if the document is malformed
pub fn parse_history_slice(bytes: &[u8]) -> Result<Vec<CorrelatedEvent>, HistoryError> {
    let document: HistoryDocument = serde_json::from_slice(bytes)?;
    Ok(into_events(document))
}

fn into_events(document: HistoryDocument) -> Vec<CorrelatedEvent> {
    let events: Vec<CorrelatedEvent> = document
        .into_records()
        .into_iter()
        .map(CorrelatedEvent::from)
        .collect();
    tracing::debug!(count = events.len(), "parsed history document");
    events
}
