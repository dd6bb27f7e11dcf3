//! weft history
//!
//! The event log of one workflow run: raw and correlated events, kind
//! classification, JSON ingestion, and the async boundary through which a
//! history is fetched.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod event;
pub mod ingest;
pub mod kind;
pub mod provider;

pub use error::{FetchError, HistoryError};
pub use event::{CorrelatedEvent, EventRecord, EventRefs, RawEvent};
pub use ingest::{parse_history, parse_history_slice};
pub use kind::{EventKind, Outcome, Phase, UnitKind};
pub use provider::{HistoryProvider, JsonFileProvider, StaticProvider, fetch_history};
