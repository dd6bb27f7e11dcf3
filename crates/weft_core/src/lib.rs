//! weft core types
//!
//! Pure types shared by every weft crate: event ids, workflow identity,
//! wall-clock timestamps and durations. No I/O lives here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod id;
pub mod time;

// Re-exports
pub use error::CoreError;
pub use id::{EventId, RunId, WorkflowExecution, WorkflowId};
pub use time::{Duration, Timestamp};
