//! weft tree
//!
//! Rebuilds the flat event log of a run into a forest of [`LogicalUnit`]s.
//! One pass correlates back-references, groups events into units, folds
//! retried work into a single unit and derives status and timing.
//!
//! The pipeline is pure and synchronous. Every call to [`build_forest`]
//! produces a fresh forest; nothing is updated incrementally.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod correlate;
pub mod forest;
mod group;
mod retry;
mod status;
pub mod unit;

pub use correlate::{Correlation, EventArena, Resolution, correlate};
pub use forest::{Forest, ForestOptions, Walk, build_forest};
pub use unit::{LogicalUnit, UnitDuration, UnitKey, UnitStatus};
