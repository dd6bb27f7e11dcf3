//! The time window every lane is projected into.

use crate::lane::Lane;
use serde::Serialize;
use weft_core::{Duration, Timestamp};

/// Shortest window drawn; shorter spans widen to this
pub const MIN_WINDOW: Duration = Duration::from_mins(1);

/// `[min_start, max_end]` of the drawn lanes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    /// Earliest lane start
    pub min_start: Timestamp,
    /// Latest lane end, or `now` while any lane runs
    pub max_end: Timestamp,
}

impl TimeWindow {
    /// Window over `lanes`, `None` when there are none
    #[must_use]
    pub fn from_lanes(lanes: &[Lane], now: Timestamp) -> Option<Self> {
        let min_start = lanes.iter().map(|lane| lane.start).min()?;
        let any_running = lanes.iter().any(Lane::is_running);
        let latest_end = lanes.iter().filter_map(|lane| lane.end).max();
        let max_end = match (any_running, latest_end) {
            (true, Some(end)) => end.max(now),
            (true, None) => now,
            (false, Some(end)) => end,
            (false, None) => min_start,
        };
        Some(Self::widened(min_start, max_end))
    }

    /// Window over an explicit span, widened to [`MIN_WINDOW`]
    #[must_use]
    pub fn widened(min_start: Timestamp, max_end: Timestamp) -> Self {
        let max_end = if max_end.duration_since(&min_start) < MIN_WINDOW {
            min_start.add(MIN_WINDOW)
        } else {
            max_end
        };
        Self { min_start, max_end }
    }

    /// Length of the window, never shorter than [`MIN_WINDOW`]
    #[must_use]
    pub fn span(&self) -> Duration {
        self.max_end.duration_since(&self.min_start).max(MIN_WINDOW)
    }

    /// Offset of `at` into the window, zero before it starts
    #[must_use]
    pub fn offset_of(&self, at: Timestamp) -> Duration {
        at.duration_since(&self.min_start)
    }

    /// Fraction of the window at `offset`, unclamped
    #[must_use]
    pub fn fraction(&self, offset: Duration) -> f64 {
        offset.as_nanos_f64() / self.span().as_nanos_f64()
    }
}
