//! Lanes: one Gantt row per leaf-level unit.

use serde::Serialize;
use weft_core::Timestamp;
use weft_history::UnitKind;
use weft_tree::{Forest, LogicalUnit, UnitDuration, UnitKey, UnitStatus};

/// One row of the Gantt view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lane {
    /// Unit the lane draws
    pub key: UnitKey,
    /// Unit kind
    pub kind: UnitKind,
    /// Row label
    pub label: String,
    /// Unit status
    pub status: UnitStatus,
    /// Unit start
    pub start: Timestamp,
    /// Unit end; absent while running
    pub end: Option<Timestamp>,
    /// Attempts of the unit
    pub attempts: u32,
}

impl Lane {
    /// Lane for a unit
    #[must_use]
    pub fn from_unit(unit: &LogicalUnit) -> Self {
        Self {
            key: unit.key,
            kind: unit.kind,
            label: unit.display_name.clone(),
            status: unit.status,
            start: unit.start_time,
            end: unit.end_time,
            attempts: unit.attempts,
        }
    }

    /// Whether the lane is still open
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.end.is_none()
    }

    /// Closed span or open
    #[must_use]
    pub fn duration(&self) -> UnitDuration {
        match self.end {
            Some(end) => UnitDuration::Finished(end.duration_since(&self.start)),
            None => UnitDuration::Running,
        }
    }
}

/// Lanes for every non-structural unit in the forest, sorted by start then anchor
#[must_use]
pub fn collect_lanes(forest: &Forest) -> Vec<Lane> {
    let mut lanes: Vec<Lane> = forest
        .walk()
        .map(|(_, unit)| unit)
        .filter(|unit| !unit.kind.is_structural())
        .map(Lane::from_unit)
        .collect();
    lanes.sort_by_key(|lane| (lane.start, lane.key.anchor));
    lanes
}
