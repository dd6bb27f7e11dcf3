//! Lane bars projected onto viewport columns.

use crate::lane::{Lane, collect_lanes};
use crate::ticks::{Tick, ticks};
use crate::viewport::Viewport;
use crate::window::TimeWindow;
use serde::Serialize;
use weft_core::Timestamp;
use weft_tree::{Forest, UnitKey};

/// Horizontal extent of one lane's bar, in columns
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bar {
    /// Left edge, within `[0, visible_width]`
    pub start: f64,
    /// Right edge, within `[start, visible_width]`
    pub end: f64,
    /// Open-ended; `end` is the right edge of the viewport
    pub running: bool,
    /// Whether any part of the unclamped bar falls inside the viewport
    pub visible: bool,
}

impl Bar {
    /// Width in columns, at least one when the viewport is
    #[must_use]
    pub fn width(&self) -> f64 {
        self.end - self.start
    }
}

/// Layout of every lane under one viewport
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineLayout {
    /// One bar per lane, in lane order
    pub bars: Vec<Bar>,
    /// Axis ticks
    pub ticks: Vec<Tick>,
}

/// Lanes of a forest with the window they are drawn in
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Timeline {
    lanes: Vec<Lane>,
    window: Option<TimeWindow>,
}

impl Timeline {
    /// Timeline over explicit lanes; `now` closes running lanes' window
    #[must_use]
    pub fn new(lanes: Vec<Lane>, now: Timestamp) -> Self {
        let window = TimeWindow::from_lanes(&lanes, now);
        if let Some(w) = &window {
            tracing::trace!(lanes = lanes.len(), span = %w.span(), "timeline window");
        }
        Self { lanes, window }
    }

    /// Timeline over the leaf-level units of a forest
    #[must_use]
    pub fn from_forest(forest: &Forest, now: Timestamp) -> Self {
        Self::new(collect_lanes(forest), now)
    }

    /// Lanes, sorted by start
    #[must_use]
    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    /// Window, `None` when there are no lanes
    #[must_use]
    pub fn window(&self) -> Option<&TimeWindow> {
        self.window.as_ref()
    }

    /// Whether there is nothing to draw
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Number of lanes
    #[must_use]
    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    /// Lane index of a unit
    #[must_use]
    pub fn position_of(&self, key: &UnitKey) -> Option<usize> {
        self.lanes.iter().position(|lane| lane.key == *key)
    }

    /// Bar of the lane at `index`
    #[must_use]
    pub fn bar(&self, index: usize, viewport: &Viewport) -> Option<Bar> {
        let lane = self.lanes.get(index)?;
        let window = self.window.as_ref()?;
        Some(project_lane(lane, window, viewport))
    }

    /// Bars and ticks of every lane; empty when there is no window
    #[must_use]
    pub fn layout(&self, viewport: &Viewport) -> TimelineLayout {
        let Some(window) = self.window.as_ref() else {
            return TimelineLayout {
                bars: Vec::new(),
                ticks: Vec::new(),
            };
        };
        TimelineLayout {
            bars: self
                .lanes
                .iter()
                .map(|lane| project_lane(lane, window, viewport))
                .collect(),
            ticks: ticks(window, viewport),
        }
    }
}

fn column_of(at: Timestamp, window: &TimeWindow, viewport: &Viewport) -> f64 {
    viewport.project(window.fraction(window.offset_of(at)))
}

fn project_lane(lane: &Lane, window: &TimeWindow, viewport: &Viewport) -> Bar {
    let width = viewport.visible_width();
    let raw_start = column_of(lane.start, window, viewport);
    let raw_end = lane
        .end
        .map_or(width, |end| column_of(end, window, viewport));

    let mut start = viewport.clamp(raw_start);
    let mut end = viewport.clamp(raw_end).max(start);
    if end - start < 1.0 {
        end = (start + 1.0).min(width);
        start = (end - 1.0).max(0.0);
    }

    Bar {
        start,
        end,
        running: lane.is_running(),
        visible: raw_end >= 0.0 && raw_start <= width,
    }
}
