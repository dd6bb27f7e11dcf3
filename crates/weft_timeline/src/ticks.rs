//! Axis ticks at human-friendly offsets.

use crate::viewport::Viewport;
use crate::window::TimeWindow;
use serde::Serialize;
use weft_core::Duration;

/// One axis tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    /// Column of the tick
    pub x: f64,
    /// Offset from the window start
    pub offset: Duration,
    /// Human label of the offset
    pub label: String,
}

// (below, round up to)
const GRANULARITY: [(Duration, Duration); 5] = [
    (Duration::from_millis(100), Duration::from_millis(10)),
    // Ends at 900 ms, not 1 s: from 900 ms up, offsets round to whole seconds (950 ms -> 1 s)
    (Duration::from_millis(900), Duration::from_millis(50)),
    (Duration::from_mins(1), Duration::from_secs(1)),
    (Duration::from_hours(1), Duration::from_mins(1)),
    (Duration::from_hours(24), Duration::from_mins(10)),
];
const COARSEST: Duration = Duration::from_hours(1);

/// Number of ticks for a pane of `columns` width
#[must_use]
pub const fn tick_count(columns: u16) -> usize {
    if columns < 40 {
        2
    } else if columns < 80 {
        4
    } else {
        6
    }
}

/// Round an offset up to the graduated granularity for its magnitude
#[must_use]
pub fn round_tick_offset(offset: Duration) -> Duration {
    let granularity = GRANULARITY
        .iter()
        .find(|(below, _)| offset < *below)
        .map_or(COARSEST, |(_, step)| *step);
    offset.round_up_to(granularity)
}

fn label(offset: Duration) -> String {
    if offset.is_zero() {
        "0s".to_string()
    } else {
        offset.human()
    }
}

/// Evenly spaced ticks across the viewport, each snapped to a round offset.
///
/// A tick whose rounded offset lands past the right edge is dropped, and
/// ticks that round to the same offset collapse into one.
#[must_use]
pub fn ticks(window: &TimeWindow, viewport: &Viewport) -> Vec<Tick> {
    let count = tick_count(viewport.width());
    let width = viewport.visible_width();
    let span = window.span().as_nanos_f64();
    let mut out: Vec<Tick> = Vec::with_capacity(count);

    for i in 0..count {
        let column = width * i as f64 / (count - 1) as f64;
        let raw = Duration::from_nanos_f64(viewport.unproject(column) * span);
        let offset = round_tick_offset(raw);
        let x = viewport.project(window.fraction(offset));
        if x > width + 1e-6 {
            continue;
        }
        if out.last().is_some_and(|tick| tick.offset == offset) {
            continue;
        }
        out.push(Tick {
            x: viewport.clamp(x),
            offset,
            label: label(offset),
        });
    }
    out
}
