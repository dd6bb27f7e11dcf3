//! Candlestick cursor for the selected lane.

use crate::layout::Timeline;
use crate::viewport::Viewport;
use serde::Serialize;
use weft_core::Duration;

/// Text placed at a column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Label {
    /// Left column of the text
    pub x: f64,
    /// The text
    pub text: String,
}

impl Label {
    fn new(x: f64, text: impl Into<String>) -> Self {
        Self { x, text: text.into() }
    }

    /// Width in columns
    #[must_use]
    pub fn len(&self) -> f64 {
        self.text.chars().count() as f64
    }

    /// Whether the text is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// First column past the text
    #[must_use]
    pub fn end(&self) -> f64 {
        self.x + self.len()
    }
}

/// Markers and labels drawn over the selected lane
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candlestick {
    /// Lane index
    pub lane: usize,
    /// Column of the start marker
    pub start_marker: f64,
    /// Column of the end marker, absent while running
    pub end_marker: Option<f64>,
    /// Dim span from the previous lane's end to this start
    pub wick: Option<(f64, f64)>,
    /// Start offset, right of the start marker
    pub start_label: Label,
    /// Duration, inside the bar or right of the end marker
    pub duration_label: Option<Label>,
    /// Shown instead of a duration while running
    pub running_label: Option<Label>,
}

impl Candlestick {
    /// Whether the duration label sits inside the bar
    #[must_use]
    pub fn duration_inside(&self) -> bool {
        match (&self.duration_label, self.end_marker) {
            (Some(label), Some(end)) => label.x < end,
            _ => false,
        }
    }
}

fn offset_text(offset: Duration) -> String {
    if offset.is_zero() {
        "+0s".to_string()
    } else {
        format!("+{}", offset.human())
    }
}

/// Candlestick for the lane at `index`, `None` if there is no such lane
#[must_use]
pub fn candlestick(timeline: &Timeline, index: usize, viewport: &Viewport) -> Option<Candlestick> {
    let lane = timeline.lanes().get(index)?;
    let window = timeline.window()?;
    let bar = timeline.bar(index, viewport)?;

    let start_label = Label::new(bar.start + 1.0, offset_text(window.offset_of(lane.start)));

    let wick = index
        .checked_sub(1)
        .and_then(|prev| Some((timeline.lanes().get(prev)?, timeline.bar(prev, viewport)?)))
        .and_then(|(prev_lane, prev_bar)| {
            let gap_in_time = prev_lane.end.is_some_and(|end| end < lane.start);
            (gap_in_time && prev_bar.end < bar.start).then_some((prev_bar.end, bar.start))
        });

    if bar.running {
        let running_label = Label::new(start_label.end() + 1.0, "(running)");
        return Some(Candlestick {
            lane: index,
            start_marker: bar.start,
            end_marker: None,
            wick,
            start_label,
            duration_label: None,
            running_label: Some(running_label),
        });
    }

    let text = lane.duration().finished().unwrap_or_default().human();
    let len = text.chars().count() as f64;
    let centered = bar.start + (bar.width() - len) / 2.0;
    let fits_inside = centered >= start_label.end() + 1.0 && centered + len <= bar.end - 1.0;
    let duration_label = if fits_inside {
        Label::new(centered.floor(), text)
    } else {
        Label::new(bar.end + 1.0, text)
    };

    Some(Candlestick {
        lane: index,
        start_marker: bar.start,
        end_marker: Some(bar.end),
        wick,
        start_label,
        duration_label: Some(duration_label),
        running_label: None,
    })
}
