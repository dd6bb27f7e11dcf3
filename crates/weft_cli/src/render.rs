//! Plain-text renderings of a history.

use console::style;
use std::fmt::Write;
use weft_history::CorrelatedEvent;
use weft_timeline::{Timeline, Viewport};
use weft_tree::{Forest, UnitStatus};

/// Colour switch for terminal output
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    /// Colours when stdout supports them
    pub fn detect() -> Self {
        Self {
            enabled: console::colors_enabled(),
        }
    }

    /// No colours
    pub fn plain() -> Self {
        Self { enabled: false }
    }

    fn status(self, status: UnitStatus, text: &str) -> String {
        let styled = style(text).force_styling(self.enabled);
        match status {
            UnitStatus::Running => styled.yellow(),
            UnitStatus::Completed => styled.green(),
            UnitStatus::Failed | UnitStatus::TimedOut | UnitStatus::Terminated => styled.red(),
            UnitStatus::Canceled => styled.dim(),
            UnitStatus::Fired => styled.cyan(),
            UnitStatus::ContinuedAsNew => styled.magenta(),
            UnitStatus::Signaled => styled.blue(),
        }
        .to_string()
    }

    fn dim(self, text: &str) -> String {
        style(text).force_styling(self.enabled).dim().to_string()
    }

    fn bold(self, text: &str) -> String {
        style(text).force_styling(self.enabled).bold().to_string()
    }
}

fn fit(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count <= width {
        return format!("{text}{}", " ".repeat(width - count));
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    if width > 0 {
        cut.push('~');
    }
    cut
}

/// Indented unit tree; collapsed units hide their children
pub fn tree(forest: &Forest, palette: Palette) -> String {
    if forest.is_empty() {
        return "No events in history\n".to_string();
    }
    let mut out = String::new();
    for (depth, unit) in forest.visible() {
        let glyph = match (unit.has_children(), unit.collapsed) {
            (false, _) => "  ",
            (true, false) => "▾ ",
            (true, true) => "▸ ",
        };
        let attempts = if unit.attempts > 1 {
            format!(" ×{}", unit.attempts)
        } else {
            String::new()
        };
        let _ = writeln!(
            out,
            "{}{glyph}{}{attempts}  {}  {}  {}",
            "  ".repeat(depth),
            palette.bold(&unit.display_name),
            palette.status(unit.status, unit.status.label()),
            unit.duration(),
            palette.dim(&format!("[{} {} events]", unit.key, unit.member_events.len())),
        );
    }
    out
}

/// ASCII Gantt chart: one axis row, then one row per lane
pub fn timeline(timeline: &Timeline, viewport: &Viewport, label_width: usize, palette: Palette) -> String {
    let Some(window) = timeline.window() else {
        return "No events in history\n".to_string();
    };
    let width = usize::from(viewport.width());
    let mut out = String::new();

    let mut axis = vec![' '; width];
    let mut free_from = 0;
    for tick in weft_timeline::ticks(window, viewport) {
        let at = (tick.x.floor() as usize).min(width.saturating_sub(1));
        axis[at] = '|';
        let end = at + 1 + tick.label.chars().count();
        if at + 1 >= free_from && end <= width {
            for (i, ch) in tick.label.chars().enumerate() {
                axis[at + 1 + i] = ch;
            }
            free_from = end + 1;
        }
    }
    let _ = writeln!(
        out,
        "{} {}",
        " ".repeat(label_width),
        palette.dim(&axis.into_iter().collect::<String>())
    );

    let layout = timeline.layout(viewport);
    for (lane, bar) in timeline.lanes().iter().zip(&layout.bars) {
        let mut row = vec![' '; width];
        if bar.visible {
            let from = (bar.start.floor() as usize).min(width.saturating_sub(1));
            let to = (bar.end.ceil() as usize).clamp(from + 1, width);
            let glyph = if bar.running { '░' } else { '█' };
            row[from..to].fill(glyph);
        }
        let bars: String = row.into_iter().collect();
        let attempts = if lane.attempts > 1 {
            format!(" ×{}", lane.attempts)
        } else {
            String::new()
        };
        let _ = writeln!(
            out,
            "{} {}  {}",
            fit(&format!("{}{attempts}", lane.label), label_width),
            palette.status(lane.status, &bars),
            palette.dim(&lane.duration().to_string()),
        );
    }
    out
}

/// One line per event with its classification and back-references
pub fn events(events: &[CorrelatedEvent], palette: Palette) -> String {
    if events.is_empty() {
        return "No events in history\n".to_string();
    }
    let kind_width = events.iter().map(|e| e.kind_name().len()).max().unwrap_or(0);
    let mut out = String::new();
    for event in events {
        let refs: Vec<String> = [
            ("sched", event.refs.scheduled),
            ("start", event.refs.started),
            ("init", event.refs.initiated),
            ("task", event.refs.task_completed),
        ]
        .into_iter()
        .filter_map(|(name, id)| id.map(|id| format!("{name}={id}")))
        .collect();
        let unit = event
            .unit_kind()
            .map_or_else(|| "-".to_string(), |kind| kind.to_string());
        let _ = writeln!(
            out,
            "{:>5}  {}  {}  {:<13} {}",
            event.id(),
            palette.dim(&event.timestamp().to_string()),
            fit(event.kind_name(), kind_width),
            unit,
            refs.join(" "),
        );
    }
    out
}
