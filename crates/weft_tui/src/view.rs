//! Panes: the unit tree, the Gantt timeline and the event details.

use crate::selection::Selection;
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};
use weft_core::Timestamp;
use weft_timeline::{Timeline, Viewport, candlestick};
use weft_tree::{Forest, LogicalUnit, UnitDuration, UnitKey, UnitStatus};

/// Placeholder before the first fetch completes
pub const LOADING: &str = "Loading history...";
/// Placeholder for a history with no events
pub const EMPTY: &str = "No events in history";

/// Trait for TUI panes
pub trait View {
    /// Render the pane
    fn render(&self, f: &mut Frame, area: Rect, selection: &Selection, focused: bool);

    /// Number of selectable rows
    fn item_count(&self) -> usize;
}

/// Foreground colour of a status
#[must_use]
pub fn status_color(status: UnitStatus) -> Color {
    match status {
        UnitStatus::Running => Color::Yellow,
        UnitStatus::Completed => Color::Green,
        UnitStatus::Failed | UnitStatus::TimedOut | UnitStatus::Terminated => Color::Red,
        UnitStatus::Canceled => Color::Gray,
        UnitStatus::Fired => Color::Cyan,
        UnitStatus::ContinuedAsNew => Color::Magenta,
        UnitStatus::Signaled => Color::Blue,
    }
}

fn pane_block(title: String, focused: bool) -> Block<'static> {
    let border = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border)
}

fn selected_style(focused: bool) -> Style {
    if focused {
        Style::default().bg(Color::Blue).add_modifier(Modifier::BOLD)
    } else {
        Style::default().bg(Color::DarkGray)
    }
}

fn render_placeholder(f: &mut Frame, area: Rect, block: Block<'static>, text: &'static str) {
    let paragraph = Paragraph::new(text)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray))
        .block(block);
    f.render_widget(paragraph, area);
}

/// Cut `text` to at most `max` columns, ending in an ellipsis when cut
#[must_use]
pub fn truncate(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    let budget = max.saturating_sub(1);
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        out.push(ch);
        used += w;
    }
    if max > 0 {
        out.push('…');
    }
    out
}

fn pad(text: &str, width: usize) -> String {
    let cut = truncate(text, width);
    let fill = width.saturating_sub(cut.width());
    format!("{cut}{}", " ".repeat(fill))
}

/// Expand state of a tree row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expander {
    /// No children
    Leaf,
    /// Children shown
    Expanded,
    /// Children hidden
    Collapsed,
}

impl Expander {
    fn glyph(self) -> &'static str {
        match self {
            Self::Leaf => "  ",
            Self::Expanded => "▾ ",
            Self::Collapsed => "▸ ",
        }
    }
}

/// One visible row of the tree
#[derive(Debug, Clone, PartialEq)]
pub struct TreeRow {
    /// Unit shown
    pub key: UnitKey,
    /// Nesting depth
    pub depth: usize,
    /// Expand state
    pub expander: Expander,
    /// Unit name
    pub label: String,
    /// Unit status
    pub status: UnitStatus,
    /// Attempts
    pub attempts: u32,
    /// Span or open
    pub duration: UnitDuration,
}

impl TreeRow {
    fn from_unit(depth: usize, unit: &LogicalUnit) -> Self {
        let expander = match (unit.has_children(), unit.collapsed) {
            (false, _) => Expander::Leaf,
            (true, false) => Expander::Expanded,
            (true, true) => Expander::Collapsed,
        };
        Self {
            key: unit.key,
            depth,
            expander,
            label: unit.display_name.clone(),
            status: unit.status,
            attempts: unit.attempts,
            duration: unit.duration(),
        }
    }

    fn line(&self, width: usize) -> Line<'static> {
        let prefix = format!("{}{}", "  ".repeat(self.depth), self.expander.glyph());
        let attempts = if self.attempts > 1 {
            format!(" ×{}", self.attempts)
        } else {
            String::new()
        };
        let duration = format!(" {}", self.duration);
        let fixed = prefix.width() + attempts.width() + duration.width();
        let label = pad(&self.label, width.saturating_sub(fixed));

        Line::from(vec![
            Span::raw(prefix),
            Span::styled(label, Style::default().fg(status_color(self.status))),
            Span::styled(attempts, Style::default().fg(Color::Yellow)),
            Span::styled(duration, Style::default().fg(Color::DarkGray)),
        ])
    }
}

/// Tree of units, honoring collapsed flags
#[derive(Debug, Clone)]
pub struct TreeView {
    rows: Vec<TreeRow>,
    keys: Vec<UnitKey>,
    placeholder: &'static str,
}

impl TreeView {
    /// Tree with nothing loaded yet
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            keys: Vec::new(),
            placeholder: LOADING,
        }
    }

    /// Visible rows of a forest
    #[must_use]
    pub fn from_forest(forest: &Forest) -> Self {
        let rows: Vec<TreeRow> = forest
            .visible()
            .map(|(depth, unit)| TreeRow::from_unit(depth, unit))
            .collect();
        let keys = rows.iter().map(|row| row.key).collect();
        Self {
            rows,
            keys,
            placeholder: EMPTY,
        }
    }

    /// Rows, in display order
    #[must_use]
    pub fn rows(&self) -> &[TreeRow] {
        &self.rows
    }

    /// Row keys, in display order
    #[must_use]
    pub fn keys(&self) -> &[UnitKey] {
        &self.keys
    }
}

impl Default for TreeView {
    fn default() -> Self {
        Self::new()
    }
}

impl View for TreeView {
    fn render(&self, f: &mut Frame, area: Rect, selection: &Selection, focused: bool) {
        let block = pane_block(format!(" Units ({}) ", self.rows.len()), focused);
        if self.rows.is_empty() {
            render_placeholder(f, area, block, self.placeholder);
            return;
        }
        let inner = block.inner(area);
        let width = usize::from(inner.width);
        let lines: Vec<Line<'static>> = self
            .rows
            .iter()
            .enumerate()
            .skip(selection.scroll())
            .take(usize::from(inner.height))
            .map(|(i, row)| {
                let line = row.line(width);
                if i == selection.line() {
                    line.style(selected_style(focused))
                } else {
                    line
                }
            })
            .collect();
        f.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn item_count(&self) -> usize {
        self.rows.len()
    }
}

/// One row of cells, merged into styled spans on output
#[derive(Debug, Clone)]
struct Canvas {
    cells: Vec<(char, Style)>,
}

impl Canvas {
    fn new(width: usize) -> Self {
        Self {
            cells: vec![(' ', Style::default()); width],
        }
    }

    fn len(&self) -> usize {
        self.cells.len()
    }

    /// Cell index of a column coordinate
    fn cell(&self, x: f64) -> usize {
        (x.max(0.0).floor() as usize).min(self.len().saturating_sub(1))
    }

    fn fill(&mut self, from: usize, to: usize, ch: char, style: Style) {
        let to = to.min(self.len());
        for cell in self.cells.iter_mut().take(to).skip(from) {
            *cell = (ch, style);
        }
    }

    fn put(&mut self, at: usize, ch: char, style: Style) {
        if let Some(cell) = self.cells.get_mut(at) {
            *cell = (ch, style);
        }
    }

    /// Write text from column `x`, clipped at the right edge
    fn text(&mut self, x: f64, text: &str, style: Style) {
        if x < 0.0 {
            return;
        }
        let start = x.floor() as usize;
        for (offset, ch) in text.chars().enumerate() {
            self.put(start + offset, ch, style);
        }
    }

    fn is_blank(&self, from: usize, to: usize) -> bool {
        self.cells
            .iter()
            .take(to.min(self.len()))
            .skip(from)
            .all(|(ch, _)| *ch == ' ')
    }

    fn into_spans(self) -> Vec<Span<'static>> {
        let mut spans: Vec<Span<'static>> = Vec::new();
        let mut run = String::new();
        let mut run_style = Style::default();
        for (ch, style) in self.cells {
            if style != run_style && !run.is_empty() {
                spans.push(Span::styled(std::mem::take(&mut run), run_style));
            }
            run_style = style;
            run.push(ch);
        }
        if !run.is_empty() {
            spans.push(Span::styled(run, run_style));
        }
        spans
    }
}

/// Gantt chart of leaf units
#[derive(Debug, Clone)]
pub struct GanttView {
    timeline: Timeline,
    keys: Vec<UnitKey>,
    viewport: Viewport,
    label_width: u16,
    placeholder: &'static str,
}

impl GanttView {
    /// Empty chart with nothing loaded yet
    #[must_use]
    pub fn new(label_width: u16) -> Self {
        Self {
            timeline: Timeline::default(),
            keys: Vec::new(),
            viewport: Viewport::default(),
            label_width,
            placeholder: LOADING,
        }
    }

    /// Replace the lanes, keeping zoom and scroll
    pub fn load(&mut self, forest: &Forest, now: Timestamp) {
        self.timeline = Timeline::from_forest(forest, now);
        self.keys = self.timeline.lanes().iter().map(|lane| lane.key).collect();
        self.placeholder = EMPTY;
    }

    /// Lane keys, in display order
    #[must_use]
    pub fn keys(&self) -> &[UnitKey] {
        &self.keys
    }

    /// The lanes and their window
    #[must_use]
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Zoom and scroll
    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Zoom and scroll, for key handling
    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    fn label_columns(&self, inner: Rect) -> usize {
        usize::from(self.label_width.min(inner.width / 2))
    }

    /// Bar area width of the pane for a given area
    #[must_use]
    pub fn bar_width(&self, area: Rect) -> u16 {
        let inner = Block::default().borders(Borders::ALL).inner(area);
        let labels = self.label_columns(inner) as u16;
        inner.width.saturating_sub(labels + 1)
    }

    fn axis_line(&self, labels: usize, viewport: &Viewport) -> Line<'static> {
        let mut canvas = Canvas::new(usize::from(viewport.width()));
        let tick_style = Style::default().fg(Color::DarkGray);
        let mut free_from = 0;
        if let Some(window) = self.timeline.window() {
            for tick in weft_timeline::ticks(window, viewport) {
                let at = canvas.cell(tick.x);
                canvas.put(at, '┬', tick_style);
                let text_end = at + 1 + tick.label.chars().count();
                if at + 1 >= free_from && text_end <= canvas.len() && canvas.is_blank(at + 1, text_end) {
                    canvas.text((at + 1) as f64, &tick.label, tick_style);
                    free_from = text_end + 1;
                }
            }
        }
        let mut spans = vec![Span::raw(" ".repeat(labels + 1))];
        spans.extend(canvas.into_spans());
        Line::from(spans)
    }

    fn lane_line(&self, index: usize, labels: usize, viewport: &Viewport, selected: Option<bool>) -> Option<Line<'static>> {
        let lane = self.timeline.lanes().get(index)?;
        let bar = self.timeline.bar(index, viewport)?;
        let color = status_color(lane.status);
        let mut canvas = Canvas::new(usize::from(viewport.width()));

        if bar.visible {
            let from = canvas.cell(bar.start);
            let to = (bar.end.ceil() as usize).max(from + 1);
            let glyph = if bar.running { '▒' } else { '█' };
            canvas.fill(from, to, glyph, Style::default().fg(color));
        } else if bar.end <= 0.0 {
            canvas.put(0, '‹', Style::default().fg(color));
        } else {
            canvas.put(canvas.len().saturating_sub(1), '›', Style::default().fg(color));
        }

        if let Some(candle) = selected.and_then(|_| candlestick(&self.timeline, index, viewport)) {
            let marker = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
            if let Some((from, to)) = candle.wick {
                let from = canvas.cell(from);
                let to = canvas.cell(to);
                canvas.fill(from, to, '─', Style::default().fg(Color::DarkGray));
            }
            canvas.put(canvas.cell(candle.start_marker), '├', marker);
            if let Some(end) = candle.end_marker {
                let last = (end.ceil() as usize).max(1) - 1;
                canvas.put(last.max(canvas.cell(candle.start_marker)), '┤', marker);
            }
            canvas.text(candle.start_label.x, &candle.start_label.text, marker);
            if let Some(label) = &candle.duration_label {
                let style = if candle.duration_inside() {
                    Style::default().fg(Color::Black).bg(color)
                } else {
                    Style::default().fg(color)
                };
                canvas.text(label.x, &label.text, style);
            }
            if let Some(label) = &candle.running_label {
                canvas.text(label.x, &label.text, Style::default().fg(Color::Yellow));
            }
        }

        let attempts = if lane.attempts > 1 {
            format!(" ×{}", lane.attempts)
        } else {
            String::new()
        };
        let name = pad(&format!("{}{attempts}", lane.label), labels);
        let label_style = match selected {
            Some(focused) => selected_style(focused),
            None => Style::default(),
        };
        let mut spans = vec![Span::styled(name, label_style), Span::raw(" ")];
        spans.extend(canvas.into_spans());
        Some(Line::from(spans))
    }
}

impl View for GanttView {
    fn render(&self, f: &mut Frame, area: Rect, selection: &Selection, focused: bool) {
        let title = format!(" Timeline ×{:.2} ", self.viewport.zoom());
        let block = pane_block(title, focused);
        if self.timeline.is_empty() {
            render_placeholder(f, area, block, self.placeholder);
            return;
        }
        let inner = block.inner(area);
        let labels = self.label_columns(inner);
        let Ok(viewport) = self.viewport.resized(self.bar_width(area)) else {
            f.render_widget(block, area);
            return;
        };

        let mut lines = vec![self.axis_line(labels, &viewport)];
        let rows = usize::from(inner.height).saturating_sub(1);
        lines.extend(
            (selection.scroll()..self.timeline.len())
                .take(rows)
                .filter_map(|i| {
                    let selected = (i == selection.line()).then_some(focused);
                    self.lane_line(i, labels, &viewport, selected)
                }),
        );
        f.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn item_count(&self) -> usize {
        self.timeline.len()
    }
}

/// One member event of the selected unit
#[derive(Debug, Clone, PartialEq)]
pub struct DetailRow {
    /// Event id
    pub id: i64,
    /// Kind tag as recorded
    pub kind: String,
    /// Offset from the unit's start, `+` or `-` prefixed
    pub offset: String,
    /// Attempt, failure or result
    pub note: String,
    /// Whether the note is a failure
    pub failure: bool,
}

/// Member events of the selected unit
#[derive(Debug, Clone, Default)]
pub struct DetailsView {
    title: String,
    rows: Vec<DetailRow>,
}

impl DetailsView {
    /// Details of a unit, or an empty pane
    #[must_use]
    pub fn for_unit(unit: Option<&LogicalUnit>) -> Self {
        let Some(unit) = unit else {
            return Self::default();
        };
        let rows = unit
            .member_events
            .iter()
            .map(|event| {
                let ts = event.timestamp();
                let offset = if ts < unit.start_time {
                    format!("-{}", unit.start_time.duration_since(&ts))
                } else {
                    format!("+{}", ts.duration_since(&unit.start_time))
                };
                let (note, failure) = match (&event.failure, &event.result, event.attempt) {
                    (Some(failure), _, _) => (failure.clone(), true),
                    (None, Some(result), _) => (result.clone(), false),
                    (None, None, Some(attempt)) => (format!("attempt {attempt}"), false),
                    (None, None, None) => (String::new(), false),
                };
                DetailRow {
                    id: event.id().as_i64(),
                    kind: event.kind_name().to_string(),
                    offset,
                    note,
                    failure,
                }
            })
            .collect();
        Self {
            title: format!(
                " {} · {} · {} events ",
                unit.display_name,
                unit.status,
                unit.member_events.len()
            ),
            rows,
        }
    }

    /// Rows, ordered by event id
    #[must_use]
    pub fn rows(&self) -> &[DetailRow] {
        &self.rows
    }
}

impl View for DetailsView {
    fn render(&self, f: &mut Frame, area: Rect, _selection: &Selection, focused: bool) {
        let title = if self.title.is_empty() {
            " Events ".to_string()
        } else {
            self.title.clone()
        };
        let block = pane_block(title, focused);
        let kind_width = self.rows.iter().map(|r| r.kind.width()).max().unwrap_or(0);
        let lines: Vec<Line<'static>> = self
            .rows
            .iter()
            .map(|row| {
                let note_style = if row.failure {
                    Style::default().fg(Color::Red)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                Line::from(vec![
                    Span::styled(format!("#{:<5}", row.id), Style::default().fg(Color::Cyan)),
                    Span::raw(format!("{} ", pad(&row.kind, kind_width))),
                    Span::raw(format!("{:>8} ", row.offset)),
                    Span::styled(row.note.clone(), note_style),
                ])
            })
            .collect();
        f.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn item_count(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{Terminal, backend::TestBackend};
    use weft_history::{CorrelatedEvent, EventRecord};
    use weft_tree::{ForestOptions, build_forest};

    fn ts(ms: i64) -> Timestamp {
        Timestamp::from_unix_millis(1_700_000_000_000 + ms)
    }

    fn history() -> Vec<CorrelatedEvent> {
        vec![
            EventRecord::new(1, "WorkflowExecutionStarted", ts(0))
                .workflow("OrderFlow")
                .into_event(),
            EventRecord::new(2, "ActivityTaskScheduled", ts(1_000))
                .activity("a1", "Charge")
                .into_event(),
            EventRecord::new(3, "ActivityTaskStarted", ts(1_000))
                .scheduled(2)
                .attempt(1)
                .into_event(),
            EventRecord::new(4, "ActivityTaskFailed", ts(2_000))
                .scheduled(2)
                .started(3)
                .failure("card declined")
                .into_event(),
            EventRecord::new(5, "ActivityTaskScheduled", ts(2_000))
                .activity("a1", "Charge")
                .into_event(),
            EventRecord::new(6, "ActivityTaskStarted", ts(2_000))
                .scheduled(5)
                .attempt(2)
                .into_event(),
            EventRecord::new(7, "ActivityTaskCompleted", ts(91_000))
                .scheduled(5)
                .started(6)
                .into_event(),
        ]
    }

    fn forest() -> Forest {
        build_forest(history(), &ForestOptions::default())
    }

    fn render(view: &dyn View, width: u16, height: u16, selection: &Selection) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal
            .draw(|f| {
                let area = f.area();
                view.render(f, area, selection, true);
            })
            .unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content
            .chunks(usize::from(buffer.area.width))
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Charge", 10), "Charge");
        assert_eq!(truncate("ChargeCard", 6), "Charg…");
        assert_eq!(truncate("日本語テキスト", 5), "日本…");
        assert_eq!(truncate("abc", 0), "");
        assert_eq!(pad("ab", 4), "ab  ");
    }

    #[test]
    fn test_tree_rows_follow_forest() {
        let view = TreeView::from_forest(&forest());
        assert_eq!(view.item_count(), 2);
        let activity = &view.rows()[1];
        assert_eq!(activity.label, "Charge");
        assert_eq!(activity.attempts, 2);
        assert_eq!(activity.status, UnitStatus::Completed);
        assert_eq!(view.keys()[1], activity.key);
    }

    #[test]
    fn test_tree_render_shows_attempts_and_duration() {
        let view = TreeView::from_forest(&forest());
        let mut selection = Selection::default();
        selection.resolve(view.keys());
        let screen = render(&view, 50, 6, &selection);
        assert!(screen.contains("Units (2)"));
        assert!(screen.contains("OrderFlow"));
        assert!(screen.contains("Charge"));
        assert!(screen.contains("×2"));
        assert!(screen.contains("1.5m"));
        assert!(screen.contains("running"));
    }

    #[test]
    fn test_empty_states() {
        let screen = render(&TreeView::new(), 40, 5, &Selection::default());
        assert!(screen.contains(LOADING));

        let empty = build_forest(Vec::new(), &ForestOptions::default());
        let screen = render(&TreeView::from_forest(&empty), 40, 5, &Selection::default());
        assert!(screen.contains(EMPTY));

        let mut gantt = GanttView::new(20);
        gantt.load(&empty, ts(0));
        let screen = render(&gantt, 60, 5, &Selection::default());
        assert!(screen.contains(EMPTY));
    }

    #[test]
    fn test_gantt_renders_axis_and_candlestick() {
        let forest = forest();
        let mut gantt = GanttView::new(16);
        gantt.load(&forest, ts(91_000));
        assert_eq!(gantt.item_count(), 1);

        let mut selection = Selection::default();
        selection.resolve(gantt.keys());
        let screen = render(&gantt, 80, 6, &selection);
        assert!(screen.contains("Timeline ×1.00"));
        assert!(screen.contains("0s"));
        assert!(screen.contains("Charge ×2"));
        assert!(screen.contains('├'));
        assert!(screen.contains("+0s"));
        assert!(screen.contains("1.5m"));
    }

    #[test]
    fn test_gantt_keeps_zoom_across_loads() {
        let forest = forest();
        let mut gantt = GanttView::new(16);
        gantt.viewport_mut().zoom_in(1.0);
        gantt.load(&forest, ts(91_000));
        assert_eq!(gantt.viewport().zoom(), 2.0);
        assert_eq!(gantt.bar_width(Rect::new(0, 0, 60, 10)), 58 - 16 - 1);
    }

    #[test]
    fn test_details_list_member_events() {
        let forest = forest();
        let activity = &forest.roots()[1];
        let details = DetailsView::for_unit(Some(activity));
        assert_eq!(details.item_count(), 6);
        let failed = &details.rows()[2];
        assert_eq!(failed.kind, "ActivityTaskFailed");
        assert_eq!(failed.note, "card declined");
        assert!(failed.failure);
        assert_eq!(failed.offset, "+1s");
        assert_eq!(details.rows()[1].note, "attempt 1");

        let screen = render(&details, 70, 9, &Selection::default());
        assert!(screen.contains("Charge · Completed · 6 events"));
        assert!(screen.contains("card declined"));

        assert_eq!(DetailsView::for_unit(None).item_count(), 0);
    }
}
