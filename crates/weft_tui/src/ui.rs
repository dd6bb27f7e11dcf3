//! TUI app: the run loop, key handling and pane state.

use crate::config::ViewerConfig;
use crate::input::{InputEvent, InputHandler};
use crate::layout::{PaneLayout, Panes};
use crate::refresh::{FetchResult, Refresher};
use crate::selection::Selection;
use crate::view::{DetailsView, GanttView, TreeView, View};
use ratatui::{
    Frame, Terminal,
    backend::{Backend, CrosstermBackend},
    crossterm::{
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    layout::Rect,
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph},
};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use weft_core::{Timestamp, WorkflowExecution};
use weft_history::{CorrelatedEvent, HistoryProvider};
use weft_tree::{Forest, UnitKey, build_forest};

/// Pane with keyboard focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// Unit tree
    Tree,
    /// Gantt timeline
    Gantt,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Self::Tree => Self::Gantt,
            Self::Gantt => Self::Tree,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StatusLine {
    text: String,
    error: bool,
}

impl StatusLine {
    fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            error: false,
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            error: true,
        }
    }
}

/// TUI application state
pub struct TuiApp {
    config: ViewerConfig,
    forest: Forest,
    tree: TreeView,
    gantt: GanttView,
    details: DetailsView,
    tree_selection: Selection,
    lane_selection: Selection,
    focus: Focus,
    input: InputHandler,
    layout: PaneLayout,
    refresher: Refresher,
    show_help: bool,
    should_quit: bool,
    status: StatusLine,
}

impl TuiApp {
    /// Create the app; fetches run on `runtime`
    #[must_use]
    pub fn new(
        config: ViewerConfig,
        provider: Arc<dyn HistoryProvider>,
        execution: WorkflowExecution,
        runtime: Handle,
    ) -> Self {
        let refresher = Refresher::new(runtime, provider, execution, config.fetch_timeout());
        Self {
            gantt: GanttView::new(config.label_width),
            input: InputHandler::new().with_timeout(config.tick_rate()),
            config,
            forest: Forest::default(),
            tree: TreeView::new(),
            details: DetailsView::default(),
            tree_selection: Selection::default(),
            lane_selection: Selection::default(),
            focus: Focus::Tree,
            layout: PaneLayout::new(),
            refresher,
            show_help: false,
            should_quit: false,
            status: StatusLine::info("Loading"),
        }
    }

    /// Run the TUI until the user quits
    ///
    /// # Errors
    ///
    /// Returns error if terminal setup or drawing fails
    pub fn run(&mut self) -> Result<(), TuiError> {
        enable_raw_mode().map_err(|e| TuiError::Terminal(e.to_string()))?;
        execute!(std::io::stdout(), EnterAlternateScreen)
            .map_err(|e| TuiError::Terminal(e.to_string()))?;

        let backend = CrosstermBackend::new(std::io::stdout());
        let mut terminal = Terminal::new(backend).map_err(|e| TuiError::Terminal(e.to_string()))?;

        self.refresh();
        let result = self.run_inner(&mut terminal);
        self.refresher.cancel();

        disable_raw_mode().map_err(|e| TuiError::Terminal(e.to_string()))?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)
            .map_err(|e| TuiError::Terminal(e.to_string()))?;
        terminal
            .show_cursor()
            .map_err(|e| TuiError::Terminal(e.to_string()))?;

        result
    }

    fn run_inner<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), TuiError> {
        let tick_rate = self.config.tick_rate();
        let mut last_tick = Instant::now();

        loop {
            terminal
                .draw(|f| self.draw(f))
                .map_err(|e| TuiError::Render(e.to_string()))?;

            if let Some(event) = self
                .input
                .next_event()
                .map_err(|e| TuiError::Io(e.to_string()))?
            {
                self.handle_event(event);
            }

            if last_tick.elapsed() >= tick_rate {
                self.tick();
                last_tick = Instant::now();
            }

            if self.should_quit {
                return Ok(());
            }
        }
    }

    /// Drain finished fetches
    pub fn tick(&mut self) {
        while let Some(result) = self.refresher.poll() {
            self.apply_fetch(result);
        }
    }

    /// Start a fetch, superseding any in-flight one
    pub fn refresh(&mut self) {
        let generation = self.refresher.start();
        self.status = StatusLine::info(format!("Fetching {} (#{generation})", self.refresher.source()));
    }

    /// Apply a fetch result. Failures only touch the status line.
    pub fn apply_fetch(&mut self, result: FetchResult) {
        match result.outcome {
            Ok(events) => {
                let count = events.len();
                self.load_events(events);
                self.status = StatusLine::info(format!(
                    "{count} events, {} units from {}",
                    self.forest.unit_count(),
                    self.refresher.source()
                ));
            }
            Err(err) if err.is_reportable() => {
                tracing::warn!(generation = result.generation, error = %err, "refresh failed");
                self.status = StatusLine::error(err.to_string());
            }
            Err(_) => {}
        }
    }

    /// Rebuild the forest from a history and re-resolve selections by unit
    pub fn load_events(&mut self, events: Vec<CorrelatedEvent>) {
        self.forest = build_forest(events, &self.config.forest_options());
        self.gantt.load(&self.forest, Timestamp::now());
        let kept = self.lane_selection.resolve(self.gantt.keys());
        self.rebuild_tree();
        tracing::debug!(
            units = self.forest.unit_count(),
            lanes = self.gantt.item_count(),
            lane_kept = kept,
            "views rebuilt"
        );
    }

    fn rebuild_tree(&mut self) {
        self.tree = TreeView::from_forest(&self.forest);
        self.tree_selection.resolve(self.tree.keys());
        self.refresh_details();
    }

    fn refresh_details(&mut self) {
        let unit = self.active_key().and_then(|key| self.forest.find(&key));
        self.details = DetailsView::for_unit(unit);
    }

    fn active_key(&self) -> Option<UnitKey> {
        match self.focus {
            Focus::Tree => self.tree_selection.key(),
            Focus::Gantt => self.lane_selection.key(),
        }
    }

    /// Unit under the cursor of the focused pane
    #[must_use]
    pub fn selected(&self) -> Option<UnitKey> {
        self.active_key()
    }

    /// Focused pane
    #[must_use]
    pub fn focus(&self) -> Focus {
        self.focus
    }

    /// The current forest
    #[must_use]
    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// Status line text and whether it reports an error
    #[must_use]
    pub fn status(&self) -> (&str, bool) {
        (&self.status.text, self.status.error)
    }

    /// Whether the app has been asked to quit
    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    fn move_selection(&mut self, apply: impl Fn(&mut Selection, &[UnitKey])) {
        match self.focus {
            Focus::Tree => {
                apply(&mut self.tree_selection, self.tree.keys());
                if let Some(key) = self.tree_selection.key() {
                    self.lane_selection.select(self.gantt.keys(), key);
                }
            }
            Focus::Gantt => {
                apply(&mut self.lane_selection, self.gantt.keys());
                if let Some(key) = self.lane_selection.key() {
                    self.tree_selection.select(self.tree.keys(), key);
                }
            }
        }
        self.refresh_details();
    }

    fn toggle_selected(&mut self) {
        let Some(key) = self.tree_selection.key() else {
            return;
        };
        if self.focus == Focus::Tree && self.forest.toggle_collapsed(&key) {
            self.rebuild_tree();
        }
    }

    /// Apply one input event
    pub fn handle_event(&mut self, event: InputEvent) {
        if self.show_help {
            self.show_help = false;
            if event == InputEvent::Quit {
                self.quit();
            }
            return;
        }
        match event {
            InputEvent::Quit => self.quit(),
            InputEvent::Help => self.show_help = true,
            InputEvent::Down => self.move_selection(|s, rows| s.move_by(rows, 1)),
            InputEvent::Up => self.move_selection(|s, rows| s.move_by(rows, -1)),
            InputEvent::GoTop => self.move_selection(|s, rows| s.first(rows)),
            InputEvent::GoBottom => self.move_selection(|s, rows| s.last(rows)),
            InputEvent::Toggle => self.toggle_selected(),
            InputEvent::FocusNext => {
                self.focus = self.focus.next();
                self.refresh_details();
            }
            InputEvent::Left => self.gantt.viewport_mut().scroll_by(-self.config.scroll_step),
            InputEvent::Right => self.gantt.viewport_mut().scroll_by(self.config.scroll_step),
            InputEvent::ZoomIn => self.gantt.viewport_mut().zoom_in(self.config.zoom_step),
            InputEvent::ZoomOut => self.gantt.viewport_mut().zoom_out(self.config.zoom_step),
            InputEvent::ResetView => self.gantt.viewport_mut().reset(),
            InputEvent::Refresh => self.refresh(),
            InputEvent::Unknown => {}
        }
    }

    fn quit(&mut self) {
        self.refresher.cancel();
        self.should_quit = true;
    }

    fn draw(&mut self, f: &mut Frame) {
        let area = f.area();
        let panes = self.layout.calculate(area);
        self.tree_selection.ensure_visible(inner_height(panes.tree));
        // the first gantt row is the axis
        self.lane_selection
            .ensure_visible(inner_height(panes.gantt).saturating_sub(1));

        self.render_panes(f, panes);
        self.render_status(f, panes.status);
        if self.show_help {
            render_help_screen(f, area);
        }
    }

    fn render_panes(&self, f: &mut Frame, panes: Panes) {
        self.tree
            .render(f, panes.tree, &self.tree_selection, self.focus == Focus::Tree);
        self.gantt
            .render(f, panes.gantt, &self.lane_selection, self.focus == Focus::Gantt);
        self.details
            .render(f, panes.details, &Selection::default(), false);
    }

    fn render_status(&self, f: &mut Frame, area: Rect) {
        let style = if self.status.error {
            Style::default().fg(Color::White).bg(Color::Red)
        } else {
            Style::default().fg(Color::Black).bg(Color::Gray)
        };
        let fetching = if self.refresher.is_fetching() { " ⟳" } else { "" };
        let selected = self
            .active_key()
            .map_or_else(|| "-".to_string(), |key| key.to_string());
        let text = format!(" {}{fetching} | {selected} | ? help", self.status.text);
        f.render_widget(Paragraph::new(text).style(style), area);
    }
}

fn inner_height(area: Rect) -> usize {
    usize::from(area.height.saturating_sub(2))
}

fn render_help_screen(f: &mut Frame, area: Rect) {
    let width = area.width.min(44);
    let height = area.height.min(20);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };

    let help_text = vec![
        Line::from("Navigation:").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from("  j/↓ k/↑  - Move down / up"),
        Line::from("  g / G    - First / last row"),
        Line::from("  Tab      - Switch tree / timeline"),
        Line::from("  Enter    - Collapse or expand unit"),
        Line::from(""),
        Line::from("Timeline:").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from("  + / -    - Zoom in / out"),
        Line::from("  h / l    - Scroll left / right"),
        Line::from("  0        - Reset zoom and scroll"),
        Line::from(""),
        Line::from("Actions:").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from("  r        - Refresh history"),
        Line::from("  q        - Quit"),
        Line::from("  ?        - Close this help"),
    ];

    let help = Paragraph::new(help_text).block(Block::default().borders(Borders::ALL).title(" Help "));
    f.render_widget(Clear, popup);
    f.render_widget(help, popup);
}

/// TUI errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum TuiError {
    /// Terminal error
    #[error("terminal error: {0}")]
    Terminal(String),
    /// IO error
    #[error("io error: {0}")]
    Io(String),
    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
    /// Render error
    #[error("render error: {0}")]
    Render(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use std::time::Duration;
    use weft_history::{EventRecord, FetchError, HistoryError, StaticProvider};

    fn ts(ms: i64) -> Timestamp {
        Timestamp::from_unix_millis(1_700_000_000_000 + ms)
    }

    fn history() -> Vec<CorrelatedEvent> {
        vec![
            EventRecord::new(1, "WorkflowExecutionStarted", ts(0))
                .workflow("OrderFlow")
                .into_event(),
            EventRecord::new(2, "WorkflowTaskScheduled", ts(100)).into_event(),
            EventRecord::new(3, "WorkflowTaskStarted", ts(200))
                .scheduled(2)
                .into_event(),
            EventRecord::new(4, "WorkflowTaskCompleted", ts(300))
                .scheduled(2)
                .started(3)
                .into_event(),
            EventRecord::new(5, "ActivityTaskScheduled", ts(1_000))
                .activity("a1", "Charge")
                .task_completed(4)
                .into_event(),
            EventRecord::new(6, "TimerStarted", ts(1_000))
                .timer("t1")
                .task_completed(4)
                .into_event(),
            EventRecord::new(7, "ActivityTaskStarted", ts(1_100))
                .scheduled(5)
                .into_event(),
            EventRecord::new(8, "ActivityTaskCompleted", ts(4_000))
                .scheduled(5)
                .started(7)
                .into_event(),
        ]
    }

    fn app(handle: Handle) -> TuiApp {
        TuiApp::new(
            ViewerConfig::default(),
            Arc::new(StaticProvider::new(history())),
            WorkflowExecution::latest("wf"),
            handle,
        )
    }

    fn draw(app: &mut TuiApp, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content
            .chunks(usize::from(buffer.area.width))
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_refresh_loads_forest() {
        let mut app = app(Handle::current());
        app.refresh();
        let result = app.refresher.next().await.unwrap();
        app.apply_fetch(result);

        assert_eq!(app.forest().event_count(), 8);
        let (status, error) = app.status();
        assert!(status.starts_with("8 events"));
        assert!(!error);
        assert!(app.selected().is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_fetch_keeps_forest() {
        let mut app = app(Handle::current());
        app.load_events(history());
        let before = app.forest().clone();

        app.apply_fetch(FetchResult {
            generation: 2,
            outcome: Err(FetchError::Provider(HistoryError::Transport("connection reset".into()))),
        });
        assert_eq!(app.forest(), &before);
        let (status, error) = app.status();
        assert!(status.contains("connection reset"));
        assert!(error);

        // cancellation is silent
        app.load_events(history());
        app.status = StatusLine::info("ok");
        app.apply_fetch(FetchResult {
            generation: 3,
            outcome: Err(FetchError::Cancelled),
        });
        assert_eq!(app.status(), ("ok", false));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_selection_survives_rebuild() {
        let mut app = app(Handle::current());
        app.load_events(history());
        app.handle_event(InputEvent::GoBottom);
        let selected = app.selected().unwrap();

        let mut longer = history();
        longer.push(
            EventRecord::new(9, "TimerFired", ts(5_000))
                .started(6)
                .timer("t1")
                .into_event(),
        );
        app.load_events(longer);
        assert_eq!(app.selected(), Some(selected));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_toggle_and_focus() {
        let mut app = app(Handle::current());
        app.load_events(history());
        let rows = app.tree.item_count();
        assert!(rows >= 2);

        // find a unit with children and collapse it
        let parent = app
            .tree
            .rows()
            .iter()
            .position(|row| row.expander != crate::view::Expander::Leaf)
            .unwrap();
        app.handle_event(InputEvent::GoTop);
        for _ in 0..parent {
            app.handle_event(InputEvent::Down);
        }
        app.handle_event(InputEvent::Toggle);
        assert!(app.tree.item_count() < rows);
        app.handle_event(InputEvent::Toggle);
        assert_eq!(app.tree.item_count(), rows);

        app.handle_event(InputEvent::FocusNext);
        assert_eq!(app.focus(), Focus::Gantt);
        app.handle_event(InputEvent::GoTop);
        assert_eq!(app.selected(), app.gantt.keys().first().copied());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_zoom_keys_drive_viewport() {
        let mut app = app(Handle::current());
        app.load_events(history());
        app.handle_event(InputEvent::ZoomIn);
        assert_eq!(app.gantt.viewport().zoom(), 1.25);
        app.handle_event(InputEvent::Right);
        assert_eq!(app.gantt.viewport().scroll(), 4.0);
        app.handle_event(InputEvent::ResetView);
        assert_eq!(app.gantt.viewport().zoom(), 1.0);
        assert_eq!(app.gantt.viewport().scroll(), 0.0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_draw_full_screen() {
        let mut app = app(Handle::current());
        let screen = draw(&mut app, 100, 30);
        assert!(screen.contains("Loading history..."));

        app.load_events(history());
        let screen = draw(&mut app, 100, 30);
        assert!(screen.contains("OrderFlow"));
        assert!(screen.contains("Charge"));
        assert!(screen.contains("Timer t1"));
        assert!(screen.contains("? help"));

        app.handle_event(InputEvent::Help);
        let screen = draw(&mut app, 100, 30);
        assert!(screen.contains("Help"));
        assert!(screen.contains("Refresh history"));
        app.handle_event(InputEvent::Help);
        assert!(!app.show_help);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_empty_history_state() {
        let mut app = app(Handle::current());
        app.load_events(Vec::new());
        let screen = draw(&mut app, 80, 20);
        assert!(screen.contains("No events in history"));
        assert!(app.selected().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_quit_cancels_fetch() {
        let provider = StaticProvider::new(history()).with_delay(Duration::from_secs(10));
        let mut app = TuiApp::new(
            ViewerConfig::default(),
            Arc::new(provider),
            WorkflowExecution::latest("wf"),
            Handle::current(),
        );
        app.refresh();
        assert!(app.refresher.is_fetching());
        app.handle_event(InputEvent::Quit);
        assert!(app.should_quit());
        assert!(!app.refresher.is_fetching());
    }

    #[test]
    fn test_tui_error_messages() {
        let err = TuiError::Terminal("test".to_string());
        assert!(err.to_string().contains("terminal"));
        assert!(TuiError::Config("bad".into()).to_string().contains("config"));
    }
}
