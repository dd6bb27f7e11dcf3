//! weft TUI
//!
//! Terminal viewer for one workflow run: the unit tree, a Gantt timeline of
//! its leaf units and the member events of the selection. Histories are
//! fetched off the render thread and rebuilt from scratch on every refresh.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod input;
pub mod layout;
pub mod refresh;
pub mod selection;
pub mod ui;
pub mod view;

pub use config::ViewerConfig;
pub use input::{InputEvent, InputHandler, KeyBinding, KeyCombo};
pub use layout::{PaneLayout, Panes};
pub use refresh::{FetchResult, Refresher};
pub use selection::Selection;
pub use ui::{Focus, TuiApp, TuiError};
pub use view::{DetailsView, GanttView, TreeView, View};
