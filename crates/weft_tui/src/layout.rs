//! Screen areas of the viewer.

use ratatui::layout::Rect;

/// Pane layout: tree and timeline side by side, details below, status last
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneLayout {
    tree_percent: u16,
    details_height: u16,
    status_height: u16,
}

/// Calculated pane areas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Panes {
    /// Unit tree
    pub tree: Rect,
    /// Gantt timeline
    pub gantt: Rect,
    /// Member events of the selection
    pub details: Rect,
    /// Status bar
    pub status: Rect,
}

impl PaneLayout {
    /// Default proportions
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree_percent: 40,
            details_height: 9,
            status_height: 1,
        }
    }

    /// Share of the width given to the tree
    #[must_use]
    pub fn with_tree_percent(mut self, percent: u16) -> Self {
        self.tree_percent = percent.min(100);
        self
    }

    /// Height of the details pane
    #[must_use]
    pub fn with_details_height(mut self, height: u16) -> Self {
        self.details_height = height;
        self
    }

    /// Split a terminal area into panes.
    ///
    /// The status bar always gets its row when there is one; the details
    /// pane shrinks first on short terminals.
    #[must_use]
    pub fn calculate(&self, size: Rect) -> Panes {
        let status_height = self.status_height.min(size.height);
        let body_height = size.height - status_height;
        let details_height = self.details_height.min(body_height / 2);
        let top_height = body_height - details_height;

        // percent is at most 100, so this fits back into u16
        let tree_width = (u32::from(size.width) * u32::from(self.tree_percent) / 100) as u16;
        let gantt_width = size.width - tree_width;

        Panes {
            tree: Rect {
                x: size.x,
                y: size.y,
                width: tree_width,
                height: top_height,
            },
            gantt: Rect {
                x: size.x + tree_width,
                y: size.y,
                width: gantt_width,
                height: top_height,
            },
            details: Rect {
                x: size.x,
                y: size.y + top_height,
                width: size.width,
                height: details_height,
            },
            status: Rect {
                x: size.x,
                y: size.y + body_height,
                width: size.width,
                height: status_height,
            },
        }
    }
}

impl Default for PaneLayout {
    fn default() -> Self {
        Self::new()
    }
}
