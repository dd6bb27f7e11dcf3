//! Visible area, zoom and horizontal scroll of the Gantt pane.

use crate::error::TimelineError;
use serde::Serialize;

/// Smallest zoom factor
pub const MIN_ZOOM: f64 = 0.5;
/// Largest zoom factor
pub const MAX_ZOOM: f64 = 5.0;
/// Width of a viewport that has not been sized yet
pub const DEFAULT_WIDTH: u16 = 80;

/// Columns available for bars, with the consumer's zoom and scroll
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    width: u16,
    zoom: f64,
    scroll: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            zoom: 1.0,
            scroll: 0.0,
        }
    }
}

impl Viewport {
    /// Unzoomed, unscrolled viewport of `width` columns
    ///
    /// # Errors
    ///
    /// Returns [`TimelineError::ZeroWidth`] when `width` is zero
    pub fn new(width: u16) -> Result<Self, TimelineError> {
        if width == 0 {
            return Err(TimelineError::ZeroWidth);
        }
        Ok(Self {
            width,
            zoom: 1.0,
            scroll: 0.0,
        })
    }

    /// Set the zoom factor, clamped to `[MIN_ZOOM, MAX_ZOOM]`
    ///
    /// # Errors
    ///
    /// Returns error if `zoom` is not finite
    pub fn with_zoom(mut self, zoom: f64) -> Result<Self, TimelineError> {
        if !zoom.is_finite() {
            return Err(TimelineError::InvalidZoom(zoom));
        }
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        Ok(self)
    }

    /// Set the scroll offset in columns, clamped to be non-negative
    ///
    /// # Errors
    ///
    /// Returns error if `scroll` is not finite
    pub fn with_scroll(mut self, scroll: f64) -> Result<Self, TimelineError> {
        if !scroll.is_finite() {
            return Err(TimelineError::InvalidScroll(scroll));
        }
        self.scroll = scroll.max(0.0);
        Ok(self)
    }

    /// Same zoom and scroll over a new width
    ///
    /// # Errors
    ///
    /// Returns [`TimelineError::ZeroWidth`] when `width` is zero
    pub fn resized(self, width: u16) -> Result<Self, TimelineError> {
        if width == 0 {
            return Err(TimelineError::ZeroWidth);
        }
        Ok(Self { width, ..self })
    }

    /// Multiply zoom by `1 + step`
    pub fn zoom_in(&mut self, step: f64) {
        self.zoom = (self.zoom * (1.0 + step.abs())).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Divide zoom by `1 + step`
    pub fn zoom_out(&mut self, step: f64) {
        self.zoom = (self.zoom / (1.0 + step.abs())).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Scroll by `delta` columns; never before the window start
    pub fn scroll_by(&mut self, delta: f64) {
        if delta.is_finite() {
            self.scroll = (self.scroll + delta).max(0.0);
        }
    }

    /// Back to zoom 1 and no scroll
    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.scroll = 0.0;
    }

    /// Columns available
    #[must_use]
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Columns available, as a coordinate
    #[must_use]
    pub fn visible_width(&self) -> f64 {
        f64::from(self.width)
    }

    /// Current zoom factor
    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Current scroll offset in columns
    #[must_use]
    pub fn scroll(&self) -> f64 {
        self.scroll
    }

    /// Column of a window fraction, before clamping
    #[must_use]
    pub fn project(&self, fraction: f64) -> f64 {
        fraction * self.visible_width() * self.zoom - self.scroll
    }

    /// Window fraction of a column; inverse of [`Viewport::project`]
    #[must_use]
    pub fn unproject(&self, column: f64) -> f64 {
        (column + self.scroll) / (self.visible_width() * self.zoom)
    }

    /// Clamp a column into `[0, visible_width]`
    #[must_use]
    pub fn clamp(&self, column: f64) -> f64 {
        column.clamp(0.0, self.visible_width())
    }
}
