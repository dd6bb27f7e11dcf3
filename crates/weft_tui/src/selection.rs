//! Row selection, keyed by unit identity.

use weft_tree::UnitKey;

/// Selected row of a pane and its scroll offset.
///
/// The key is the source of truth; `line` is recomputed from it whenever
/// the rows change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    key: Option<UnitKey>,
    line: usize,
    scroll: usize,
}

impl Selection {
    /// Selected unit
    #[must_use]
    pub fn key(&self) -> Option<UnitKey> {
        self.key
    }

    /// Row of the selected unit
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// First row shown
    #[must_use]
    pub fn scroll(&self) -> usize {
        self.scroll
    }

    /// Re-find the selected unit after the rows changed.
    ///
    /// Returns `true` if the unit is still present. Otherwise the selection
    /// moves to the first row, or clears when there are no rows.
    pub fn resolve(&mut self, rows: &[UnitKey]) -> bool {
        if let Some(line) = self.key.and_then(|key| rows.iter().position(|row| *row == key)) {
            self.line = line;
            return true;
        }
        self.first(rows);
        false
    }

    /// Select a unit by key; leaves the selection alone if it is not a row
    pub fn select(&mut self, rows: &[UnitKey], key: UnitKey) -> bool {
        match rows.iter().position(|row| *row == key) {
            Some(line) => {
                self.key = Some(key);
                self.line = line;
                true
            }
            None => false,
        }
    }

    /// Move by `delta` rows, stopping at either end
    pub fn move_by(&mut self, rows: &[UnitKey], delta: isize) {
        let Some(last) = rows.len().checked_sub(1) else {
            *self = Self::default();
            return;
        };
        let line = self.line.saturating_add_signed(delta).min(last);
        self.line = line;
        self.key = rows.get(line).copied();
    }

    /// Select the first row
    pub fn first(&mut self, rows: &[UnitKey]) {
        self.line = 0;
        self.scroll = 0;
        self.key = rows.first().copied();
    }

    /// Select the last row
    pub fn last(&mut self, rows: &[UnitKey]) {
        self.line = rows.len().saturating_sub(1);
        self.key = rows.last().copied();
    }

    /// Adjust scroll so the selected row is inside a window of `height` rows
    pub fn ensure_visible(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.line < self.scroll {
            self.scroll = self.line;
        } else if self.line >= self.scroll + height {
            self.scroll = self.line + 1 - height;
        }
    }
}
