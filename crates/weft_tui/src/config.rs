//! Viewer configuration.

use crate::ui::TuiError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use weft_tree::ForestOptions;

/// Viewer configuration, loaded from JSON; every field has a default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Bound on one history fetch, in seconds
    pub fetch_timeout_secs: u64,
    /// Render/input tick in milliseconds
    pub tick_rate_ms: u64,
    /// Tree depth from which units with children start collapsed
    pub expand_depth: usize,
    /// Columns reserved for lane labels in the Gantt pane
    pub label_width: u16,
    /// Relative zoom change per key press
    pub zoom_step: f64,
    /// Columns scrolled per key press
    pub scroll_step: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 30,
            tick_rate_ms: 250,
            expand_depth: 2,
            label_width: 28,
            zoom_step: 0.25,
            scroll_step: 4.0,
        }
    }
}

impl ViewerConfig {
    /// Load from a JSON file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not a valid config
    pub fn load(path: &Path) -> Result<Self, TuiError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| TuiError::Config(format!("{}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| TuiError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the viewer cannot run with
    ///
    /// # Errors
    ///
    /// Returns error naming the first invalid field
    pub fn validate(&self) -> Result<(), TuiError> {
        if self.fetch_timeout_secs == 0 {
            return Err(TuiError::Config("fetch_timeout_secs must be positive".into()));
        }
        if self.tick_rate_ms == 0 {
            return Err(TuiError::Config("tick_rate_ms must be positive".into()));
        }
        if !(self.zoom_step.is_finite() && self.zoom_step > 0.0) {
            return Err(TuiError::Config("zoom_step must be a positive number".into()));
        }
        if !(self.scroll_step.is_finite() && self.scroll_step > 0.0) {
            return Err(TuiError::Config("scroll_step must be a positive number".into()));
        }
        Ok(())
    }

    /// Fetch bound
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Tick rate
    #[must_use]
    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }

    /// Options for rebuilding the forest
    #[must_use]
    pub fn forest_options(&self) -> ForestOptions {
        ForestOptions {
            expand_depth: self.expand_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ViewerConfig::default();
        assert_eq!(config.fetch_timeout(), Duration::from_secs(30));
        assert_eq!(config.tick_rate(), Duration::from_millis(250));
        assert_eq!(config.forest_options().expand_depth, 2);
        assert_eq!(config.label_width, 28);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"fetch_timeout_secs": 5, "label_width": 20}}"#).unwrap();
        let config = ViewerConfig::load(file.path()).unwrap();
        assert_eq!(config.fetch_timeout_secs, 5);
        assert_eq!(config.label_width, 20);
        assert_eq!(config.zoom_step, 0.25);
    }

    #[test]
    fn test_load_rejects_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"tick_rate_ms": 0}}"#).unwrap();
        assert!(matches!(ViewerConfig::load(file.path()), Err(TuiError::Config(_))));

        let mut garbage = tempfile::NamedTempFile::new().unwrap();
        write!(garbage, "not json").unwrap();
        assert!(ViewerConfig::load(garbage.path()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ViewerConfig::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(err.to_string().contains("nope.json"));
    }
}
