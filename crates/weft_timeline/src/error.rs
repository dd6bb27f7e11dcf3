//! Timeline errors.

/// Errors from invalid viewport input
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimelineError {
    /// The drawable area has no columns
    #[error("timeline width must be at least one column")]
    ZeroWidth,
    /// Zoom factor is not a finite number
    #[error("invalid zoom factor: {0}")]
    InvalidZoom(f64),
    /// Scroll offset is not a finite number
    #[error("invalid scroll offset: {0}")]
    InvalidScroll(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            TimelineError::InvalidZoom(f64::NAN).to_string(),
            "invalid zoom factor: NaN"
        );
        assert!(TimelineError::ZeroWidth.to_string().contains("one column"));
    }
}
