//! Keyboard input and key bindings.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::collections::HashMap;
use std::time::Duration;

/// Action requested from the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Quit the application
    Quit,
    /// Toggle the help overlay
    Help,
    /// Move the selection down
    Down,
    /// Move the selection up
    Up,
    /// Scroll the timeline left
    Left,
    /// Scroll the timeline right
    Right,
    /// Select the first row
    GoTop,
    /// Select the last row
    GoBottom,
    /// Collapse or expand the selected unit
    Toggle,
    /// Move focus to the next pane
    FocusNext,
    /// Zoom the timeline in
    ZoomIn,
    /// Zoom the timeline out
    ZoomOut,
    /// Reset timeline zoom and scroll
    ResetView,
    /// Fetch the history again
    Refresh,
    /// Unbound key
    Unknown,
}

/// Key binding table
#[derive(Debug, Clone)]
pub struct KeyBinding {
    bindings: HashMap<KeyCombo, InputEvent>,
}

/// Key combination (key + modifiers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    /// The key code
    pub code: KeyCode,
    /// Modifiers (ctrl, alt)
    pub modifiers: KeyModifiers,
}

impl KeyCombo {
    /// Create a key combination.
    ///
    /// Shift is dropped for character keys: the character already
    /// carries the case, and terminals disagree on reporting it.
    #[must_use]
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        let modifiers = match code {
            KeyCode::Char(_) => modifiers.difference(KeyModifiers::SHIFT),
            _ => modifiers,
        };
        Self { code, modifiers }
    }

    /// Plain key without modifiers
    #[must_use]
    pub fn key(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::empty())
    }

    /// Ctrl+key combination
    #[must_use]
    pub fn ctrl(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::CONTROL)
    }
}

impl KeyBinding {
    /// Bind a key, replacing any previous binding
    pub fn bind(&mut self, combo: KeyCombo, event: InputEvent) {
        self.bindings.insert(combo, event);
    }

    /// Action bound to a key event
    #[must_use]
    pub fn lookup(&self, key: &KeyEvent) -> InputEvent {
        let combo = KeyCombo::new(key.code, key.modifiers);
        self.bindings
            .get(&combo)
            .copied()
            .unwrap_or(InputEvent::Unknown)
    }
}

impl Default for KeyBinding {
    fn default() -> Self {
        let mut bindings = HashMap::new();

        // Navigation
        bindings.insert(KeyCombo::key(KeyCode::Down), InputEvent::Down);
        bindings.insert(KeyCombo::key(KeyCode::Char('j')), InputEvent::Down);
        bindings.insert(KeyCombo::key(KeyCode::Up), InputEvent::Up);
        bindings.insert(KeyCombo::key(KeyCode::Char('k')), InputEvent::Up);
        bindings.insert(KeyCombo::key(KeyCode::Char('g')), InputEvent::GoTop);
        bindings.insert(KeyCombo::key(KeyCode::Home), InputEvent::GoTop);
        bindings.insert(KeyCombo::key(KeyCode::Char('G')), InputEvent::GoBottom);
        bindings.insert(KeyCombo::key(KeyCode::End), InputEvent::GoBottom);
        bindings.insert(KeyCombo::key(KeyCode::Tab), InputEvent::FocusNext);

        // Timeline
        bindings.insert(KeyCombo::key(KeyCode::Left), InputEvent::Left);
        bindings.insert(KeyCombo::key(KeyCode::Char('h')), InputEvent::Left);
        bindings.insert(KeyCombo::key(KeyCode::Right), InputEvent::Right);
        bindings.insert(KeyCombo::key(KeyCode::Char('l')), InputEvent::Right);
        bindings.insert(KeyCombo::key(KeyCode::Char('+')), InputEvent::ZoomIn);
        bindings.insert(KeyCombo::key(KeyCode::Char('=')), InputEvent::ZoomIn);
        bindings.insert(KeyCombo::key(KeyCode::Char('-')), InputEvent::ZoomOut);
        bindings.insert(KeyCombo::key(KeyCode::Char('0')), InputEvent::ResetView);

        // Actions
        bindings.insert(KeyCombo::key(KeyCode::Enter), InputEvent::Toggle);
        bindings.insert(KeyCombo::key(KeyCode::Char(' ')), InputEvent::Toggle);
        bindings.insert(KeyCombo::key(KeyCode::Char('r')), InputEvent::Refresh);
        bindings.insert(KeyCombo::key(KeyCode::Char('?')), InputEvent::Help);

        // Quit
        bindings.insert(KeyCombo::key(KeyCode::Char('q')), InputEvent::Quit);
        bindings.insert(KeyCombo::key(KeyCode::Esc), InputEvent::Quit);
        bindings.insert(KeyCombo::ctrl(KeyCode::Char('c')), InputEvent::Quit);

        Self { bindings }
    }
}

/// Input handler for terminal events
#[derive(Debug, Clone)]
pub struct InputHandler {
    bindings: KeyBinding,
    timeout: Duration,
}

impl InputHandler {
    /// Handler with the default bindings
    #[must_use]
    pub fn new() -> Self {
        Self::with_bindings(KeyBinding::default())
    }

    /// Handler with custom bindings
    #[must_use]
    pub fn with_bindings(bindings: KeyBinding) -> Self {
        Self {
            bindings,
            timeout: Duration::from_millis(100),
        }
    }

    /// Set poll timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Wait up to the poll timeout for the next key press
    ///
    /// # Errors
    ///
    /// Returns error if reading from the terminal fails
    pub fn next_event(&self) -> Result<Option<InputEvent>, InputError> {
        if crossterm::event::poll(self.timeout)? {
            if let Event::Key(key) = crossterm::event::read()? {
                return Ok(self.map_key(&key));
            }
        }
        Ok(None)
    }

    /// Map a key event; releases and repeats of non-navigation keys are ignored
    #[must_use]
    pub fn map_key(&self, key: &KeyEvent) -> Option<InputEvent> {
        match key.kind {
            KeyEventKind::Release => None,
            KeyEventKind::Repeat => match self.bindings.lookup(key) {
                event @ (InputEvent::Down
                | InputEvent::Up
                | InputEvent::Left
                | InputEvent::Right
                | InputEvent::ZoomIn
                | InputEvent::ZoomOut) => Some(event),
                _ => None,
            },
            KeyEventKind::Press => Some(self.bindings.lookup(key)),
        }
    }
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Input-related errors
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// Terminal read failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_default_bindings() {
        let handler = InputHandler::new();
        let cases = [
            (KeyCode::Char('q'), InputEvent::Quit),
            (KeyCode::Char('j'), InputEvent::Down),
            (KeyCode::Up, InputEvent::Up),
            (KeyCode::Char('h'), InputEvent::Left),
            (KeyCode::Char('l'), InputEvent::Right),
            (KeyCode::Enter, InputEvent::Toggle),
            (KeyCode::Tab, InputEvent::FocusNext),
            (KeyCode::Char('+'), InputEvent::ZoomIn),
            (KeyCode::Char('-'), InputEvent::ZoomOut),
            (KeyCode::Char('0'), InputEvent::ResetView),
            (KeyCode::Char('r'), InputEvent::Refresh),
            (KeyCode::Char('?'), InputEvent::Help),
            (KeyCode::Char('x'), InputEvent::Unknown),
        ];
        for (code, expected) in cases {
            assert_eq!(
                handler.map_key(&press(code, KeyModifiers::empty())),
                Some(expected),
                "{code:?}"
            );
        }
    }

    #[test]
    fn test_ctrl_c_quits() {
        let handler = InputHandler::new();
        assert_eq!(
            handler.map_key(&press(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(InputEvent::Quit)
        );
        assert_eq!(
            handler.map_key(&press(KeyCode::Char('c'), KeyModifiers::empty())),
            Some(InputEvent::Unknown)
        );
    }

    #[test]
    fn test_shifted_characters_match() {
        let handler = InputHandler::new();
        assert_eq!(
            handler.map_key(&press(KeyCode::Char('G'), KeyModifiers::SHIFT)),
            Some(InputEvent::GoBottom)
        );
        assert_eq!(
            handler.map_key(&press(KeyCode::Char('+'), KeyModifiers::SHIFT)),
            Some(InputEvent::ZoomIn)
        );
    }

    #[test]
    fn test_release_and_repeat() {
        let handler = InputHandler::new();
        let mut key = KeyEvent::new_with_kind_and_state(
            KeyCode::Char('j'),
            KeyModifiers::empty(),
            KeyEventKind::Release,
            KeyEventState::empty(),
        );
        assert_eq!(handler.map_key(&key), None);
        key.kind = KeyEventKind::Repeat;
        assert_eq!(handler.map_key(&key), Some(InputEvent::Down));
        key.code = KeyCode::Char('r');
        assert_eq!(handler.map_key(&key), None);
    }

    #[test]
    fn test_custom_binding() {
        let mut bindings = KeyBinding::default();
        bindings.bind(KeyCombo::key(KeyCode::Char('x')), InputEvent::Refresh);
        let handler = InputHandler::with_bindings(bindings);
        assert_eq!(
            handler.map_key(&press(KeyCode::Char('x'), KeyModifiers::empty())),
            Some(InputEvent::Refresh)
        );
    }
}
