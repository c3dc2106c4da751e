//! Input snapshots
//!
//! The platform layer folds raw window events into an [`InputTracker`]; the
//! frame lifecycle only ever sees the polled [`KeyboardState`] and
//! [`MouseState`] snapshots.

use std::collections::HashSet;

/// Key codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// Escape key, the exit key of the demo
    Escape,
    /// Space key
    Space,
    /// Enter key
    Enter,
    /// Tab key
    Tab,
    /// Backspace key
    Backspace,
    /// Up arrow
    Up,
    /// Down arrow
    Down,
    /// Left arrow
    Left,
    /// Right arrow
    Right,
    /// Left or right shift
    Shift,
    /// Left or right control
    Control,
    /// Left or right alt
    Alt,
    /// Function key F1..F12
    Function(u8),
    /// Letter key, uppercase ASCII
    Letter(char),
    /// Top-row digit key
    Digit(u8),
}

/// Mouse buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Left mouse button
    Left,
    /// Right mouse button
    Right,
    /// Middle mouse button
    Middle,
    /// Any extra button, numbered from 4
    Other(u8),
}

/// Polled keyboard state: which keys are currently held
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyboardState {
    held: HashSet<KeyCode>,
}

impl KeyboardState {
    /// Whether `key` is held
    pub fn is_down(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    /// Number of held keys
    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    /// Mark a key as held
    pub fn press(&mut self, key: KeyCode) {
        self.held.insert(key);
    }

    /// Mark a key as released
    pub fn release(&mut self, key: KeyCode) {
        self.held.remove(&key);
    }
}

/// Polled pointer state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MouseState {
    /// Cursor position in window coordinates
    pub position: (f64, f64),
    /// Accumulated scroll since the tracker was created
    pub scroll: (f64, f64),
    buttons: HashSet<MouseButton>,
}

impl MouseState {
    /// Whether `button` is held
    pub fn is_down(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }
}

/// Folds input events into keyboard and mouse snapshots
#[derive(Debug, Default)]
pub struct InputTracker {
    keyboard: KeyboardState,
    mouse: MouseState,
}

impl InputTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle key input
    pub fn handle_key_input(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            self.keyboard.press(key);
        } else {
            self.keyboard.release(key);
        }
    }

    /// Handle mouse button input
    pub fn handle_mouse_button(&mut self, button: MouseButton, pressed: bool) {
        if pressed {
            self.mouse.buttons.insert(button);
        } else {
            self.mouse.buttons.remove(&button);
        }
    }

    /// Handle mouse movement
    pub fn handle_mouse_move(&mut self, x: f64, y: f64) {
        self.mouse.position = (x, y);
    }

    /// Handle scroll wheel movement
    pub fn handle_scroll(&mut self, dx: f64, dy: f64) {
        self.mouse.scroll.0 += dx;
        self.mouse.scroll.1 += dy;
    }

    /// Forget held keys and buttons.
    ///
    /// Release events are not delivered while the window is unfocused, so
    /// anything held at focus loss would otherwise stay stuck.
    pub fn release_all(&mut self) {
        self.keyboard.held.clear();
        self.mouse.buttons.clear();
    }

    /// Current keyboard snapshot
    pub fn keyboard(&self) -> &KeyboardState {
        &self.keyboard
    }

    /// Current mouse snapshot
    pub fn mouse(&self) -> &MouseState {
        &self.mouse
    }
}
