//! Platform layer contract
//!
//! The window/message-pump side of the application. It owns input polling
//! and the exit request; window notifications are delivered as
//! [`PlatformEvent`]s which the engine forwards to the frame lifecycle.

use crate::input::{KeyCode, KeyboardState, MouseButton, MouseState};

/// Services the frame lifecycle needs from the window layer
pub trait Platform {
    /// Snapshot of the keyboard at the time of the call
    fn keyboard(&self) -> KeyboardState;

    /// Snapshot of the pointer at the time of the call
    fn mouse(&self) -> MouseState;

    /// Ask the application to terminate after the current tick
    fn request_exit(&mut self);
}

/// Window notifications, already translated from the windowing library
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlatformEvent {
    /// Client area changed size (framebuffer pixels)
    Resized {
        /// New framebuffer width
        width: u32,
        /// New framebuffer height
        height: u32,
    },
    /// Window moved on the desktop
    Moved {
        /// New x position of the client area
        x: i32,
        /// New y position of the client area
        y: i32,
    },
    /// Window gained or lost focus
    Focus(bool),
    /// Window was minimized
    Minimized,
    /// Window was restored from minimized
    Restored,
    /// Display properties changed (monitor, DPI, HDR mode)
    DisplayChanged,
    /// User asked to close the window
    CloseRequested,
    /// Key state change
    Key {
        /// Logical key
        key: KeyCode,
        /// Whether the key went down
        pressed: bool,
    },
    /// Mouse button state change
    MouseButton {
        /// Button
        button: MouseButton,
        /// Whether the button went down
        pressed: bool,
    },
    /// Cursor moved
    MouseMoved {
        /// Cursor x in window coordinates
        x: f64,
        /// Cursor y in window coordinates
        y: f64,
    },
    /// Scroll wheel moved
    Scrolled {
        /// Horizontal scroll
        dx: f64,
        /// Vertical scroll
        dy: f64,
    },
}
