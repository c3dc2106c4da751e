//! Window management using GLFW
//!
//! Creates the Vulkan-capable window, pumps its messages and translates
//! them into [`PlatformEvent`]s. Also the [`Platform`] the frame lifecycle
//! polls for input and asks to exit.

use thiserror::Error;

use crate::core::config::WindowConfig;
use crate::input::{InputTracker, KeyCode, KeyboardState, MouseButton, MouseState};
use crate::platform::{Platform, PlatformEvent};

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW could not be initialized
    #[error("GLFW initialization failed")]
    InitializationFailed,

    /// The window could not be created
    #[error("Window creation failed")]
    CreationFailed,

    /// Any other GLFW failure
    #[error("GLFW error: {0}")]
    GlfwError(String),
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// GLFW window wrapper with proper resource management
pub struct Window {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
    input: InputTracker,
    minimized: bool,
}

impl Window {
    /// Create a window without a client API, sized and limited per `config`
    pub fn new(config: &WindowConfig) -> WindowResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors).map_err(|_| WindowError::InitializationFailed)?;

        // Vulkan presents through its own surface, no OpenGL context
        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(config.resizable));

        let (mut window, events) = glfw
            .create_window(config.width, config.height, &config.title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.set_size_limits(Some(config.min_width), Some(config.min_height), None, None);

        window.set_key_polling(true);
        window.set_close_polling(true);
        window.set_framebuffer_size_polling(true);
        window.set_iconify_polling(true);
        window.set_focus_polling(true);
        window.set_pos_polling(true);
        window.set_content_scale_polling(true);
        window.set_mouse_button_polling(true);
        window.set_cursor_pos_polling(true);
        window.set_scroll_polling(true);

        log::info!("Created window '{}' ({}x{})", config.title, config.width, config.height);

        Ok(Self {
            glfw,
            window,
            events,
            input: InputTracker::new(),
            minimized: false,
        })
    }

    /// Whether the window has been asked to close
    pub fn should_close(&self) -> bool {
        self.window.should_close()
    }

    /// Whether the window is currently minimized
    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    /// Process pending messages without blocking
    pub fn poll_events(&mut self) {
        self.glfw.poll_events();
    }

    /// Block until at least one message arrives
    pub fn wait_events(&mut self) {
        self.glfw.wait_events();
    }

    /// Translate queued messages into platform events, updating input state on the way
    pub fn drain_events(&mut self) -> Vec<PlatformEvent> {
        let raw: Vec<glfw::WindowEvent> = glfw::flush_messages(&self.events).map(|(_, event)| event).collect();

        let mut events = Vec::with_capacity(raw.len());
        for event in raw {
            if let Some(event) = self.translate(event) {
                events.push(event);
            }
        }
        events
    }

    fn translate(&mut self, event: glfw::WindowEvent) -> Option<PlatformEvent> {
        use glfw::WindowEvent as E;

        let event = match event {
            E::FramebufferSize(width, height) => PlatformEvent::Resized {
                width: width.max(0) as u32,
                height: height.max(0) as u32,
            },
            E::Pos(x, y) => PlatformEvent::Moved { x, y },
            E::Focus(focused) => {
                if !focused {
                    self.input.release_all();
                }
                PlatformEvent::Focus(focused)
            }
            E::Iconify(true) => {
                self.minimized = true;
                PlatformEvent::Minimized
            }
            E::Iconify(false) => {
                self.minimized = false;
                PlatformEvent::Restored
            }
            E::ContentScale(..) => PlatformEvent::DisplayChanged,
            E::Close => PlatformEvent::CloseRequested,
            E::Key(key, _, action, _) => {
                let key = translate_key(key)?;
                let pressed = action != glfw::Action::Release;
                self.input.handle_key_input(key, pressed);
                PlatformEvent::Key { key, pressed }
            }
            E::MouseButton(button, action, _) => {
                let button = translate_mouse_button(button);
                let pressed = action != glfw::Action::Release;
                self.input.handle_mouse_button(button, pressed);
                PlatformEvent::MouseButton { button, pressed }
            }
            E::CursorPos(x, y) => {
                self.input.handle_mouse_move(x, y);
                PlatformEvent::MouseMoved { x, y }
            }
            E::Scroll(dx, dy) => {
                self.input.handle_scroll(dx, dy);
                PlatformEvent::Scrolled { dx, dy }
            }
            _ => return None,
        };
        Some(event)
    }

    /// Current framebuffer size in pixels
    pub fn framebuffer_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (width.max(0) as u32, height.max(0) as u32)
    }

    /// Replace the window title
    pub fn set_title(&mut self, title: &str) {
        self.window.set_title(title);
    }

    /// Get required Vulkan instance extensions from GLFW
    pub fn required_instance_extensions(&self) -> WindowResult<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or_else(|| WindowError::GlfwError("Vulkan is not supported by this GLFW build".to_string()))
    }

    /// Create Vulkan surface using GLFW's built-in functionality
    pub fn create_vulkan_surface(&mut self, instance: ash::vk::Instance) -> WindowResult<ash::vk::SurfaceKHR> {
        let mut surface = ash::vk::SurfaceKHR::null();
        let result = self.window.create_window_surface(instance, std::ptr::null(), &mut surface);

        if result == ash::vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(WindowError::GlfwError(format!("Failed to create Vulkan surface: {result:?}")))
        }
    }
}

impl Platform for Window {
    fn keyboard(&self) -> KeyboardState {
        self.input.keyboard().clone()
    }

    fn mouse(&self) -> MouseState {
        self.input.mouse().clone()
    }

    fn request_exit(&mut self) {
        self.window.set_should_close(true);
    }
}

/// Map a GLFW key to a [`KeyCode`]; keys the engine does not track map to `None`
pub fn translate_key(key: glfw::Key) -> Option<KeyCode> {
    use glfw::Key as K;

    let code = match key {
        K::Escape => KeyCode::Escape,
        K::Space => KeyCode::Space,
        K::Enter | K::KpEnter => KeyCode::Enter,
        K::Tab => KeyCode::Tab,
        K::Backspace => KeyCode::Backspace,
        K::Up => KeyCode::Up,
        K::Down => KeyCode::Down,
        K::Left => KeyCode::Left,
        K::Right => KeyCode::Right,
        K::LeftShift | K::RightShift => KeyCode::Shift,
        K::LeftControl | K::RightControl => KeyCode::Control,
        K::LeftAlt | K::RightAlt => KeyCode::Alt,
        other => {
            // GLFW key values follow ASCII for letters and digits
            let value = other as i32;
            match value {
                65..=90 => KeyCode::Letter(char::from(value as u8)),
                48..=57 => KeyCode::Digit((value - 48) as u8),
                290..=301 => KeyCode::Function((value - 289) as u8),
                _ => return None,
            }
        }
    };
    Some(code)
}

/// Map a GLFW mouse button to a [`MouseButton`]
pub fn translate_mouse_button(button: glfw::MouseButton) -> MouseButton {
    use glfw::MouseButton as B;

    match button {
        B::Button1 => MouseButton::Left,
        B::Button2 => MouseButton::Right,
        B::Button3 => MouseButton::Middle,
        B::Button4 => MouseButton::Other(4),
        B::Button5 => MouseButton::Other(5),
        B::Button6 => MouseButton::Other(6),
        B::Button7 => MouseButton::Other(7),
        B::Button8 => MouseButton::Other(8),
    }
}
