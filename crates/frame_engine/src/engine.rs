//! Engine runner: window, Vulkan device and the frame lifecycle message loop

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::ConfigError;
use crate::core::config::ApplicationConfig;
use crate::foundation::time::FrameClock;
use crate::lifecycle::{FrameLifecycle, LifecycleError};
use crate::platform::PlatformEvent;
use crate::render::vulkan::{VulkanDevice, VulkanError, Window, WindowError};
use crate::render::{ClearValues, RenderableMesh};

const TITLE_REFRESH: Duration = Duration::from_secs(1);

/// Top-level engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration rejected
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Window creation or event handling failed
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Vulkan setup failed
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] VulkanError),

    /// Lifecycle failure, including fatal device errors
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),
}

/// Why the message loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The user closed the window
    WindowClosed,
    /// The exit key was pressed during an update
    ExitKey,
}

/// Runs one application from window creation to shutdown
pub struct Engine;

impl Engine {
    /// Validate `config`, open the window and run the frame loop until exit
    pub fn run(config: &ApplicationConfig) -> Result<ExitReason, EngineError> {
        config.validate()?;

        let mut window = Window::new(&config.window)?;
        let mut device = VulkanDevice::new(&mut window, &config.renderer)?;

        let clock = FrameClock::new(config.timing.mode, config.timing.max_delta());
        let mut lifecycle = FrameLifecycle::new(
            RenderableMesh::triangle(),
            clock,
            ClearValues::with_color(config.renderer.clear_color),
        );
        lifecycle.initialize(&mut device)?;

        let result = Self::message_loop(config, &mut window, &mut device, &mut lifecycle);

        if let Err(err) = device.wait_idle() {
            log::warn!("Device did not go idle before shutdown: {err}");
        }
        lifecycle.shutdown();

        let reason = result?;
        log::info!("Exiting: {reason:?}");
        Ok(reason)
    }

    fn message_loop(
        config: &ApplicationConfig,
        window: &mut Window,
        device: &mut VulkanDevice,
        lifecycle: &mut FrameLifecycle<VulkanDevice>,
    ) -> Result<ExitReason, EngineError> {
        let mut reason = ExitReason::WindowClosed;
        let mut last_title_update = Instant::now();

        while !window.should_close() {
            if window.is_minimized() {
                window.wait_events();
            } else {
                window.poll_events();
            }

            for event in window.drain_events() {
                Self::dispatch(event, device, lifecycle)?;
            }

            // Minimized windows have a zero-sized surface; nothing to draw into
            if window.is_minimized() || window.should_close() {
                continue;
            }

            let report = lifecycle.tick(device, window)?;
            if report.exit_requested {
                reason = ExitReason::ExitKey;
            }

            if config.window.show_fps_in_title && last_title_update.elapsed() >= TITLE_REFRESH {
                let fps = lifecycle.clock().frames_per_second();
                window.set_title(&format!("{} - {fps} FPS", config.window.title));
                last_title_update = Instant::now();
            }
        }

        Ok(reason)
    }

    fn dispatch(
        event: PlatformEvent,
        device: &mut VulkanDevice,
        lifecycle: &mut FrameLifecycle<VulkanDevice>,
    ) -> Result<(), EngineError> {
        match event {
            PlatformEvent::Resized { width, height } if width > 0 && height > 0 => {
                lifecycle.on_window_size_changed(device, width, height)?;
            }
            PlatformEvent::Moved { .. } => lifecycle.on_window_moved(device)?,
            PlatformEvent::Focus(true) => lifecycle.on_activated(),
            PlatformEvent::Focus(false) => lifecycle.on_deactivated(),
            PlatformEvent::Minimized => lifecycle.on_suspending(),
            PlatformEvent::Restored => lifecycle.on_resuming(),
            PlatformEvent::DisplayChanged => lifecycle.on_display_change(device)?,
            PlatformEvent::CloseRequested => log::debug!("Close requested"),
            _ => {}
        }
        Ok(())
    }
}
