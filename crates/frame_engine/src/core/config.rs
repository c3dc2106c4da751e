//! # Application Configuration
//!
//! All tunables of the demo in one serializable tree:
//!
//! - **Engine**: logging and diagnostics
//! - **Window**: title, initial size, minimum size
//! - **Timing**: variable or fixed timestep, delta clamp
//! - **Renderer**: Vulkan instance/device options, shaders, clear color
//!
//! Every struct uses `#[serde(default)]`, so a config file only has to name
//! the values it changes.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub use crate::config::{Config, ConfigError};
use crate::foundation::time::{TimestepMode, DEFAULT_MAX_DELTA};

/// Default client width in pixels
pub const DEFAULT_WIDTH: u32 = 800;
/// Default client height in pixels
pub const DEFAULT_HEIGHT: u32 = 600;
/// Smallest client width the window can be resized to
pub const MIN_WIDTH: u32 = 320;
/// Smallest client height the window can be resized to
pub const MIN_HEIGHT: u32 = 200;

/// Smallest fixed timestep accepted, in seconds
pub const MIN_FIXED_STEP_SECONDS: f64 = 1e-4;

/// CornflowerBlue, sRGB-encoded (100, 149, 237).
///
/// Written unconverted into the UNORM back buffer, so these are display values.
pub const CORNFLOWER_BLUE: [f32; 4] = [0.392_156_9, 0.584_313_75, 0.929_411_77, 1.0];

/// # Shader Configuration
///
/// SPIR-V paths for the triangle effect. Paths are resolved against a few
/// common locations so the demo runs from the workspace root or its own
/// directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    /// Path to the vertex shader SPIR-V file
    pub vertex_shader_path: String,
    /// Path to the fragment shader SPIR-V file
    pub fragment_shader_path: String,
}

impl ShaderConfig {
    /// Create a new shader configuration
    pub fn new(vertex_path: impl Into<String>, fragment_path: impl Into<String>) -> Self {
        Self {
            vertex_shader_path: vertex_path.into(),
            fragment_shader_path: fragment_path.into(),
        }
    }

    /// Create shader config with automatic path resolution
    pub fn with_path_resolution(base_vertex: &str, base_fragment: &str) -> Self {
        const SHADER_DIRS: [&str; 4] = ["target/shaders/", "../target/shaders/", "shaders/", "./"];

        let resolve = |file: &str| {
            SHADER_DIRS
                .iter()
                .map(|dir| format!("{dir}{file}"))
                .find(|candidate| Path::new(candidate).exists())
                .unwrap_or_else(|| format!("{}{file}", SHADER_DIRS[0]))
        };

        Self {
            vertex_shader_path: resolve(base_vertex),
            fragment_shader_path: resolve(base_fragment),
        }
    }

    /// Validate that shader files exist
    pub fn validate(&self) -> Result<(), ConfigError> {
        for path in [&self.vertex_shader_path, &self.fragment_shader_path] {
            if !Path::new(path).exists() {
                return Err(ConfigError::Invalid(format!("Shader not found: {path}")));
            }
        }
        Ok(())
    }
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self::with_path_resolution("triangle.vert.spv", "triangle.frag.spv")
    }
}

/// # Renderer Configuration
///
/// Vulkan instance and device options plus the fixed per-frame clear values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Application name for Vulkan instance creation
    pub application_name: String,
    /// Application version (major, minor, patch)
    pub application_version: (u32, u32, u32),
    /// Shader configuration
    pub shaders: ShaderConfig,
    /// Maximum frames in flight
    pub max_frames_in_flight: usize,
    /// Whether to enable Vulkan validation layers; `None` follows the build type
    pub enable_validation: Option<bool>,
    /// Wait for vertical blank when presenting
    pub vsync: bool,
    /// Prefer an HDR10 swapchain when the display supports it
    pub enable_hdr: bool,
    /// Color the back buffer is cleared to every frame
    pub clear_color: [f32; 4],
}

impl RendererConfig {
    /// Create a new renderer configuration
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            application_name: app_name.into(),
            application_version: (1, 0, 0),
            shaders: ShaderConfig::default(),
            max_frames_in_flight: 2,
            enable_validation: None,
            vsync: true,
            enable_hdr: false,
            clear_color: CORNFLOWER_BLUE,
        }
    }

    /// Set custom shader configuration
    pub fn with_shaders(mut self, shaders: ShaderConfig) -> Self {
        self.shaders = shaders;
        self
    }

    /// Set maximum frames in flight
    pub fn with_max_frames_in_flight(mut self, frames: usize) -> Self {
        self.max_frames_in_flight = frames;
        self
    }

    /// Enable or disable validation layers
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = Some(enabled);
        self
    }

    /// Whether validation layers should be requested
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.application_name.is_empty() {
            return Err(ConfigError::Invalid("Application name cannot be empty".to_string()));
        }

        if self.max_frames_in_flight == 0 {
            return Err(ConfigError::Invalid("Max frames in flight must be at least 1".to_string()));
        }

        if self.max_frames_in_flight > 8 {
            return Err(ConfigError::Invalid("Max frames in flight should not exceed 8".to_string()));
        }

        if self.clear_color.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(ConfigError::Invalid(format!(
                "Clear color components must be within [0, 1]: {:?}",
                self.clear_color
            )));
        }

        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::new("Frame Engine Application")
    }
}

/// # Window Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Initial client width
    pub width: u32,
    /// Initial client height
    pub height: u32,
    /// Whether the user can resize the window
    pub resizable: bool,
    /// Minimum client width
    pub min_width: u32,
    /// Minimum client height
    pub min_height: u32,
    /// Append the measured frame rate to the title
    pub show_fps_in_title: bool,
}

impl WindowConfig {
    /// Create a window configuration with the default size
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            resizable: true,
            min_width: MIN_WIDTH,
            min_height: MIN_HEIGHT,
            show_fps_in_title: true,
        }
    }

    /// Set the initial client size
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_width == 0 || self.min_height == 0 {
            return Err(ConfigError::Invalid("Minimum window size must be positive".to_string()));
        }

        if self.width < self.min_width || self.height < self.min_height {
            return Err(ConfigError::Invalid(format!(
                "Window size {}x{} is below the minimum {}x{}",
                self.width, self.height, self.min_width, self.min_height
            )));
        }

        Ok(())
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::new("Frame Engine Application")
    }
}

/// # Timing Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Variable or fixed timestep
    pub mode: TimestepMode,
    /// Largest measured delta accepted in one tick, in seconds
    pub max_delta_seconds: f64,
}

impl TimingConfig {
    /// Largest measured delta as a duration
    pub fn max_delta(&self) -> Duration {
        Duration::try_from_secs_f64(self.max_delta_seconds).unwrap_or(DEFAULT_MAX_DELTA)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_delta_seconds.is_finite() && self.max_delta_seconds > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "Max delta must be positive, got {}",
                self.max_delta_seconds
            )));
        }

        if let TimestepMode::Fixed { target_seconds } = self.mode {
            if !(target_seconds.is_finite() && target_seconds > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "Fixed timestep must be positive, got {target_seconds}"
                )));
            }

            // Smaller steps turn one clamped delta into millions of updates
            if target_seconds < MIN_FIXED_STEP_SECONDS {
                return Err(ConfigError::Invalid(format!(
                    "Fixed timestep {target_seconds} is below the minimum {MIN_FIXED_STEP_SECONDS}"
                )));
            }
        }

        Ok(())
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            mode: TimestepMode::Variable,
            max_delta_seconds: DEFAULT_MAX_DELTA.as_secs_f64(),
        }
    }
}

/// # Engine Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default log level; `RUST_LOG` still overrides per module
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// # Complete Application Configuration
///
/// Top-level configuration that encompasses all engine subsystems.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Engine core configuration
    pub engine: EngineConfig,
    /// Window configuration
    pub window: WindowConfig,
    /// Frame clock configuration
    pub timing: TimingConfig,
    /// Rendering system configuration
    pub renderer: RendererConfig,
}

impl ApplicationConfig {
    /// Create a new application configuration with defaults
    pub fn new(app_name: impl Into<String>) -> Self {
        let app_name = app_name.into();
        Self {
            engine: EngineConfig::default(),
            window: WindowConfig::new(app_name.clone()),
            timing: TimingConfig::default(),
            renderer: RendererConfig::new(app_name),
        }
    }

    /// Validate the entire configuration, including that the SPIR-V files exist
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.window.validate()?;
        self.timing.validate()?;
        self.renderer.validate()?;
        self.renderer.shaders.validate()?;
        Ok(())
    }
}

impl Config for ApplicationConfig {}
