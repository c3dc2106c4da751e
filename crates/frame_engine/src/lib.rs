//! # Frame Engine
//!
//! A small real-time rendering skeleton built around one idea: the frame and
//! resource lifecycle of a graphics application.
//!
//! ## Features
//!
//! - **Lifecycle Controller**: sequences device-dependent and size-dependent
//!   resource creation, per-frame update and render, and device-loss recovery
//! - **Frame Clock**: variable or fixed timestep with delta clamping and FPS tracking
//! - **Device Contract**: a backend-agnostic [`render::GraphicsDevice`] trait
//! - **Vulkan Backend**: an `ash` + GLFW implementation of the device contract
//! - **Configuration**: TOML/RON application configuration with validation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use frame_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApplicationConfig::new("Triangle");
//!     frame_engine::foundation::logging::init_with_level(&config.engine.log_level);
//!     Engine::run(&config)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod foundation;
pub mod input;
pub mod lifecycle;
pub mod platform;
pub mod render;

mod engine;

pub use engine::{Engine, EngineError, ExitReason};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        Engine, EngineError, ExitReason,
        config::Config,
        core::config::{ApplicationConfig, RendererConfig, ShaderConfig, TimingConfig, WindowConfig},
        foundation::{
            math::{Mat4, Point3, Vec3},
            time::{FrameClock, TimestepMode},
        },
        input::{KeyCode, KeyboardState, MouseButton, MouseState},
        lifecycle::{FrameLifecycle, LifecycleError, LifecycleState},
        platform::{Platform, PlatformEvent},
        render::{
            ClearValues, DeviceError, DeviceNotify, GraphicsDevice, RenderableMesh, TransformSet, Vertex,
        },
    };
}
