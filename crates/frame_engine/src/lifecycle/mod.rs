//! Frame lifecycle
//!
//! Sequences resource creation, per-tick update and render, window and
//! power notifications, and recovery after device loss. The controller is
//! generic over [`GraphicsDevice`](crate::render::GraphicsDevice) so the
//! whole lifecycle can run against a scripted device.

mod controller;
pub mod state;

#[cfg(test)]
mod tests;

pub use controller::{FrameLifecycle, FrameOutcome, TickReport, DEFAULT_SIZE};
pub use state::{LifecycleError, LifecycleEvent, LifecycleResult, LifecycleState};
