//! Graphics device contract
//!
//! [`GraphicsDevice`] is everything the frame lifecycle needs from a
//! rendering backend: output size, resource creation, a clear/draw/present
//! frame and device-loss handling. Resource handles are associated types
//! released by dropping them, so whoever owns a handle owns its lifetime.
//!
//! Device loss is reported as [`DeviceError::Lost`] from any frame call. The
//! owner then calls [`GraphicsDevice::handle_device_lost`], which tells the
//! owner to release its handles ([`DeviceNotify::on_device_lost`]), rebuilds
//! the device, and asks the owner to recreate them
//! ([`DeviceNotify::on_device_restored`]).

use thiserror::Error;

use super::mesh::{RenderableMesh, VertexFormat};
use super::transforms::TransformSet;

/// Device errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The device was removed or reset; recoverable through `handle_device_lost`
    #[error("Graphics device lost")]
    Lost,

    /// Any other API failure; not recoverable
    #[error("Fatal device error: {0}")]
    Fatal(String),
}

/// Result type for device operations
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Current back buffer size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSize {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl OutputSize {
    /// Create an output size
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height; a zero height is treated as one pixel
    pub fn aspect_ratio(self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Viewport covering the whole output
    pub fn full_viewport(self) -> Viewport {
        Viewport {
            x: 0.0,
            y: 0.0,
            width: self.width as f32,
            height: self.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Rasterizer viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Left edge in pixels
    pub x: f32,
    /// Top edge in pixels
    pub y: f32,
    /// Width in pixels
    pub width: f32,
    /// Height in pixels
    pub height: f32,
    /// Depth range start
    pub min_depth: f32,
    /// Depth range end
    pub max_depth: f32,
}

/// Values the render target is cleared to at the start of a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearValues {
    /// RGBA clear color
    pub color: [f32; 4],
    /// Depth clear value
    pub depth: f32,
    /// Stencil clear value
    pub stencil: u32,
}

impl ClearValues {
    /// Clear to `color`, far depth and zero stencil
    pub const fn with_color(color: [f32; 4]) -> Self {
        Self { color, depth: 1.0, stencil: 0 }
    }
}

/// Output color space negotiated with the display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    /// Standard dynamic range, sRGB transfer
    Srgb,
    /// HDR10: Rec.2020 primaries, ST.2084 transfer
    Hdr10,
}

/// Receiver of device-loss notifications.
///
/// Implemented by whoever owns device-dependent resources.
pub trait DeviceNotify<D: GraphicsDevice + ?Sized> {
    /// Release every handle created on the lost device
    fn on_device_lost(&mut self);

    /// Recreate device-dependent and then size-dependent resources on the new device
    fn on_device_restored(&mut self, device: &mut D) -> DeviceResult<()>;
}

/// Backend contract used by the frame lifecycle
pub trait GraphicsDevice {
    /// Uploaded mesh buffers, released on drop
    type Mesh;

    /// Shader effect and input layout, released on drop
    type Effect;

    /// Current back buffer size
    fn output_size(&self) -> OutputSize;

    /// Viewport covering the current back buffer
    fn screen_viewport(&self) -> Viewport {
        self.output_size().full_viewport()
    }

    /// Resize swap-chain resources; returns whether the size actually changed
    fn window_size_changed(&mut self, width: u32, height: u32) -> DeviceResult<bool>;

    /// Upload static geometry
    fn create_mesh(&mut self, mesh: &RenderableMesh) -> DeviceResult<Self::Mesh>;

    /// Build the effect and derive its input layout from `format`
    fn create_effect(&mut self, format: &VertexFormat) -> DeviceResult<Self::Effect>;

    /// Acquire the back buffer, clear color and depth/stencil, bind them as the target
    fn begin_frame(&mut self, clear: &ClearValues) -> DeviceResult<()>;

    /// Set the rasterizer viewport for subsequent draws
    fn set_viewport(&mut self, viewport: Viewport);

    /// One indexed triangle-list draw over the full index range of `mesh`
    fn draw_indexed(&mut self, mesh: &Self::Mesh, effect: &Self::Effect, transforms: &TransformSet) -> DeviceResult<()>;

    /// Present the frame started by `begin_frame`
    fn present(&mut self) -> DeviceResult<()>;

    /// Re-evaluate the output color space after a display change
    fn update_color_space(&mut self) -> DeviceResult<ColorSpace>;

    /// Rebuild the device after [`DeviceError::Lost`], notifying `notify` around the rebuild
    fn handle_device_lost<N: DeviceNotify<Self>>(&mut self, notify: &mut N) -> DeviceResult<()>
    where
        Self: Sized;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_aspect_ratio() {
        assert_relative_eq!(OutputSize::new(800, 600).aspect_ratio(), 4.0 / 3.0);
        assert_relative_eq!(OutputSize::new(1920, 1080).aspect_ratio(), 16.0 / 9.0);
        assert_relative_eq!(OutputSize::new(640, 0).aspect_ratio(), 640.0);
    }

    #[test]
    fn test_full_viewport() {
        let viewport = OutputSize::new(800, 600).full_viewport();
        assert_eq!(viewport.width, 800.0);
        assert_eq!(viewport.height, 600.0);
        assert_eq!((viewport.min_depth, viewport.max_depth), (0.0, 1.0));
    }
}
