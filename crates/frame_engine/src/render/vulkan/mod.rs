//! Vulkan rendering backend
//!
//! RAII wrappers over the handful of Vulkan objects the demo needs and
//! [`VulkanDevice`], the [`GraphicsDevice`](crate::render::GraphicsDevice)
//! implementation built from them.

pub mod buffer;
pub mod commands;
pub mod context;
pub mod device;
pub mod framebuffer;
pub mod render_pass;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod vertex_layout;
pub mod window;

pub use buffer::{Buffer, IndexBuffer, VertexBuffer};
pub use commands::{ActiveRenderPass, CommandPool, CommandRecorder};
pub use context::{LogicalDevice, PhysicalDeviceInfo, VulkanContext, VulkanError, VulkanInstance, VulkanResult};
pub use device::{VulkanDevice, VulkanEffect, VulkanMesh};
pub use framebuffer::{DepthBuffer, Framebuffer};
pub use render_pass::RenderPass;
pub use shader::{GraphicsPipeline, ShaderModule};
pub use swapchain::Swapchain;
pub use sync::{Fence, FrameSync, Semaphore};
pub use vertex_layout::VulkanVertexLayout;
pub use window::{Window, WindowError, WindowResult};

use crate::render::DeviceError;
use ash::vk;

impl From<VulkanError> for DeviceError {
    fn from(err: VulkanError) -> Self {
        match err {
            VulkanError::Api(vk::Result::ERROR_DEVICE_LOST) => DeviceError::Lost,
            other => DeviceError::Fatal(other.to_string()),
        }
    }
}
