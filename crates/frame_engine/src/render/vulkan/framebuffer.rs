//! Framebuffers and the depth/stencil target

use ash::{vk, Device};

use super::buffer::find_memory_type;
use super::context::{VulkanContext, VulkanError, VulkanResult};

/// Depth formats in order of preference; the first two carry stencil
const DEPTH_CANDIDATES: [vk::Format; 3] = [
    vk::Format::D24_UNORM_S8_UINT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D32_SFLOAT,
];

/// Pick the first depth format the physical device supports as an optimal-tiling attachment
pub fn find_depth_format(context: &VulkanContext) -> VulkanResult<vk::Format> {
    DEPTH_CANDIDATES
        .into_iter()
        .find(|&format| {
            let properties = unsafe {
                context
                    .instance()
                    .get_physical_device_format_properties(context.physical_device.device, format)
            };
            properties
                .optimal_tiling_features
                .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
        })
        .ok_or_else(|| VulkanError::InitializationFailed("no supported depth format".to_string()))
}

/// Aspects a view of a `format` depth image must cover
pub fn depth_aspect_mask(format: vk::Format) -> vk::ImageAspectFlags {
    match format {
        vk::Format::D16_UNORM_S8_UINT | vk::Format::D24_UNORM_S8_UINT | vk::Format::D32_SFLOAT_S8_UINT => {
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        }
        _ => vk::ImageAspectFlags::DEPTH,
    }
}

/// Framebuffer wrapper with RAII cleanup
pub struct Framebuffer {
    device: Device,
    framebuffer: vk::Framebuffer,
}

impl Framebuffer {
    /// Create a new framebuffer
    pub fn new(
        device: Device,
        render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> VulkanResult<Self> {
        let framebuffer_create_info = vk::FramebufferCreateInfo::builder()
            .render_pass(render_pass)
            .attachments(attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        let framebuffer = unsafe {
            device
                .create_framebuffer(&framebuffer_create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, framebuffer })
    }

    /// Get the framebuffer handle
    pub fn handle(&self) -> vk::Framebuffer {
        self.framebuffer
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_framebuffer(self.framebuffer, None);
        }
    }
}

/// Depth/stencil buffer with RAII cleanup
pub struct DepthBuffer {
    device: Device,
    image: vk::Image,
    memory: vk::DeviceMemory,
    image_view: vk::ImageView,
}

impl DepthBuffer {
    /// Create a device-local depth/stencil image of `extent`
    pub fn new(context: &VulkanContext, device: Device, format: vk::Format, extent: vk::Extent2D) -> VulkanResult<Self> {
        let image_create_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .format(format)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(vk::SampleCountFlags::TYPE_1);

        let image = unsafe { device.create_image(&image_create_info, None).map_err(VulkanError::Api)? };

        let mut depth = Self {
            device,
            image,
            memory: vk::DeviceMemory::null(),
            image_view: vk::ImageView::null(),
        };

        let requirements = unsafe { depth.device.get_image_memory_requirements(image) };
        let memory_type_index = find_memory_type(
            context,
            requirements.memory_type_bits,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);

        depth.memory = unsafe { depth.device.allocate_memory(&alloc_info, None).map_err(VulkanError::Api)? };

        unsafe {
            depth
                .device
                .bind_image_memory(image, depth.memory, 0)
                .map_err(VulkanError::Api)?;
        }

        let image_view_create_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: depth_aspect_mask(format),
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        depth.image_view = unsafe {
            depth
                .device
                .create_image_view(&image_view_create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(depth)
    }

    /// Get the image view handle
    pub fn image_view(&self) -> vk::ImageView {
        self.image_view
    }
}

impl Drop for DepthBuffer {
    fn drop(&mut self) {
        // Null handles are ignored by the destroy calls
        unsafe {
            self.device.destroy_image_view(self.image_view, None);
            self.device.destroy_image(self.image, None);
            self.device.free_memory(self.memory, None);
        }
    }
}
