//! Vulkan swapchain management
//!
//! Handles swapchain creation and recreation following RAII principles.
//! Format, present mode and extent selection are free functions so they can
//! be checked without a device.

use ash::extensions::khr::Swapchain as SwapchainLoader;
use ash::vk;
use ash::Device;

use super::context::{VulkanContext, VulkanError, VulkanResult};
use crate::render::ColorSpace;

/// Format used for the HDR10 back buffer
pub const HDR_FORMAT: vk::Format = vk::Format::A2B10G10R10_UNORM_PACK32;

/// Format used for the standard dynamic range back buffer.
///
/// UNORM, so clear and vertex colors are stored as given. They are already
/// sRGB-encoded; an `_SRGB` format would encode them a second time.
pub const SDR_FORMAT: vk::Format = vk::Format::B8G8R8A8_UNORM;

/// Swapchain creation options
#[derive(Debug, Clone, Copy)]
pub struct SwapchainOptions {
    /// Requested framebuffer size, used when the surface leaves the extent to us
    pub extent: vk::Extent2D,
    /// Wait for vertical blank
    pub vsync: bool,
    /// Prefer an HDR10 color space when the surface offers one
    pub enable_hdr: bool,
    /// Keep this pixel format so existing render passes stay compatible
    pub keep_format: Option<vk::Format>,
}

/// Swapchain management wrapper with RAII cleanup
pub struct Swapchain {
    device: Device,
    swapchain_loader: SwapchainLoader,
    swapchain: vk::SwapchainKHR,
    image_views: Vec<vk::ImageView>,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
}

impl Swapchain {
    /// Create a swapchain, retiring `old_swapchain` if it is not null
    pub fn new(
        context: &VulkanContext,
        device: Device,
        swapchain_loader: SwapchainLoader,
        options: SwapchainOptions,
        old_swapchain: vk::SwapchainKHR,
    ) -> VulkanResult<Self> {
        let physical_device = context.physical_device.device;

        let surface_caps = unsafe {
            context
                .surface_loader
                .get_physical_device_surface_capabilities(physical_device, context.surface)
                .map_err(VulkanError::Api)?
        };

        let surface_formats = context.surface_formats()?;
        let enable_hdr = options.enable_hdr && context.instance.hdr_color_spaces();
        let format = choose_surface_format(&surface_formats, enable_hdr, options.keep_format).ok_or_else(|| {
            VulkanError::InitializationFailed("Surface offers no usable format".to_string())
        })?;

        let present_modes = unsafe {
            context
                .surface_loader
                .get_physical_device_surface_present_modes(physical_device, context.surface)
                .map_err(VulkanError::Api)?
        };
        let present_mode = choose_present_mode(&present_modes, options.vsync);

        let extent = choose_extent(&surface_caps, options.extent);
        let image_count = choose_image_count(&surface_caps);

        let swapchain_create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(context.surface)
            .min_image_count(image_count)
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(surface_caps.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = unsafe {
            swapchain_loader
                .create_swapchain(&swapchain_create_info, None)
                .map_err(VulkanError::Api)?
        };

        let mut this = Self {
            device,
            swapchain_loader,
            swapchain,
            image_views: Vec::new(),
            format,
            extent,
        };

        let images = unsafe {
            this.swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(VulkanError::Api)?
        };

        for image in images {
            let create_info = vk::ImageViewCreateInfo::builder()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format.format)
                .components(vk::ComponentMapping::default())
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });

            let view = unsafe { this.device.create_image_view(&create_info, None).map_err(VulkanError::Api)? };
            this.image_views.push(view);
        }

        log::debug!(
            "Swapchain {}x{}, {:?}/{:?}, {:?}, {} images",
            extent.width,
            extent.height,
            format.format,
            format.color_space,
            present_mode,
            this.image_views.len()
        );

        Ok(this)
    }

    /// Get swapchain extent
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Get surface format
    pub fn format(&self) -> vk::SurfaceFormatKHR {
        self.format
    }

    /// Output color space
    pub fn color_space(&self) -> ColorSpace {
        color_space_of(self.format.color_space)
    }

    /// Get image views
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// Get swapchain handle
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Get swapchain loader
    pub fn loader(&self) -> &SwapchainLoader {
        &self.swapchain_loader
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for &image_view in &self.image_views {
                self.device.destroy_image_view(image_view, None);
            }
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

/// Engine color space for a Vulkan surface color space
pub fn color_space_of(color_space: vk::ColorSpaceKHR) -> ColorSpace {
    if color_space == vk::ColorSpaceKHR::HDR10_ST2084_EXT {
        ColorSpace::Hdr10
    } else {
        ColorSpace::Srgb
    }
}

/// Pick the back buffer format.
///
/// HDR10 wins when enabled and offered, then [`SDR_FORMAT`] in the sRGB
/// color space, then any sRGB color space, then whatever the
/// surface lists first. With `keep_format` only entries of that format are
/// considered; `None` means nothing acceptable is offered.
pub fn choose_surface_format(
    available: &[vk::SurfaceFormatKHR],
    enable_hdr: bool,
    keep_format: Option<vk::Format>,
) -> Option<vk::SurfaceFormatKHR> {
    let candidates: Vec<vk::SurfaceFormatKHR> = available
        .iter()
        .copied()
        .filter(|sf| keep_format.map_or(true, |format| sf.format == format))
        .collect();

    let find = |format: vk::Format, color_space: vk::ColorSpaceKHR| {
        candidates
            .iter()
            .copied()
            .find(|sf| sf.format == format && sf.color_space == color_space)
    };

    let hdr_format = keep_format.unwrap_or(HDR_FORMAT);
    let sdr_format = keep_format.unwrap_or(SDR_FORMAT);

    enable_hdr
        .then(|| find(hdr_format, vk::ColorSpaceKHR::HDR10_ST2084_EXT))
        .flatten()
        .or_else(|| find(sdr_format, vk::ColorSpaceKHR::SRGB_NONLINEAR))
        .or_else(|| {
            candidates
                .iter()
                .copied()
                .find(|sf| sf.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
        })
        .or_else(|| candidates.first().copied())
}

/// FIFO when synchronized to vertical blank, otherwise the lowest-latency mode available
pub fn choose_present_mode(available: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
    if vsync {
        return vk::PresentModeKHR::FIFO;
    }

    [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE]
        .into_iter()
        .find(|mode| available.contains(mode))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// Surface extent if fixed, else the requested size clamped to the surface limits
pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, requested: vk::Extent2D) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        return caps.current_extent;
    }

    vk::Extent2D {
        width: requested
            .width
            .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
        height: requested
            .height
            .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
    }
}

fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let desired = caps.min_image_count + 1;
    if caps.max_image_count > 0 {
        desired.min(caps.max_image_count)
    } else {
        desired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface_format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR { format, color_space }
    }

    fn typical_formats() -> Vec<vk::SurfaceFormatKHR> {
        vec![
            surface_format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            surface_format(SDR_FORMAT, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            surface_format(HDR_FORMAT, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            surface_format(HDR_FORMAT, vk::ColorSpaceKHR::HDR10_ST2084_EXT),
        ]
    }

    fn chosen(
        available: &[vk::SurfaceFormatKHR],
        enable_hdr: bool,
        keep_format: Option<vk::Format>,
    ) -> Option<(vk::Format, vk::ColorSpaceKHR)> {
        choose_surface_format(available, enable_hdr, keep_format).map(|sf| (sf.format, sf.color_space))
    }

    #[test]
    fn test_prefers_srgb_without_hdr() {
        let formats = typical_formats();
        assert_eq!(chosen(&formats, false, None), Some((SDR_FORMAT, vk::ColorSpaceKHR::SRGB_NONLINEAR)));
        assert_eq!(color_space_of(vk::ColorSpaceKHR::SRGB_NONLINEAR), ColorSpace::Srgb);
    }

    /// Colors are written unconverted, so an `_SRGB` back buffer listed
    /// first must still lose to the UNORM one
    #[test]
    fn test_sdr_back_buffer_stores_colors_unconverted() {
        assert_eq!(SDR_FORMAT, vk::Format::B8G8R8A8_UNORM);

        let formats = typical_formats();
        assert_eq!(formats[0].format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(
            chosen(&formats, false, None),
            Some((vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR))
        );
    }

    #[test]
    fn test_prefers_hdr10_when_enabled() {
        let formats = typical_formats();
        assert_eq!(chosen(&formats, true, None), Some((HDR_FORMAT, vk::ColorSpaceKHR::HDR10_ST2084_EXT)));
        assert_eq!(color_space_of(vk::ColorSpaceKHR::HDR10_ST2084_EXT), ColorSpace::Hdr10);
    }

    #[test]
    fn test_hdr_falls_back_to_srgb() {
        let formats = vec![surface_format(SDR_FORMAT, vk::ColorSpaceKHR::SRGB_NONLINEAR)];
        assert_eq!(chosen(&formats, true, None), Some((SDR_FORMAT, vk::ColorSpaceKHR::SRGB_NONLINEAR)));
    }

    /// A display change may switch color space but never the pixel format
    #[test]
    fn test_keep_format_switches_color_space_only() {
        let formats = typical_formats();

        assert_eq!(
            chosen(&formats, false, Some(HDR_FORMAT)),
            Some((HDR_FORMAT, vk::ColorSpaceKHR::SRGB_NONLINEAR))
        );
        assert_eq!(
            chosen(&formats, true, Some(HDR_FORMAT)),
            Some((HDR_FORMAT, vk::ColorSpaceKHR::HDR10_ST2084_EXT))
        );
        assert_eq!(chosen(&formats, false, Some(vk::Format::R16G16B16A16_SFLOAT)), None);
    }

    #[test]
    fn test_unknown_formats_use_first_entry() {
        let formats = vec![
            surface_format(vk::Format::R5G6B5_UNORM_PACK16, vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT),
            surface_format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT),
        ];
        assert_eq!(
            chosen(&formats, false, None),
            Some((vk::Format::R5G6B5_UNORM_PACK16, vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT))
        );
        assert_eq!(chosen(&[], false, None), None);
    }

    #[test]
    fn test_present_mode() {
        let all = [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::FIFO];
        assert_eq!(choose_present_mode(&all, true), vk::PresentModeKHR::FIFO);
        assert_eq!(choose_present_mode(&all, false), vk::PresentModeKHR::MAILBOX);
        assert_eq!(choose_present_mode(&[vk::PresentModeKHR::FIFO], false), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn test_extent_follows_surface_when_fixed() {
        let caps = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D { width: 1024, height: 768 },
            ..Default::default()
        };
        let extent = choose_extent(&caps, vk::Extent2D { width: 800, height: 600 });
        assert_eq!((extent.width, extent.height), (1024, 768));
    }

    #[test]
    fn test_extent_clamped_when_free() {
        let caps = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D { width: u32::MAX, height: u32::MAX },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D { width: 4096, height: 2048 },
            ..Default::default()
        };
        let extent = choose_extent(&caps, vk::Extent2D { width: 8000, height: 600 });
        assert_eq!((extent.width, extent.height), (4096, 600));
    }

    #[test]
    fn test_image_count() {
        let mut caps = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 0,
            ..Default::default()
        };
        assert_eq!(choose_image_count(&caps), 3);
        caps.max_image_count = 2;
        assert_eq!(choose_image_count(&caps), 2);
    }
}
