//! [`GraphicsDevice`] implementation over Vulkan
//!
//! [`VulkanDevice`] splits its objects by lifetime:
//!
//! - the [`VulkanContext`] (instance, surface, adapter) lives as long as the window
//! - `DeviceResources` (logical device, render pass, command buffers, frame
//!   sync) are rebuilt after device loss
//! - `RenderTargets` (swapchain, depth buffers, framebuffers) are rebuilt on
//!   resize, out-of-date presentation and color space changes
//!
//! Draws issued between `begin_frame` and `present` are collected and then
//! recorded into the frame's command buffer in one pass.

use ash::vk;

use super::buffer::{IndexBuffer, VertexBuffer};
use super::commands::{CommandPool, CommandRecorder};
use super::context::{LogicalDevice, VulkanContext, VulkanError, VulkanResult};
use super::framebuffer::{find_depth_format, DepthBuffer, Framebuffer};
use super::render_pass::RenderPass;
use super::shader::{GraphicsPipeline, ShaderModule};
use super::swapchain::{choose_surface_format, Swapchain, SwapchainOptions};
use super::sync::{FrameSync, Semaphore};
use super::vertex_layout::VulkanVertexLayout;
use super::window::Window;
use crate::core::config::RendererConfig;
use crate::render::{
    ClearValues, ColorSpace, DeviceError, DeviceNotify, DeviceResult, GraphicsDevice, OutputSize, RenderableMesh,
    TransformSet, VertexFormat, Viewport,
};

/// Vertex and index buffers of one uploaded mesh
pub struct VulkanMesh {
    vertex_buffer: VertexBuffer,
    index_buffer: IndexBuffer,
    generation: u64,
}

impl VulkanMesh {
    /// Number of indices drawn per call
    pub fn index_count(&self) -> u32 {
        self.index_buffer.index_count()
    }
}

/// Compiled pipeline for one vertex format
pub struct VulkanEffect {
    pipeline: GraphicsPipeline,
    generation: u64,
}

/// Swapchain and everything sized to it
struct RenderTargets {
    framebuffers: Vec<Framebuffer>,
    _depth_buffers: Vec<DepthBuffer>,
    /// One per swapchain image, signaled when rendering into that image finishes
    render_finished: Vec<Semaphore>,
    swapchain: Swapchain,
}

impl RenderTargets {
    fn new(
        context: &VulkanContext,
        logical: &LogicalDevice,
        swapchain: Swapchain,
        render_pass: vk::RenderPass,
        depth_format: vk::Format,
    ) -> VulkanResult<Self> {
        let extent = swapchain.extent();
        let image_count = swapchain.image_views().len();

        let mut depth_buffers = Vec::with_capacity(image_count);
        let mut framebuffers = Vec::with_capacity(image_count);
        let mut render_finished = Vec::with_capacity(image_count);

        for &color_view in swapchain.image_views() {
            let depth = DepthBuffer::new(context, logical.device.clone(), depth_format, extent)?;
            let attachments = [color_view, depth.image_view()];
            framebuffers.push(Framebuffer::new(logical.device.clone(), render_pass, &attachments, extent)?);
            depth_buffers.push(depth);
            render_finished.push(Semaphore::new(logical.device.clone())?);
        }

        Ok(Self {
            framebuffers,
            _depth_buffers: depth_buffers,
            render_finished,
            swapchain,
        })
    }
}

/// Everything created on one logical device.
///
/// Fields drop in declaration order, so the logical device goes last.
struct DeviceResources {
    targets: Option<RenderTargets>,
    frames: Vec<FrameSync>,
    command_buffers: Vec<vk::CommandBuffer>,
    _command_pool: CommandPool,
    render_pass: RenderPass,
    depth_format: vk::Format,
    logical: LogicalDevice,
}

impl DeviceResources {
    fn new(context: &VulkanContext, settings: &RendererConfig, options: SwapchainOptions) -> VulkanResult<Self> {
        let logical = context.create_logical_device()?;
        let depth_format = find_depth_format(context)?;

        let swapchain = Swapchain::new(
            context,
            logical.device.clone(),
            logical.swapchain_loader.clone(),
            options,
            vk::SwapchainKHR::null(),
        )?;

        let render_pass = RenderPass::new_forward_pass(logical.device.clone(), swapchain.format().format, depth_format)?;
        let targets = RenderTargets::new(context, &logical, swapchain, render_pass.handle(), depth_format)?;

        let frame_count = settings.max_frames_in_flight.max(1);
        let command_pool = CommandPool::new(logical.device.clone(), context.physical_device.graphics_family)?;
        let command_buffers = command_pool.allocate_command_buffers(frame_count as u32)?;
        let frames = (0..frame_count)
            .map(|_| FrameSync::new(logical.device.clone()))
            .collect::<VulkanResult<Vec<_>>>()?;

        log::info!(
            "Device resources created on {} ({} frames in flight, depth {:?})",
            context.physical_device.name(),
            frame_count,
            depth_format
        );

        Ok(Self {
            targets: Some(targets),
            frames,
            command_buffers,
            _command_pool: command_pool,
            render_pass,
            depth_format,
            logical,
        })
    }

    fn targets(&self) -> VulkanResult<&RenderTargets> {
        self.targets.as_ref().ok_or_else(|| VulkanError::InvalidOperation {
            reason: "render targets are not available".to_string(),
        })
    }

    /// Replace the render targets, handing the old swapchain over to the new one
    fn rebuild_targets(&mut self, context: &VulkanContext, mut options: SwapchainOptions) -> VulkanResult<()> {
        self.logical.wait_idle()?;

        let old = self.targets.take();
        let old_handle = old.as_ref().map_or(vk::SwapchainKHR::null(), |t| t.swapchain.handle());
        options.keep_format = old.as_ref().map(|t| t.swapchain.format().format);

        let swapchain = Swapchain::new(
            context,
            self.logical.device.clone(),
            self.logical.swapchain_loader.clone(),
            options,
            old_handle,
        )?;
        drop(old);

        self.targets = Some(RenderTargets::new(
            context,
            &self.logical,
            swapchain,
            self.render_pass.handle(),
            self.depth_format,
        )?);
        Ok(())
    }
}

impl Drop for DeviceResources {
    fn drop(&mut self) {
        // Errors are expected here after device loss
        if let Err(err) = self.logical.wait_idle() {
            log::debug!("wait_idle before teardown failed: {err}");
        }
    }
}

/// One recorded indexed draw
struct DrawCommand {
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
    vertex_buffer: vk::Buffer,
    index_buffer: vk::Buffer,
    index_count: u32,
    world_view_projection: [f32; 16],
}

/// Frame between `begin_frame` and `present`
struct PendingFrame {
    image_index: u32,
    frame_index: usize,
    clear: ClearValues,
    viewport: Viewport,
    draws: Vec<DrawCommand>,
}

/// Vulkan-backed graphics device
pub struct VulkanDevice {
    resources: Option<DeviceResources>,
    context: VulkanContext,
    settings: RendererConfig,
    requested: OutputSize,
    color_space: ColorSpace,
    pending: Option<PendingFrame>,
    current_frame: usize,
    generation: u64,
}

impl VulkanDevice {
    /// Create the instance, surface, logical device and swapchain for `window`
    pub fn new(window: &mut Window, settings: &RendererConfig) -> VulkanResult<Self> {
        let context = VulkanContext::new(window, settings)?;
        let (width, height) = window.framebuffer_size();

        let mut device = Self {
            resources: None,
            context,
            settings: settings.clone(),
            requested: OutputSize::new(width.max(1), height.max(1)),
            color_space: ColorSpace::Srgb,
            pending: None,
            current_frame: 0,
            generation: 0,
        };

        device.create_resources()?;
        Ok(device)
    }

    /// Block until the GPU has finished all submitted work
    pub fn wait_idle(&self) -> VulkanResult<()> {
        match &self.resources {
            Some(resources) => resources.logical.wait_idle(),
            None => Ok(()),
        }
    }

    /// Negotiated output color space
    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    fn swapchain_options(&self) -> SwapchainOptions {
        SwapchainOptions {
            extent: vk::Extent2D {
                width: self.requested.width,
                height: self.requested.height,
            },
            vsync: self.settings.vsync,
            enable_hdr: self.settings.enable_hdr,
            keep_format: None,
        }
    }

    fn create_resources(&mut self) -> VulkanResult<()> {
        let resources = DeviceResources::new(&self.context, &self.settings, self.swapchain_options())?;
        self.color_space = resources.targets()?.swapchain.color_space();
        self.resources = Some(resources);
        self.current_frame = 0;
        Ok(())
    }

    fn resources(&self) -> VulkanResult<&DeviceResources> {
        self.resources.as_ref().ok_or_else(no_device)
    }

    fn rebuild_targets(&mut self) -> VulkanResult<()> {
        let options = self.swapchain_options();
        let resources = self.resources.as_mut().ok_or_else(no_device)?;
        resources.rebuild_targets(&self.context, options)?;
        self.color_space = resources.targets()?.swapchain.color_space();
        log::debug!("Render targets rebuilt at {}x{}", self.requested.width, self.requested.height);
        Ok(())
    }

    /// Wait for the frame slot and acquire an image; `None` means the swapchain was out of date
    fn acquire(&self) -> VulkanResult<Option<u32>> {
        let resources = self.resources()?;
        let frame = &resources.frames[self.current_frame];
        frame.in_flight.wait(u64::MAX)?;

        let swapchain = resources.targets()?.swapchain.handle();
        let acquired = unsafe {
            resources.logical.swapchain_loader.acquire_next_image(
                swapchain,
                u64::MAX,
                frame.image_available.handle(),
                vk::Fence::null(),
            )
        };

        match acquired {
            Ok((image_index, _suboptimal)) => Ok(Some(image_index)),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(None),
            Err(err) => Err(VulkanError::Api(err)),
        }
    }

    /// Record, submit and present `frame`; returns whether the swapchain needs rebuilding
    fn submit_and_present(&self, frame: &PendingFrame) -> VulkanResult<bool> {
        let resources = self.resources()?;
        let targets = resources.targets()?;
        let sync = &resources.frames[frame.frame_index];
        let device = &resources.logical.device;
        let image = frame.image_index as usize;

        let extent = targets.swapchain.extent();
        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue { float32: frame.clear.color },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: frame.clear.depth,
                    stencil: frame.clear.stencil,
                },
            },
        ];

        let mut recorder = CommandRecorder::begin(device.clone(), resources.command_buffers[frame.frame_index])?;
        {
            let mut pass = recorder.begin_render_pass(
                resources.render_pass.handle(),
                targets.framebuffers[image].handle(),
                render_area,
                &clear_values,
            );
            pass.set_viewport(&to_vk_viewport(frame.viewport));
            pass.set_scissor(&render_area);

            for draw in &frame.draws {
                pass.bind_pipeline(draw.pipeline);
                pass.bind_vertex_buffer(draw.vertex_buffer);
                pass.bind_index_buffer(draw.index_buffer);
                pass.push_vertex_constants(draw.layout, bytemuck::cast_slice(draw.world_view_projection.as_slice()));
                pass.draw_indexed(draw.index_count);
            }
        }
        let command_buffer = recorder.end()?;

        let wait_semaphores = [sync.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [command_buffer];
        let signal_semaphores = [targets.render_finished[image].handle()];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        sync.in_flight.reset()?;
        unsafe {
            device
                .queue_submit(resources.logical.graphics_queue, &[submit_info], sync.in_flight.handle())
                .map_err(VulkanError::Api)?;
        }

        let swapchains = [targets.swapchain.handle()];
        let image_indices = [frame.image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&signal_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let presented = unsafe {
            resources
                .logical
                .swapchain_loader
                .queue_present(resources.logical.present_queue, &present_info)
        };

        match presented {
            Ok(suboptimal) => Ok(suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(true),
            Err(err) => Err(VulkanError::Api(err)),
        }
    }

    fn check_generation(&self, generation: u64) -> DeviceResult<()> {
        if generation == self.generation {
            Ok(())
        } else {
            Err(DeviceError::Fatal(format!(
                "resource from device generation {generation} used on generation {}",
                self.generation
            )))
        }
    }
}

impl GraphicsDevice for VulkanDevice {
    type Mesh = VulkanMesh;
    type Effect = VulkanEffect;

    fn output_size(&self) -> OutputSize {
        self.resources
            .as_ref()
            .and_then(|resources| resources.targets.as_ref())
            .map_or(self.requested, |targets| {
                let extent = targets.swapchain.extent();
                OutputSize::new(extent.width, extent.height)
            })
    }

    fn window_size_changed(&mut self, width: u32, height: u32) -> DeviceResult<bool> {
        let size = OutputSize::new(width.max(1), height.max(1));
        if size == self.requested && self.output_size() == size {
            self.update_color_space()?;
            return Ok(false);
        }

        self.requested = size;
        self.rebuild_targets()?;
        Ok(true)
    }

    fn create_mesh(&mut self, mesh: &RenderableMesh) -> DeviceResult<VulkanMesh> {
        let resources = self.resources()?;
        let device = resources.logical.device.clone();

        let vertex_buffer = VertexBuffer::new(&self.context, device.clone(), mesh.vertex_bytes())?;
        let index_buffer = IndexBuffer::new(&self.context, device, mesh.indices())?;

        Ok(VulkanMesh {
            vertex_buffer,
            index_buffer,
            generation: self.generation,
        })
    }

    fn create_effect(&mut self, format: &VertexFormat) -> DeviceResult<VulkanEffect> {
        let resources = self.resources()?;
        let device = resources.logical.device.clone();
        let shaders = &self.settings.shaders;

        let vertex_shader = ShaderModule::from_file(device.clone(), &shaders.vertex_shader_path)?;
        let fragment_shader = ShaderModule::from_file(device.clone(), &shaders.fragment_shader_path)?;
        let layout = VulkanVertexLayout::from_format(format);

        let pipeline = GraphicsPipeline::new(
            device,
            resources.render_pass.handle(),
            &vertex_shader,
            &fragment_shader,
            &layout,
        )?;

        Ok(VulkanEffect {
            pipeline,
            generation: self.generation,
        })
    }

    fn begin_frame(&mut self, clear: &ClearValues) -> DeviceResult<()> {
        self.pending = None;

        let Some(image_index) = self.acquire()? else {
            // Skip this frame; the next one renders into the new swapchain
            self.rebuild_targets()?;
            return Ok(());
        };

        self.pending = Some(PendingFrame {
            image_index,
            frame_index: self.current_frame,
            clear: *clear,
            viewport: self.screen_viewport(),
            draws: Vec::new(),
        });
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        if let Some(frame) = self.pending.as_mut() {
            frame.viewport = viewport;
        }
    }

    fn draw_indexed(&mut self, mesh: &VulkanMesh, effect: &VulkanEffect, transforms: &TransformSet) -> DeviceResult<()> {
        self.check_generation(mesh.generation)?;
        self.check_generation(effect.generation)?;

        let Some(frame) = self.pending.as_mut() else {
            return Ok(());
        };

        let mut world_view_projection = [0.0_f32; 16];
        world_view_projection.copy_from_slice(transforms.world_view_projection().as_slice());

        frame.draws.push(DrawCommand {
            pipeline: effect.pipeline.handle(),
            layout: effect.pipeline.layout(),
            vertex_buffer: mesh.vertex_buffer.handle(),
            index_buffer: mesh.index_buffer.handle(),
            index_count: mesh.index_count(),
            world_view_projection,
        });
        Ok(())
    }

    fn present(&mut self) -> DeviceResult<()> {
        let Some(frame) = self.pending.take() else {
            return Ok(());
        };

        let needs_rebuild = self.submit_and_present(&frame)?;
        let frame_count = self.resources()?.frames.len();
        self.current_frame = (self.current_frame + 1) % frame_count;

        if needs_rebuild {
            self.rebuild_targets()?;
        }
        Ok(())
    }

    fn update_color_space(&mut self) -> DeviceResult<ColorSpace> {
        let current = self.resources()?.targets()?.swapchain.format();
        let available = self.context.surface_formats()?;
        let enable_hdr = self.settings.enable_hdr && self.context.instance.hdr_color_spaces();

        if let Some(preferred) = choose_surface_format(&available, enable_hdr, Some(current.format)) {
            if preferred.color_space != current.color_space {
                log::info!("Output color space changing to {:?}", preferred.color_space);
                self.rebuild_targets()?;
            }
        }

        Ok(self.color_space)
    }

    fn handle_device_lost<N: DeviceNotify<Self>>(&mut self, notify: &mut N) -> DeviceResult<()> {
        log::warn!("Graphics device lost; recreating device resources");

        notify.on_device_lost();

        self.pending = None;
        self.resources = None;
        self.generation += 1;
        self.create_resources()?;

        notify.on_device_restored(self)
    }
}

fn no_device() -> VulkanError {
    VulkanError::InvalidOperation {
        reason: "no logical device".to_string(),
    }
}

/// Vulkan viewport for an engine viewport
fn to_vk_viewport(viewport: Viewport) -> vk::Viewport {
    vk::Viewport {
        x: viewport.x,
        y: viewport.y,
        width: viewport.width,
        height: viewport.height,
        min_depth: viewport.min_depth,
        max_depth: viewport.max_depth,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_conversion_keeps_depth_range() {
        let viewport = to_vk_viewport(OutputSize::new(800, 600).full_viewport());
        assert_eq!((viewport.x, viewport.y), (0.0, 0.0));
        assert_eq!((viewport.width, viewport.height), (800.0, 600.0));
        assert_eq!((viewport.min_depth, viewport.max_depth), (0.0, 1.0));
    }
}
