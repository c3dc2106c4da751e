//! The frame lifecycle controller

use crate::core::config::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::foundation::time::{FrameClock, MonotonicTime, TimeSource};
use crate::input::KeyCode;
use crate::platform::Platform;
use crate::render::{
    CameraRig, ClearValues, DeviceError, DeviceNotify, DeviceResult, GraphicsDevice, OutputSize, RenderableMesh,
    TransformSet, Vertex,
};

use super::state::{LifecycleError, LifecycleEvent, LifecycleResult, LifecycleState};

/// Client size used when the platform has no better idea
pub const DEFAULT_SIZE: OutputSize = OutputSize::new(DEFAULT_WIDTH, DEFAULT_HEIGHT);

/// What happened to the frame during a render call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Nothing drawn: no update has run yet, or resources are not ready
    Skipped,
    /// Drawn and presented
    Presented,
    /// The device was lost mid-frame; resources were rebuilt and the frame dropped
    Recovered,
}

/// Summary of one [`FrameLifecycle::tick`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Updates run by the clock this tick
    pub updates: u32,
    /// Render result
    pub frame: FrameOutcome,
    /// Whether the exit key asked the platform to terminate
    pub exit_requested: bool,
}

/// Owns device resources and sequences create / update / render / recover.
///
/// The controller never owns the device. Each operation borrows it, and
/// device loss is routed back here through [`DeviceNotify`].
pub struct FrameLifecycle<D: GraphicsDevice, T: TimeSource = MonotonicTime> {
    geometry: RenderableMesh,
    camera: CameraRig,
    clear: ClearValues,
    exit_key: KeyCode,

    mesh: Option<D::Mesh>,
    effect: Option<D::Effect>,

    clock: FrameClock<T>,
    transforms: TransformSet,
    state: LifecycleState,
    active: bool,

    device_resource_builds: u64,
    size_resource_builds: u64,
}

impl<D: GraphicsDevice, T: TimeSource> FrameLifecycle<D, T> {
    /// Create a controller for `geometry`, cleared to `clear` every frame
    pub fn new(geometry: RenderableMesh, clock: FrameClock<T>, clear: ClearValues) -> Self {
        Self {
            geometry,
            camera: CameraRig::default(),
            clear,
            exit_key: KeyCode::Escape,
            mesh: None,
            effect: None,
            clock,
            transforms: TransformSet::default(),
            state: LifecycleState::Uninitialized,
            active: true,
            device_resource_builds: 0,
            size_resource_builds: 0,
        }
    }

    /// Replace the fixed camera
    pub fn with_camera(mut self, camera: CameraRig) -> Self {
        self.camera = camera;
        self
    }

    /// Replace the exit key
    pub fn with_exit_key(mut self, key: KeyCode) -> Self {
        self.exit_key = key;
        self
    }

    /// Preferred initial client size
    pub fn default_size() -> OutputSize {
        DEFAULT_SIZE
    }

    /// Create device-dependent, then window-size-dependent resources
    pub fn initialize(&mut self, device: &mut D) -> LifecycleResult<()> {
        log::info!("Initializing frame lifecycle");
        self.create_device_dependent_resources(device, LifecycleEvent::DeviceCreated)?;
        self.create_window_size_dependent_resources(device, LifecycleEvent::SizeResourcesCreated)?;
        Ok(())
    }

    /// Advance the clock, run its updates, then render once
    pub fn tick<P: Platform>(&mut self, device: &mut D, platform: &mut P) -> LifecycleResult<TickReport> {
        let steps = self.clock.advance();
        let output = device.output_size();

        let mut exit_requested = false;
        for _ in 0..steps.updates {
            self.update(steps.elapsed_seconds, output, platform, &mut exit_requested);
        }

        let frame = self.render(device)?;

        Ok(TickReport {
            updates: steps.updates,
            frame,
            exit_requested,
        })
    }

    fn update<P: Platform>(&mut self, elapsed_seconds: f64, output: OutputSize, platform: &mut P, exit_requested: &mut bool) {
        log::trace!("Update: elapsed {elapsed_seconds:.5}s, output {}x{}", output.width, output.height);

        if !*exit_requested && platform.keyboard().is_down(self.exit_key) {
            log::info!("Exit key pressed, requesting shutdown");
            platform.request_exit();
            *exit_requested = true;
        }

        self.transforms = TransformSet::compute(&self.camera, output.aspect_ratio());
    }

    /// Clear, draw the mesh once and present.
    ///
    /// Does nothing until the first update has run. A lost device is
    /// recovered here and reported as [`FrameOutcome::Recovered`]; any other
    /// device failure is returned.
    pub fn render(&mut self, device: &mut D) -> LifecycleResult<FrameOutcome> {
        if self.clock.frame_count() == 0 || !self.state.can_render() {
            return Ok(FrameOutcome::Skipped);
        }

        let (Some(mesh), Some(effect)) = (self.mesh.as_ref(), self.effect.as_ref()) else {
            return Ok(FrameOutcome::Skipped);
        };

        let result = draw_frame(device, mesh, effect, &self.transforms, &self.clear);
        match self.recover_if_lost(device, result)? {
            Some(()) => Ok(FrameOutcome::Presented),
            None => Ok(FrameOutcome::Recovered),
        }
    }

    /// Forward a new client size to the device; rebuild size-dependent state only if it changed
    pub fn on_window_size_changed(&mut self, device: &mut D, width: u32, height: u32) -> LifecycleResult<bool> {
        let result = device.window_size_changed(width, height);
        let Some(changed) = self.recover_if_lost(device, result)? else {
            return Ok(true);
        };

        if !changed {
            return Ok(false);
        }

        self.create_window_size_dependent_resources(device, LifecycleEvent::SizeChanged)?;
        Ok(true)
    }

    /// Re-report the current output size after the window moved between monitors
    pub fn on_window_moved(&mut self, device: &mut D) -> LifecycleResult<()> {
        let size = device.output_size();
        let result = device.window_size_changed(size.width, size.height);
        self.recover_if_lost(device, result)?;
        Ok(())
    }

    /// Let the device renegotiate its color space
    pub fn on_display_change(&mut self, device: &mut D) -> LifecycleResult<()> {
        let result = device.update_color_space();
        if let Some(color_space) = self.recover_if_lost(device, result)? {
            log::info!("Display changed, output color space {color_space:?}");
        }
        Ok(())
    }

    /// Window became the active window
    pub fn on_activated(&mut self) {
        log::debug!("Activated");
        self.active = true;
    }

    /// Window stopped being the active window
    pub fn on_deactivated(&mut self) {
        log::debug!("Deactivated");
        self.active = false;
    }

    /// Application is being suspended (minimized)
    pub fn on_suspending(&mut self) {
        log::info!("Suspending");
    }

    /// Application resumed; the suspended interval is not reported as elapsed time
    pub fn on_resuming(&mut self) {
        log::info!("Resuming");
        self.clock.reset_elapsed_time();
    }

    /// Release every device resource ahead of device teardown
    pub fn shutdown(&mut self) {
        self.release_device_resources();
        self.state = LifecycleState::Uninitialized;
        log::info!("Frame lifecycle shut down");
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Matrices computed by the latest update
    pub fn transforms(&self) -> &TransformSet {
        &self.transforms
    }

    /// Frame clock
    pub fn clock(&self) -> &FrameClock<T> {
        &self.clock
    }

    /// Whether the window is currently active
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the mesh and effect handles currently exist
    pub fn has_device_resources(&self) -> bool {
        self.mesh.is_some() && self.effect.is_some()
    }

    /// Times device-dependent resources have been created
    pub fn device_resource_builds(&self) -> u64 {
        self.device_resource_builds
    }

    /// Times window-size-dependent resources have been created
    pub fn size_resource_builds(&self) -> u64 {
        self.size_resource_builds
    }

    fn next_state(&self, event: LifecycleEvent) -> LifecycleResult<LifecycleState> {
        self.state.next(event).ok_or(LifecycleError::InvalidTransition {
            state: self.state,
            event,
        })
    }

    fn create_device_dependent_resources(&mut self, device: &mut D, event: LifecycleEvent) -> LifecycleResult<()> {
        let next = self.next_state(event)?;

        let effect = device.create_effect(&Vertex::FORMAT)?;
        let mesh = device.create_mesh(&self.geometry)?;
        self.effect = Some(effect);
        self.mesh = Some(mesh);

        self.state = next;
        self.device_resource_builds += 1;
        log::debug!(
            "Device resources created: {} vertices, {} indices",
            self.geometry.vertex_count(),
            self.geometry.index_count()
        );
        Ok(())
    }

    fn create_window_size_dependent_resources(&mut self, device: &D, event: LifecycleEvent) -> LifecycleResult<()> {
        let next = self.next_state(event)?;
        let size = device.output_size();

        self.state = next;
        self.size_resource_builds += 1;
        log::debug!("Size-dependent resources created for {}x{}", size.width, size.height);
        Ok(())
    }

    fn release_device_resources(&mut self) {
        self.mesh = None;
        self.effect = None;
    }

    fn recover_if_lost<R>(&mut self, device: &mut D, result: DeviceResult<R>) -> LifecycleResult<Option<R>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(DeviceError::Lost) => {
                log::warn!("Graphics device lost, rebuilding device resources");
                device.handle_device_lost(self)?;
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn draw_frame<D: GraphicsDevice>(
    device: &mut D,
    mesh: &D::Mesh,
    effect: &D::Effect,
    transforms: &TransformSet,
    clear: &ClearValues,
) -> DeviceResult<()> {
    device.begin_frame(clear)?;
    let viewport = device.screen_viewport();
    device.set_viewport(viewport);
    device.draw_indexed(mesh, effect, transforms)?;
    device.present()
}

impl<D: GraphicsDevice, T: TimeSource> DeviceNotify<D> for FrameLifecycle<D, T> {
    fn on_device_lost(&mut self) {
        match self.next_state(LifecycleEvent::DeviceLost) {
            Ok(next) => self.state = next,
            Err(err) => log::warn!("{err}"),
        }
        self.release_device_resources();
    }

    fn on_device_restored(&mut self, device: &mut D) -> DeviceResult<()> {
        self.create_device_dependent_resources(device, LifecycleEvent::DeviceRestored)
            .and_then(|()| self.create_window_size_dependent_resources(device, LifecycleEvent::SizeResourcesCreated))
            .map_err(|err| match err {
                LifecycleError::Device(err) => err,
                other => DeviceError::Fatal(other.to_string()),
            })?;

        log::info!("Device resources restored");
        Ok(())
    }
}
