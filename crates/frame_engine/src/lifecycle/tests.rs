//! Lifecycle tests against a scripted device

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;

use approx::assert_relative_eq;

use super::*;
use crate::core::config::CORNFLOWER_BLUE;
use crate::foundation::math::{Mat4, Mat4Ext};
use crate::foundation::time::{FrameClock, ManualTime, TimestepMode, DEFAULT_MAX_DELTA};
use crate::input::{KeyCode, KeyboardState, MouseState};
use crate::platform::Platform;
use crate::render::{
    CameraRig, ClearValues, ColorSpace, DeviceError, DeviceNotify, DeviceResult, GraphicsDevice, OutputSize,
    RenderableMesh, TransformSet, VertexFormat, Viewport,
};

const FRAME_16MS: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, PartialEq)]
struct DrawCall {
    mesh_id: u64,
    effect_id: u64,
    index_count: u32,
    transforms: TransformSet,
}

/// Everything the mock device has been asked to do
#[derive(Debug, Default)]
struct Ledger {
    next_id: u64,
    live: HashSet<u64>,
    released: Vec<u64>,
    begins: Vec<ClearValues>,
    viewports: Vec<Viewport>,
    draws: Vec<DrawCall>,
    presents: u32,
    size_reports: Vec<(u32, u32)>,
    color_space_updates: u32,
    devices_rebuilt: u32,
}

type SharedLedger = Rc<RefCell<Ledger>>;

/// Device resource that records its own release
#[derive(Debug)]
struct MockHandle {
    id: u64,
    generation: u32,
    ledger: SharedLedger,
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        let mut ledger = self.ledger.borrow_mut();
        assert!(ledger.live.remove(&self.id), "handle {} released twice", self.id);
        ledger.released.push(self.id);
    }
}

struct MockMesh {
    handle: MockHandle,
    index_count: u32,
}

struct MockEffect {
    handle: MockHandle,
    stride: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    Lost,
    Fatal,
}

struct MockDevice {
    ledger: SharedLedger,
    size: OutputSize,
    generation: u32,
    viewport: Option<Viewport>,
    in_frame: bool,
    fail_next_present: Option<Failure>,
    lose_on_next_resize: bool,
}

impl MockDevice {
    fn new(width: u32, height: u32) -> Self {
        Self {
            ledger: SharedLedger::default(),
            size: OutputSize::new(width, height),
            generation: 0,
            viewport: None,
            in_frame: false,
            fail_next_present: None,
            lose_on_next_resize: false,
        }
    }

    fn allocate(&self) -> MockHandle {
        let mut ledger = self.ledger.borrow_mut();
        let id = ledger.next_id;
        ledger.next_id += 1;
        ledger.live.insert(id);
        MockHandle {
            id,
            generation: self.generation,
            ledger: Rc::clone(&self.ledger),
        }
    }
}

impl GraphicsDevice for MockDevice {
    type Mesh = MockMesh;
    type Effect = MockEffect;

    fn output_size(&self) -> OutputSize {
        self.size
    }

    fn window_size_changed(&mut self, width: u32, height: u32) -> DeviceResult<bool> {
        self.ledger.borrow_mut().size_reports.push((width, height));
        if std::mem::take(&mut self.lose_on_next_resize) {
            self.size = OutputSize::new(width, height);
            return Err(DeviceError::Lost);
        }
        if self.size == OutputSize::new(width, height) {
            return Ok(false);
        }
        self.size = OutputSize::new(width, height);
        Ok(true)
    }

    fn create_mesh(&mut self, mesh: &RenderableMesh) -> DeviceResult<Self::Mesh> {
        Ok(MockMesh {
            handle: self.allocate(),
            index_count: mesh.index_count(),
        })
    }

    fn create_effect(&mut self, format: &VertexFormat) -> DeviceResult<Self::Effect> {
        Ok(MockEffect {
            handle: self.allocate(),
            stride: format.stride,
        })
    }

    fn begin_frame(&mut self, clear: &ClearValues) -> DeviceResult<()> {
        assert!(!self.in_frame, "begin_frame while a frame is open");
        self.in_frame = true;
        self.ledger.borrow_mut().begins.push(*clear);
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
        self.ledger.borrow_mut().viewports.push(viewport);
    }

    fn draw_indexed(&mut self, mesh: &Self::Mesh, effect: &Self::Effect, transforms: &TransformSet) -> DeviceResult<()> {
        assert!(self.in_frame, "draw outside a frame");
        assert!(self.viewport.is_some(), "draw before a viewport was set");
        assert_eq!(mesh.handle.generation, self.generation, "mesh from a lost device");
        assert_eq!(effect.handle.generation, self.generation, "effect from a lost device");
        assert_eq!(effect.stride, 28);

        self.ledger.borrow_mut().draws.push(DrawCall {
            mesh_id: mesh.handle.id,
            effect_id: effect.handle.id,
            index_count: mesh.index_count,
            transforms: *transforms,
        });
        Ok(())
    }

    fn present(&mut self) -> DeviceResult<()> {
        self.in_frame = false;
        match self.fail_next_present.take() {
            Some(Failure::Lost) => Err(DeviceError::Lost),
            Some(Failure::Fatal) => Err(DeviceError::Fatal("out of memory".to_string())),
            None => {
                self.ledger.borrow_mut().presents += 1;
                Ok(())
            }
        }
    }

    fn update_color_space(&mut self) -> DeviceResult<ColorSpace> {
        self.ledger.borrow_mut().color_space_updates += 1;
        Ok(ColorSpace::Srgb)
    }

    fn handle_device_lost<N: DeviceNotify<Self>>(&mut self, notify: &mut N) -> DeviceResult<()> {
        notify.on_device_lost();
        self.generation += 1;
        self.in_frame = false;
        self.viewport = None;
        self.ledger.borrow_mut().devices_rebuilt += 1;
        notify.on_device_restored(self)
    }
}

#[derive(Default)]
struct MockPlatform {
    keyboard: KeyboardState,
    exit_requests: u32,
}

impl Platform for MockPlatform {
    fn keyboard(&self) -> KeyboardState {
        self.keyboard.clone()
    }

    fn mouse(&self) -> MouseState {
        MouseState::default()
    }

    fn request_exit(&mut self) {
        self.exit_requests += 1;
    }
}

struct Harness {
    lifecycle: FrameLifecycle<MockDevice, ManualTime>,
    device: MockDevice,
    platform: MockPlatform,
    time: ManualTime,
    ledger: SharedLedger,
}

impl Harness {
    fn new(mode: TimestepMode) -> Self {
        let time = ManualTime::new();
        let clock = FrameClock::with_source(time.clone(), mode, DEFAULT_MAX_DELTA);
        let mut lifecycle = FrameLifecycle::new(
            RenderableMesh::triangle(),
            clock,
            ClearValues::with_color(CORNFLOWER_BLUE),
        );
        let mut device = MockDevice::new(DEFAULT_SIZE.width, DEFAULT_SIZE.height);
        let ledger = Rc::clone(&device.ledger);
        lifecycle.initialize(&mut device).unwrap();

        Self {
            lifecycle,
            device,
            platform: MockPlatform::default(),
            time,
            ledger,
        }
    }

    fn variable() -> Self {
        Self::new(TimestepMode::Variable)
    }

    fn tick(&mut self, delta: Duration) -> TickReport {
        self.time.advance(delta);
        self.lifecycle.tick(&mut self.device, &mut self.platform).unwrap()
    }

    fn resize(&mut self, width: u32, height: u32) -> bool {
        self.lifecycle
            .on_window_size_changed(&mut self.device, width, height)
            .unwrap()
    }

    fn live_ids(&self) -> HashSet<u64> {
        self.ledger.borrow().live.clone()
    }
}

#[test]
fn test_initialize_creates_mesh_and_effect() {
    let h = Harness::variable();
    assert_eq!(h.lifecycle.state(), LifecycleState::SizeReady);
    assert!(h.lifecycle.has_device_resources());
    assert_eq!(h.lifecycle.device_resource_builds(), 1);
    assert_eq!(h.lifecycle.size_resource_builds(), 1);
    assert_eq!(h.live_ids().len(), 2);
}

#[test]
fn test_render_before_first_update_draws_nothing() {
    let mut h = Harness::variable();
    let outcome = h.lifecycle.render(&mut h.device).unwrap();

    assert_eq!(outcome, FrameOutcome::Skipped);
    let ledger = h.ledger.borrow();
    assert!(ledger.begins.is_empty());
    assert!(ledger.draws.is_empty());
    assert_eq!(ledger.presents, 0);
}

/// A fixed-step tick shorter than one step runs no update, so nothing is drawn yet
#[test]
fn test_fixed_step_tick_without_update_skips_render() {
    let mut h = Harness::new(TimestepMode::Fixed { target_seconds: 1.0 / 30.0 });
    let report = h.tick(FRAME_16MS);

    assert_eq!(report.updates, 0);
    assert_eq!(report.frame, FrameOutcome::Skipped);
    assert!(h.ledger.borrow().draws.is_empty());

    let report = h.tick(FRAME_16MS + Duration::from_millis(2));
    assert_eq!(report.updates, 1);
    assert_eq!(report.frame, FrameOutcome::Presented);
}

#[test]
fn test_world_is_identity_after_every_update() {
    let mut h = Harness::variable();
    for millis in [1, 16, 33, 99, 250] {
        h.tick(Duration::from_millis(millis));
        assert_eq!(h.lifecycle.transforms().world, Mat4::identity());
    }
}

#[test]
fn test_first_tick_at_default_size() {
    let mut h = Harness::variable();
    let report = h.tick(FRAME_16MS);

    assert_eq!(report.updates, 1);
    assert_eq!(report.frame, FrameOutcome::Presented);
    assert!(!report.exit_requested);
    assert_relative_eq!(h.lifecycle.clock().elapsed_seconds(), 0.016, epsilon = 1e-9);

    let camera = CameraRig::default();
    let transforms = h.lifecycle.transforms();
    assert_relative_eq!(transforms.view, camera.view(), epsilon = 1e-6);
    assert_relative_eq!(transforms.projection, camera.projection(800.0 / 600.0), epsilon = 1e-6);
    assert_relative_eq!(transforms.projection.projection_aspect(), 4.0 / 3.0, epsilon = 1e-5);

    let ledger = h.ledger.borrow();
    assert_eq!(ledger.begins, vec![ClearValues::with_color(CORNFLOWER_BLUE)]);
    assert_eq!(ledger.viewports, vec![OutputSize::new(800, 600).full_viewport()]);
    assert_eq!(ledger.draws.len(), 1);
    assert_eq!(ledger.draws[0].index_count, RenderableMesh::triangle().index_count());
    assert_eq!(ledger.draws[0].index_count, 3);
    assert_eq!(ledger.draws[0].transforms, *transforms);
    assert_eq!(ledger.presents, 1);
}

#[test]
fn test_projection_aspect_follows_output_size() {
    let mut h = Harness::variable();
    for (width, height) in [(1920, 1080), (640, 480), (1000, 250), (333, 777)] {
        assert!(h.resize(width, height));
        h.tick(FRAME_16MS);

        let expected = width as f32 / height as f32;
        assert_relative_eq!(
            h.lifecycle.transforms().projection.projection_aspect(),
            expected,
            epsilon = 1e-4
        );
    }
}

#[test]
fn test_resize_to_same_size_rebuilds_once() {
    let mut h = Harness::variable();
    let before = h.lifecycle.size_resource_builds();

    assert!(h.resize(1024, 768));
    assert!(!h.resize(1024, 768));

    assert_eq!(h.lifecycle.size_resource_builds(), before + 1);
    assert_eq!(h.lifecycle.device_resource_builds(), 1);
}

#[test]
fn test_window_moved_reports_current_size() {
    let mut h = Harness::variable();
    let before = h.lifecycle.size_resource_builds();

    h.lifecycle.on_window_moved(&mut h.device).unwrap();

    assert_eq!(h.ledger.borrow().size_reports, vec![(800, 600)]);
    assert_eq!(h.lifecycle.size_resource_builds(), before);
}

#[test]
fn test_device_lost_during_present_recreates_resources() {
    let mut h = Harness::variable();
    h.tick(FRAME_16MS);
    let old_ids = h.live_ids();

    h.device.fail_next_present = Some(Failure::Lost);
    let report = h.tick(FRAME_16MS);
    assert_eq!(report.frame, FrameOutcome::Recovered);

    let new_ids = h.live_ids();
    assert_eq!(new_ids.len(), 2);
    assert!(old_ids.is_disjoint(&new_ids), "restored handles alias lost ones");
    {
        let ledger = h.ledger.borrow();
        assert_eq!(ledger.devices_rebuilt, 1);
        let released: HashSet<u64> = ledger.released.iter().copied().collect();
        assert_eq!(released, old_ids);
        assert_eq!(ledger.released.len(), old_ids.len());
    }
    assert_eq!(h.lifecycle.state(), LifecycleState::SizeReady);
    assert_eq!(h.lifecycle.device_resource_builds(), 2);

    let report = h.tick(FRAME_16MS);
    assert_eq!(report.frame, FrameOutcome::Presented);
    let ledger = h.ledger.borrow();
    let last = ledger.draws.last().unwrap();
    assert!(new_ids.contains(&last.mesh_id));
    assert!(new_ids.contains(&last.effect_id));
    assert_eq!(ledger.presents, 2);
}

#[test]
fn test_device_lost_during_resize_recovers() {
    let mut h = Harness::variable();
    let old_ids = h.live_ids();

    h.device.lose_on_next_resize = true;
    assert!(h.resize(1280, 720));

    assert!(old_ids.is_disjoint(&h.live_ids()));
    assert_eq!(h.lifecycle.state(), LifecycleState::SizeReady);

    h.tick(FRAME_16MS);
    assert_relative_eq!(
        h.lifecycle.transforms().projection.projection_aspect(),
        1280.0 / 720.0,
        epsilon = 1e-4
    );
}

#[test]
fn test_fatal_device_error_propagates() {
    let mut h = Harness::variable();
    h.device.fail_next_present = Some(Failure::Fatal);
    h.time.advance(FRAME_16MS);

    let err = h.lifecycle.tick(&mut h.device, &mut h.platform).unwrap_err();
    assert!(matches!(err, LifecycleError::Device(DeviceError::Fatal(_))));
    assert_eq!(h.ledger.borrow().devices_rebuilt, 0);
}

#[test]
fn test_escape_requests_exit_once_per_tick() {
    let mut h = Harness::variable();
    h.platform.keyboard.press(KeyCode::Escape);

    let report = h.tick(FRAME_16MS);
    assert!(report.exit_requested);
    assert_eq!(h.platform.exit_requests, 1);

    h.tick(FRAME_16MS);
    assert_eq!(h.platform.exit_requests, 2);
}

#[test]
fn test_escape_requests_exit_once_across_fixed_updates() {
    let mut h = Harness::new(TimestepMode::Fixed { target_seconds: 1.0 / 60.0 });
    h.platform.keyboard.press(KeyCode::Escape);

    let report = h.tick(Duration::from_millis(60));
    assert_eq!(report.updates, 3);
    assert!(report.exit_requested);
    assert_eq!(h.platform.exit_requests, 1);
}

#[test]
fn test_other_keys_do_not_exit() {
    let mut h = Harness::variable();
    h.platform.keyboard.press(KeyCode::Space);
    h.platform.keyboard.press(KeyCode::Letter('Q'));

    let report = h.tick(FRAME_16MS);
    assert!(!report.exit_requested);
    assert_eq!(h.platform.exit_requests, 0);
}

#[test]
fn test_resume_discards_suspended_interval() {
    let mut h = Harness::variable();
    h.tick(FRAME_16MS);

    h.lifecycle.on_suspending();
    h.time.advance(Duration::from_secs(30));
    h.lifecycle.on_resuming();

    h.tick(FRAME_16MS);
    assert_relative_eq!(h.lifecycle.clock().elapsed_seconds(), 0.016, epsilon = 1e-9);
    assert_relative_eq!(h.lifecycle.clock().total_seconds(), 0.032, epsilon = 1e-9);
}

#[test]
fn test_display_change_updates_color_space() {
    let mut h = Harness::variable();
    h.lifecycle.on_display_change(&mut h.device).unwrap();
    assert_eq!(h.ledger.borrow().color_space_updates, 1);
}

#[test]
fn test_activation_tracking() {
    let mut h = Harness::variable();
    assert!(h.lifecycle.is_active());
    h.lifecycle.on_deactivated();
    assert!(!h.lifecycle.is_active());
    h.lifecycle.on_activated();
    assert!(h.lifecycle.is_active());
}

#[test]
fn test_initialize_twice_is_rejected_without_leaking() {
    let mut h = Harness::variable();
    let ids = h.live_ids();

    let err = h.lifecycle.initialize(&mut h.device).unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::InvalidTransition {
            state: LifecycleState::SizeReady,
            event: LifecycleEvent::DeviceCreated,
        }
    ));
    assert_eq!(h.live_ids(), ids);
}

#[test]
fn test_resize_before_initialize_is_rejected() {
    let time = ManualTime::new();
    let clock = FrameClock::with_source(time, TimestepMode::Variable, DEFAULT_MAX_DELTA);
    let mut lifecycle: FrameLifecycle<MockDevice, ManualTime> =
        FrameLifecycle::new(RenderableMesh::triangle(), clock, ClearValues::with_color(CORNFLOWER_BLUE));
    let mut device = MockDevice::new(800, 600);

    let err = lifecycle.on_window_size_changed(&mut device, 640, 480).unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
    assert_eq!(lifecycle.state(), LifecycleState::Uninitialized);
}

#[test]
fn test_shutdown_releases_everything() {
    let mut h = Harness::variable();
    h.tick(FRAME_16MS);

    h.lifecycle.shutdown();

    assert_eq!(h.lifecycle.state(), LifecycleState::Uninitialized);
    assert!(!h.lifecycle.has_device_resources());
    assert!(h.live_ids().is_empty());
    assert_eq!(h.lifecycle.render(&mut h.device).unwrap(), FrameOutcome::Skipped);
}
