use bevy_liquid_surface::config::LiquidConfig;
use bevy_liquid_surface::cpu::compositor::{ContentFrame, ContentImage, ContentSource, EmptyContent, OutputSurface};
use bevy_liquid_surface::cpu::field::{FieldBuffer, GridSize};
use bevy_liquid_surface::cpu::pointer::PointerEvent;
use bevy_liquid_surface::error::{ContextLostError, LiquidError};
use bevy_liquid_surface::lifecycle::{FrameOutcome, LiquidSurface, Schedule, SurfaceBackend};
use glam::{UVec2, Vec2};

/// Backend that counts calls and can be told to lose its context.
#[derive(Default)]
struct RecordingBackend {
    allocations: Vec<(GridSize, UVec2)>,
    uploads: usize,
    releases: usize,
    /// Number of upcoming uploads that fail
    failing_uploads: usize,
}

impl SurfaceBackend for RecordingBackend {
    fn allocate(&mut self, grid: GridSize, output: UVec2) -> Result<(), ContextLostError> {
        self.allocations.push((grid, output));
        Ok(())
    }

    fn upload(&mut self, _field: &FieldBuffer, _output: &OutputSurface) -> Result<(), ContextLostError> {
        if self.failing_uploads > 0 {
            self.failing_uploads -= 1;
            return Err(ContextLostError::new("device lost"));
        }
        self.uploads += 1;
        Ok(())
    }

    fn release(&mut self) {
        self.releases += 1;
    }
}

/// Content that exists but is not usable yet.
struct Loading(ContentImage);

impl ContentSource for Loading {
    fn current_frame(&self) -> Option<ContentFrame<'_>> {
        self.0.current_frame()
    }

    fn ready(&self) -> bool {
        false
    }
}

fn running(width: f32, height: f32) -> LiquidSurface {
    let mut surface = LiquidSurface::new(LiquidConfig::default(), width, height).unwrap();
    surface.start();
    surface
}

#[test]
fn grid_follows_container_scale() {
    let surface = running(300.0, 50.0);
    assert_eq!(surface.grid_size(), Some(GridSize { width: 180, height: 30 }));
    assert_eq!(surface.schedule(), Schedule::Running);
}

#[test]
fn resize_discards_state() {
    let mut surface = running(100.0, 100.0);
    surface.handle_pointer(PointerEvent::Move { x: 50.0, y: 50.0 });
    for _ in 0..3 {
        assert_eq!(surface.frame(&EmptyContent), FrameOutcome::Stepped);
    }
    assert!(surface.field().unwrap().energy() > 0.0);

    surface.resize(300.0, 50.0);
    assert_eq!(surface.grid_size(), Some(GridSize { width: 180, height: 30 }));
    assert_eq!(surface.field().unwrap().energy(), 0.0);
    assert_eq!(surface.state().unwrap().frame, 0);
    let output = surface.output().unwrap();
    assert_eq!((output.width(), output.height()), (300, 50));
}

#[test]
fn degenerate_container_gets_one_cell() {
    let mut surface = running(100.0, 100.0);
    surface.resize(0.0, 0.0);
    assert_eq!(surface.grid_size(), Some(GridSize { width: 1, height: 1 }));
    assert_eq!(surface.frame(&EmptyContent), FrameOutcome::Stepped);
    let output = surface.output().unwrap();
    assert_eq!((output.width(), output.height()), (1, 1));
}

#[test]
fn ticket_from_before_resize_is_stale() {
    let mut surface = running(100.0, 100.0);
    let ticket = surface.request_frame().unwrap();
    surface.resize(120.0, 80.0);

    assert_eq!(surface.run_frame(ticket, &EmptyContent), FrameOutcome::Stale);
    assert_eq!(surface.state().unwrap().frame, 0);

    let fresh = surface.request_frame().unwrap();
    assert_eq!(fresh.generation(), ticket.generation() + 1);
    assert_eq!(surface.run_frame(fresh, &EmptyContent), FrameOutcome::Stepped);
}

#[test]
fn dispose_is_idempotent() {
    let mut surface = running(100.0, 100.0);
    let ticket = surface.request_frame().unwrap();

    assert!(surface.dispose());
    assert!(!surface.dispose());
    assert!(surface.is_disposed());
    assert!(surface.request_frame().is_none());
    assert_eq!(surface.run_frame(ticket, &EmptyContent), FrameOutcome::Disposed);
    assert_eq!(surface.frame(&EmptyContent), FrameOutcome::Disposed);
    assert!(surface.field().is_none());
    assert!(surface.output().is_none());

    // nothing revives a disposed surface
    surface.start();
    surface.resize(200.0, 200.0);
    assert_eq!(surface.schedule(), Schedule::Disposed);
    assert!(surface.grid_size().is_none());
}

#[test]
fn dispose_with_releases_once() {
    let mut surface = running(100.0, 100.0);
    let mut backend = RecordingBackend::default();
    surface.present(&mut backend).unwrap();

    surface.dispose_with(&mut backend);
    surface.dispose_with(&mut backend);
    assert_eq!(backend.releases, 1);

    // presenting after teardown is a no-op
    surface.present(&mut backend).unwrap();
    assert_eq!(backend.uploads, 1);
}

#[test]
fn backend_allocates_lazily() {
    let mut surface = running(200.0, 100.0);
    let mut backend = RecordingBackend::default();
    assert!(backend.allocations.is_empty());

    surface.frame(&EmptyContent);
    surface.present(&mut backend).unwrap();
    surface.frame(&EmptyContent);
    surface.present(&mut backend).unwrap();
    assert_eq!(backend.allocations.len(), 1);
    assert_eq!(backend.uploads, 2);
    assert_eq!(
        backend.allocations[0],
        (GridSize { width: 120, height: 60 }, UVec2::new(200, 100))
    );

    surface.resize(100.0, 100.0);
    surface.present(&mut backend).unwrap();
    assert_eq!(backend.allocations.len(), 2);
    assert_eq!(backend.allocations[1].1, UVec2::new(100, 100));
}

#[test]
fn lost_context_recovers_once() {
    let mut surface = running(100.0, 100.0);
    surface.handle_pointer(PointerEvent::Move { x: 50.0, y: 50.0 });
    surface.frame(&EmptyContent);
    let generation = surface.generation();

    let mut backend = RecordingBackend {
        failing_uploads: 1,
        ..Default::default()
    };
    surface.present(&mut backend).unwrap();

    assert_eq!(backend.allocations.len(), 2);
    assert_eq!(backend.uploads, 1);
    assert_eq!(surface.generation(), generation + 1);
    assert_eq!(surface.schedule(), Schedule::Running);
    // the recovered field starts from rest
    assert_eq!(surface.field().unwrap().energy(), 0.0);
}

#[test]
fn persistent_loss_is_fatal() {
    let mut surface = running(100.0, 100.0);
    let mut backend = RecordingBackend {
        failing_uploads: 2,
        ..Default::default()
    };

    let result = surface.present(&mut backend);
    assert!(matches!(result, Err(LiquidError::Fatal(_))));
    assert_eq!(surface.schedule(), Schedule::Stopped);
    assert!(surface.request_frame().is_none());
    assert_eq!(backend.uploads, 0);
}

#[test]
fn content_composites_only_when_ready() {
    let mut surface = running(16.0, 16.0);
    let base_alpha = surface.config().compositor.base_alpha;

    let opaque = ContentImage::filled(4, 4, [255, 0, 0, 255]);
    surface.frame(&opaque);
    let output = surface.output().unwrap();
    assert!(output.pixels().iter().all(|px| px.w > 0.999));

    surface.frame(&Loading(opaque));
    let output = surface.output().unwrap();
    assert!(output.pixels().iter().all(|px| (px.w - base_alpha).abs() < 1e-4));
}

#[test]
fn pointer_is_scaled_and_flipped() {
    let mut surface = running(200.0, 100.0);
    surface.handle_pointer(PointerEvent::Move { x: 50.0, y: 20.0 });

    let pointer = surface.pointer();
    assert!(pointer.active);
    assert!(pointer.position.distance(Vec2::new(30.0, 48.0)) < 1e-4);

    surface.handle_pointer(PointerEvent::Leave);
    assert!(!surface.pointer().active);
}

#[test]
fn resize_under_a_resting_pointer_is_quiet() {
    let mut surface = running(200.0, 200.0);
    surface.handle_pointer(PointerEvent::Move { x: 100.0, y: 100.0 });
    for _ in 0..5 {
        surface.frame(&EmptyContent);
    }
    let last = surface.state().unwrap().last_input;
    assert!(!last.ripple && !last.shockwave);

    surface.resize(300.0, 300.0);
    // same pixel, projected with the new height
    assert!(surface.pointer().position.distance(Vec2::new(60.0, 120.0)) < 1e-4);

    for _ in 0..3 {
        assert_eq!(surface.frame(&EmptyContent), FrameOutcome::Stepped);
        let last = surface.state().unwrap().last_input;
        assert!(!last.ripple, "ripple after resize");
        assert!(!last.shockwave, "shockwave after resize");
    }
    assert_eq!(surface.field().unwrap().energy(), 0.0);
}

#[test]
fn moving_after_resize_still_ripples() {
    let mut surface = running(200.0, 200.0);
    surface.handle_pointer(PointerEvent::Move { x: 100.0, y: 100.0 });
    surface.frame(&EmptyContent);
    surface.resize(300.0, 300.0);

    surface.handle_pointer(PointerEvent::Move { x: 110.0, y: 100.0 });
    surface.frame(&EmptyContent);
    assert!(surface.state().unwrap().last_input.ripple);
}
