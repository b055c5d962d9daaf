//! Owns the simulation state, its output surface and the frame schedule.
//!
//! The host drives [`LiquidSurface`] from its own frame callback: once per
//! display refresh it asks [`LiquidSurface::request_frame`] for a ticket and
//! hands it to [`LiquidSurface::run_frame`]. Every reallocation (resize,
//! context loss, teardown) bumps the generation, so a ticket issued before it
//! is discarded instead of stepping the new buffers.

use bevy::log::{debug, error, info, warn};
use bevy::prelude::Resource;
use glam::{UVec2, Vec2};

use crate::config::LiquidConfig;
use crate::cpu::compositor::{composite, ContentSource, OutputSurface};
use crate::cpu::field::{FieldBuffer, GridSize};
use crate::cpu::pointer::{PointerEvent, PointerSample};
use crate::cpu::state::SimulationState;
use crate::error::{ContextLostError, LiquidError, LiquidResult};

/// Storage the field and output live in once they leave the CPU.
pub trait SurfaceBackend {
    /// (Re)create storage for a field of `grid` cells and an output of
    /// `output` pixels. Previous contents are dropped.
    fn allocate(&mut self, grid: GridSize, output: UVec2) -> Result<(), ContextLostError>;

    fn upload(&mut self, field: &FieldBuffer, output: &OutputSurface)
    -> Result<(), ContextLostError>;

    fn release(&mut self);
}

/// Permission to run one step against a specific field generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameTicket {
    generation: u64,
}

impl FrameTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Stepped,
    /// The ticket predates a reallocation
    Stale,
    Stopped,
    Disposed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Schedule {
    Stopped,
    Running,
    Disposed,
}

#[inline]
fn surface_dim(pixels: f32) -> u32 {
    let px = pixels.round();
    if px.is_finite() && px >= 1.0 { px as u32 } else { 1 }
}

#[derive(Resource)]
pub struct LiquidSurface {
    config: LiquidConfig,
    container: Vec2,
    pointer: PointerSample,
    state: Option<SimulationState>,
    output: Option<OutputSurface>,
    schedule: Schedule,
    generation: u64,
    backend_stale: bool,
}

impl LiquidSurface {
    /// Validates `config` and allocates for a `width` x `height` container.
    /// The schedule starts stopped.
    pub fn new(config: LiquidConfig, width: f32, height: f32) -> LiquidResult<Self> {
        config.validate()?;
        let mut surface = Self {
            config,
            container: Vec2::new(width, height),
            pointer: PointerSample::default(),
            state: None,
            output: None,
            schedule: Schedule::Stopped,
            generation: 0,
            backend_stale: true,
        };
        surface.reallocate();
        Ok(surface)
    }

    pub fn config(&self) -> &LiquidConfig {
        &self.config
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    pub fn is_disposed(&self) -> bool {
        self.schedule == Schedule::Disposed
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn grid_size(&self) -> Option<GridSize> {
        self.state.as_ref().map(|s| s.field.size())
    }

    pub fn state(&self) -> Option<&SimulationState> {
        self.state.as_ref()
    }

    /// Latest field buffer
    pub fn field(&self) -> Option<&FieldBuffer> {
        self.state.as_ref().map(|s| s.field.current())
    }

    pub fn output(&self) -> Option<&OutputSurface> {
        self.output.as_ref()
    }

    pub fn pointer(&self) -> PointerSample {
        self.pointer
    }

    fn reallocate(&mut self) {
        let grid = GridSize::for_container(self.container.x, self.container.y, self.config.scale);
        self.state = Some(SimulationState::with_pointer(grid, self.pointer));
        self.output = Some(OutputSurface::new(
            surface_dim(self.container.x),
            surface_dim(self.container.y),
        ));
        self.generation += 1;
        self.backend_stale = true;
        debug!(
            "liquid surface generation {}: grid {}x{}",
            self.generation, grid.width, grid.height
        );
    }

    pub fn start(&mut self) {
        match self.schedule {
            Schedule::Disposed => warn!("start() on a disposed liquid surface is ignored"),
            Schedule::Running => {}
            Schedule::Stopped => {
                info!("liquid surface started");
                self.schedule = Schedule::Running;
            }
        }
    }

    /// Pause without releasing anything.
    pub fn stop(&mut self) {
        if self.schedule == Schedule::Running {
            self.schedule = Schedule::Stopped;
        }
    }

    /// New container size. Simulation state is discarded, not resampled.
    pub fn resize(&mut self, width: f32, height: f32) {
        if self.is_disposed() {
            return;
        }
        self.container = Vec2::new(width, height);
        self.pointer.reproject(height, self.config.scale);
        self.reallocate();
        info!("liquid surface resized to {width}x{height}");
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) {
        if self.is_disposed() {
            return;
        }
        self.pointer
            .apply(event, self.container.y, self.config.scale);
    }

    /// A ticket for the current generation while the schedule runs.
    pub fn request_frame(&self) -> Option<FrameTicket> {
        (self.schedule == Schedule::Running).then_some(FrameTicket {
            generation: self.generation,
        })
    }

    /// Simulate then composite one frame.
    pub fn run_frame(&mut self, ticket: FrameTicket, content: &dyn ContentSource) -> FrameOutcome {
        match self.schedule {
            Schedule::Disposed => return FrameOutcome::Disposed,
            Schedule::Stopped => return FrameOutcome::Stopped,
            Schedule::Running => {}
        }
        if ticket.generation != self.generation {
            debug!(
                "dropping frame for generation {} (now {})",
                ticket.generation, self.generation
            );
            return FrameOutcome::Stale;
        }
        let (Some(state), Some(output)) = (self.state.take(), self.output.as_mut()) else {
            return FrameOutcome::Disposed;
        };

        let state = state.advance(self.pointer, &self.config);
        if state.last_report.reset_cells > 0 {
            warn!("reset {} malformed field cells", state.last_report.reset_cells);
        }

        let frame = if content.ready() {
            content.current_frame()
        } else {
            None
        };
        let report = composite(state.field.current(), frame, &self.config.compositor, output);
        if report.skipped_pixels > 0 {
            warn!("skipped {} pixels with malformed field samples", report.skipped_pixels);
        }

        self.state = Some(state);
        FrameOutcome::Stepped
    }

    /// `request_frame` + `run_frame` for hosts that do not split them.
    pub fn frame(&mut self, content: &dyn ContentSource) -> FrameOutcome {
        match self.request_frame() {
            Some(ticket) => self.run_frame(ticket, content),
            None if self.is_disposed() => FrameOutcome::Disposed,
            None => FrameOutcome::Stopped,
        }
    }

    fn push_to<B: SurfaceBackend + ?Sized>(&mut self, backend: &mut B) -> Result<(), ContextLostError> {
        let (Some(state), Some(output)) = (self.state.as_ref(), self.output.as_ref()) else {
            return Ok(());
        };
        if self.backend_stale {
            let size = UVec2::new(output.width(), output.height());
            backend.allocate(state.field.size(), size)?;
            self.backend_stale = false;
        }
        backend.upload(state.field.current(), output)
    }

    /// Copy the latest field and output into `backend`.
    ///
    /// A lost context gets one full reallocation; if that fails too the
    /// schedule stops and the error is returned as fatal.
    pub fn present<B: SurfaceBackend + ?Sized>(&mut self, backend: &mut B) -> LiquidResult<()> {
        if self.is_disposed() {
            return Ok(());
        }
        let Err(lost) = self.push_to(backend) else {
            return Ok(());
        };

        warn!("{lost}; reallocating liquid surface");
        self.reallocate();
        if let Err(again) = self.push_to(backend) {
            error!("liquid surface reallocation failed: {again}");
            self.stop();
            return Err(LiquidError::Fatal(again));
        }
        Ok(())
    }

    /// Revoke the schedule and drop every buffer. Returns `false` if the
    /// surface was already disposed.
    pub fn dispose(&mut self) -> bool {
        if self.is_disposed() {
            return false;
        }
        self.schedule = Schedule::Disposed;
        self.generation += 1;
        self.state = None;
        self.output = None;
        info!("liquid surface disposed");
        true
    }

    /// `dispose` plus releasing what the backend holds.
    pub fn dispose_with<B: SurfaceBackend + ?Sized>(&mut self, backend: &mut B) {
        if self.dispose() {
            backend.release();
        }
    }
}
