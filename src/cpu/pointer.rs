// single-pointer tracking in grid coordinates
use glam::Vec2;

/// Per-axis displacement above which the pointer counts as moving
pub const MOVE_THRESHOLD: f32 = 0.5;

/// Raw host input, positions in container pixels with the origin top-left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Enter,
    Leave,
    Move { x: f32, y: f32 },
    TouchStart { x: f32, y: f32 },
    TouchMove { x: f32, y: f32 },
    TouchEnd,
}

/// Latest pointer reading handed to a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerSample {
    /// Grid coordinates, bottom-up
    pub position: Vec2,
    /// Last container-local pixel position, top-left origin
    pub pixel: Option<Vec2>,
    pub active: bool,
}

impl Default for PointerSample {
    fn default() -> Self {
        Self {
            position: Vec2::splat(-1.0),
            pixel: None,
            active: false,
        }
    }
}

impl PointerSample {
    /// Fold one host event into the sample. `container_height` is used to flip
    /// Y, `scale` maps pixels to grid cells.
    pub fn apply(&mut self, event: PointerEvent, container_height: f32, scale: f32) {
        match event {
            PointerEvent::Enter => self.active = true,
            PointerEvent::Leave | PointerEvent::TouchEnd => self.active = false,
            PointerEvent::Move { x, y }
            | PointerEvent::TouchStart { x, y }
            | PointerEvent::TouchMove { x, y } => {
                self.active = true;
                self.pixel = Some(Vec2::new(x, y));
                self.reproject(container_height, scale);
            }
        }
    }

    /// Recompute the grid position for a new container height.
    pub fn reproject(&mut self, container_height: f32, scale: f32) {
        if let Some(px) = self.pixel {
            self.position = Vec2::new(px.x * scale, (container_height - px.y) * scale);
        }
    }
}

/// Motion summary derived from the position history for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameMotion {
    pub displacement: Vec2,
    pub prev_displacement: Vec2,
    pub moved: bool,
}

impl FrameMotion {
    pub fn movement(&self) -> f32 {
        self.displacement.length()
    }

    pub fn prev_movement(&self) -> f32 {
        self.prev_displacement.length()
    }

    /// Angle between this frame's and last frame's displacement, in radians.
    pub fn turn_angle(&self) -> f32 {
        let denom = (self.movement() * self.prev_movement()).max(1e-4);
        let cos = (self.displacement.dot(self.prev_displacement) / denom).clamp(-1.0, 1.0);
        cos.acos()
    }
}

/// Position plus the two frames before it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerTracker {
    pub position: Vec2,
    pub previous: Vec2,
    pub prev_previous: Vec2,
    pub active: bool,
}

impl Default for PointerTracker {
    fn default() -> Self {
        let off_grid = Vec2::splat(-1.0);
        Self {
            position: off_grid,
            previous: off_grid,
            prev_previous: off_grid,
            active: false,
        }
    }
}

impl PointerTracker {
    /// History with the pointer resting at `sample`, so the first frame
    /// sees no motion.
    pub fn settled(sample: PointerSample) -> Self {
        Self {
            position: sample.position,
            previous: sample.position,
            prev_previous: sample.position,
            active: sample.active,
        }
    }

    pub fn observe(&mut self, sample: PointerSample) {
        self.position = sample.position;
        self.active = sample.active;
    }

    pub fn motion(&self) -> FrameMotion {
        let displacement = self.position - self.previous;
        FrameMotion {
            displacement,
            prev_displacement: self.previous - self.prev_previous,
            moved: displacement.x.abs() > MOVE_THRESHOLD || displacement.y.abs() > MOVE_THRESHOLD,
        }
    }

    /// Shift the history once the frame has consumed it.
    pub fn end_frame(&mut self) {
        self.prev_previous = self.previous;
        self.previous = self.position;
    }
}
