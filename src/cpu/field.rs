// damped 2D wave field, double buffered (CPU reference of the GPU step)
use glam::Vec2;

use crate::config::LiquidConfig;

/// Distance band on each side of the shockwave ring
pub const SHOCKWAVE_THICKNESS: f32 = 20.0;
const SHOCKWAVE_STRENGTH: f32 = 0.5;
const RIPPLE_STRENGTH: f32 = 1.2;
const INTEGRATION_GAIN: f32 = 1.2;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Cell {
    pub pressure: f32,
    pub velocity: f32, // d(pressure)/dt, not a flow velocity
    pub gradient_x: f32,
    pub gradient_y: f32,
}

impl Cell {
    #[inline]
    fn is_finite(&self) -> bool {
        self.pressure.is_finite()
            && self.velocity.is_finite()
            && self.gradient_x.is_finite()
            && self.gradient_y.is_finite()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridSize {
    pub width: u32,
    pub height: u32,
}

impl GridSize {
    /// Grid for a container of `width` x `height` pixels. Degenerate or
    /// non-finite sizes clamp to a single cell.
    pub fn for_container(width: f32, height: f32, scale: f32) -> Self {
        Self {
            width: scaled_dim(width, scale),
            height: scaled_dim(height, scale),
        }
    }

    pub fn cells(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

#[inline]
fn scaled_dim(pixels: f32, scale: f32) -> u32 {
    let cells = (pixels * scale).floor();
    if cells.is_finite() && cells >= 1.0 {
        cells as u32
    } else {
        1
    }
}

/// One grid of cells. Row `0` is the bottom of the surface.
#[derive(Clone, Debug)]
pub struct FieldBuffer {
    size: GridSize,
    cells: Vec<Cell>,
}

impl FieldBuffer {
    pub fn new(size: GridSize) -> Self {
        Self {
            size,
            cells: vec![Cell::default(); size.cells().max(1)],
        }
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.size.width as usize + x as usize
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Cell {
        self.cells[self.index(x, y)]
    }

    #[inline]
    pub fn get_mut(&mut self, x: u32, y: u32) -> &mut Cell {
        let i = self.index(x, y);
        &mut self.cells[i]
    }

    /// Pressure as a neighbour sees it; malformed values read as rest.
    #[inline]
    fn pressure(&self, x: u32, y: u32) -> f32 {
        let p = self.cells[self.index(x, y)].pressure;
        if p.is_finite() { p } else { 0.0 }
    }

    /// Sum of |pressure| over the grid
    pub fn energy(&self) -> f32 {
        self.cells.iter().map(|c| c.pressure.abs()).sum()
    }
}

/// What the step needs to know about the pointer this frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct StepInput {
    /// Pointer in grid coordinates (bottom-up)
    pub pointer: Vec2,
    /// Pointer is active and moved past the ripple threshold
    pub ripple: bool,
    /// Shockwave ring is live this frame
    pub shockwave: bool,
}

/// Counts of cells the step had to recover.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    pub reset_cells: usize,
}

/// Neighbour pressures with reflective edges: a missing neighbour takes the
/// value of the opposite one, and a 1-wide axis sees only the cell itself.
#[inline]
fn neighbours(field: &FieldBuffer, x: u32, y: u32) -> (f32, f32, f32, f32) {
    let GridSize { width, height } = field.size;
    let p = field.pressure(x, y);

    let mut right = if x + 1 < width { field.pressure(x + 1, y) } else { p };
    let mut left = if x > 0 { field.pressure(x - 1, y) } else { p };
    let mut up = if y + 1 < height { field.pressure(x, y + 1) } else { p };
    let mut down = if y > 0 { field.pressure(x, y - 1) } else { p };

    if x == 0 {
        left = right;
    }
    if x + 1 >= width {
        right = left;
    }
    if y == 0 {
        down = up;
    }
    if y + 1 >= height {
        up = down;
    }
    (right, left, up, down)
}

/// Advance the wave equation one step: read `previous`, write `current`.
///
/// Both buffers must have the same size. `config.damping` must be below 1
/// for the result to stay bounded.
pub fn step(
    previous: &FieldBuffer,
    current: &mut FieldBuffer,
    input: &StepInput,
    config: &LiquidConfig,
) -> StepReport {
    debug_assert_eq!(previous.size, current.size);

    let mut report = StepReport::default();
    let speed = config.wave_speed;
    let ripple_radius = config.ripple_radius;
    let ring_radius = ripple_radius * 2.0;

    for y in 0..previous.size.height {
        for x in 0..previous.size.width {
            let prev = previous.get(x, y);
            if !prev.is_finite() {
                // malformed sample: drop back to rest, keep stepping
                *current.get_mut(x, y) = Cell::default();
                report.reset_cells += 1;
                continue;
            }

            let (right, left, up, down) = neighbours(previous, x, y);
            let mut p = prev.pressure;
            let mut v = prev.velocity;

            // two 1-D second derivatives, horizontal then vertical
            v += speed * (-2.0 * p + right + left) / 3.0;
            v += speed * (-2.0 * p + up + down) / 3.0;

            p += speed * v * INTEGRATION_GAIN;

            v -= 0.001 * speed * p;
            v *= 1.0 - 0.005 * speed;
            p *= config.damping;

            let centre = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let dist = centre.distance(input.pointer);

            if input.ripple && dist <= ripple_radius {
                p += (1.0 - dist / ripple_radius) * RIPPLE_STRENGTH;
            }

            if input.shockwave {
                let from_ring = (dist - ring_radius).abs();
                if from_ring < SHOCKWAVE_THICKNESS {
                    let strength = (1.0 - from_ring / SHOCKWAVE_THICKNESS).powf(1.5);
                    p += strength * SHOCKWAVE_STRENGTH;
                }
            }

            *current.get_mut(x, y) = Cell {
                pressure: p,
                velocity: v,
                gradient_x: (right - left) / 2.0,
                gradient_y: (up - down) / 2.0,
            };
        }
    }
    report
}

/// The two field buffers and which one holds the latest step.
#[derive(Clone, Debug)]
pub struct SimulationField {
    buffers: [FieldBuffer; 2],
    current: usize,
}

impl SimulationField {
    pub fn new(size: GridSize) -> Self {
        Self {
            buffers: [FieldBuffer::new(size), FieldBuffer::new(size)],
            current: 0,
        }
    }

    pub fn size(&self) -> GridSize {
        self.buffers[0].size
    }

    pub fn current(&self) -> &FieldBuffer {
        &self.buffers[self.current]
    }

    pub fn previous(&self) -> &FieldBuffer {
        &self.buffers[1 - self.current]
    }

    /// Mutable access to the latest buffer, for seeding a state by hand.
    pub fn current_mut(&mut self) -> &mut FieldBuffer {
        &mut self.buffers[self.current]
    }

    /// Step from the current buffer into the other slot, then swap roles.
    pub fn advance(&mut self, input: &StepInput, config: &LiquidConfig) -> StepReport {
        let [a, b] = &mut self.buffers;
        let (read, write) = if self.current == 0 { (&*a, b) } else { (&*b, a) };
        let report = step(read, write, input, config);
        self.current = 1 - self.current;
        report
    }
}
