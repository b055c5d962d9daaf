// everything one frame reads and writes, threaded through `advance`
use super::field::{GridSize, SimulationField, StepInput, StepReport};
use super::pointer::{PointerSample, PointerTracker};
use super::shockwave::{is_trigger, Shockwave};
use crate::config::LiquidConfig;

#[derive(Clone, Debug)]
pub struct SimulationState {
    pub field: SimulationField,
    pub tracker: PointerTracker,
    pub shockwave: Shockwave,
    /// Steps taken since this state was allocated
    pub frame: u64,
    /// What the last step was fed
    pub last_input: StepInput,
    /// Last step's recovery counts
    pub last_report: StepReport,
}

impl SimulationState {
    pub fn new(size: GridSize) -> Self {
        Self {
            field: SimulationField::new(size),
            tracker: PointerTracker::default(),
            shockwave: Shockwave::default(),
            frame: 0,
            last_input: StepInput::default(),
            last_report: StepReport::default(),
        }
    }

    /// Fresh field and shockwave, with the pointer history resting on
    /// `pointer`. Used on reallocation so a hovering pointer is not read as
    /// a jump from the old grid.
    pub fn with_pointer(size: GridSize, pointer: PointerSample) -> Self {
        Self {
            tracker: PointerTracker::settled(pointer),
            ..Self::new(size)
        }
    }

    /// One frame: pointer history -> shockwave machine -> field step -> swap.
    pub fn advance(mut self, sample: PointerSample, config: &LiquidConfig) -> Self {
        self.tracker.observe(sample);
        let motion = self.tracker.motion();

        if self.tracker.active && is_trigger(&motion) {
            self.shockwave.arm();
        }

        let input = StepInput {
            pointer: self.tracker.position,
            ripple: self.tracker.active && motion.moved,
            shockwave: self.shockwave.is_live(),
        };
        self.last_report = self.field.advance(&input, config);
        self.last_input = input;

        self.shockwave.tick();
        self.tracker.end_frame();
        self.frame += 1;
        self
    }
}
