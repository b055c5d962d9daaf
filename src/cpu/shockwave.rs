// stop / sharp-turn detection and the bounded shockwave pulse
use std::f32::consts::FRAC_PI_3;

use super::pointer::FrameMotion;

const STOP_PREV_MOVEMENT: f32 = 2.0;
const STOP_MOVEMENT: f32 = 1.0;
const TURN_MIN_MOVEMENT: f32 = 1.0;
/// Frames the ring is injected for
pub const LIVE_FRAMES: u32 = 2;
/// Age after which the pulse is retired
pub const RETIRE_AGE: u32 = 3;
const AGE_CAP: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShockwavePhase {
    Idle,
    Armed,
    Decaying,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Shockwave {
    pub armed: bool,
    pub age: u32, // frames since arming
}

/// Abrupt stop, or two real moves with more than 60 degrees between them.
pub fn is_trigger(motion: &FrameMotion) -> bool {
    let movement = motion.movement();
    let prev_movement = motion.prev_movement();

    let stopped = prev_movement > STOP_PREV_MOVEMENT && movement < STOP_MOVEMENT;
    let turned = movement > TURN_MIN_MOVEMENT
        && prev_movement > TURN_MIN_MOVEMENT
        && motion.turn_angle() > FRAC_PI_3;
    stopped || turned
}

impl Shockwave {
    pub fn phase(&self) -> ShockwavePhase {
        match (self.armed, self.age) {
            (false, _) => ShockwavePhase::Idle,
            (true, age) if age < LIVE_FRAMES => ShockwavePhase::Armed,
            (true, _) => ShockwavePhase::Decaying,
        }
    }

    /// Ring is injected this frame
    pub fn is_live(&self) -> bool {
        self.phase() == ShockwavePhase::Armed
    }

    /// Re-arm from any phase; a new gesture restarts the pulse.
    pub fn arm(&mut self) {
        self.armed = true;
        self.age = 0;
    }

    /// Called once per frame after the step used `is_live`.
    pub fn tick(&mut self) {
        if !self.armed {
            return;
        }
        if self.age < AGE_CAP {
            self.age += 1;
        }
        if self.age > RETIRE_AGE {
            self.armed = false;
        }
    }
}
