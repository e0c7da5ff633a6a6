//! Backlash compensation
//!
//! Tracks the last travel direction of every actuator. When a move
//! reverses an axis with configured backlash, the slack is taken up by a
//! separate compensation move along the new direction before the move
//! itself. Compensation steps do not count toward the actuator position.

use crate::axis::{Steps, AXIS_COUNT};
use crate::config::MotionSettings;

/// Persistent per-axis direction memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Backlash {
    steps: [u16; AXIS_COUNT],
    /// -1, 0 (never moved) or 1
    last_dir: [i8; AXIS_COUNT],
}

impl Backlash {
    pub fn new(settings: &MotionSettings) -> Self {
        let mut steps = [0; AXIS_COUNT];
        for (s, axis) in steps.iter_mut().zip(settings.axes.iter()) {
            *s = axis.backlash_steps;
        }
        Self {
            steps,
            last_dir: [0; AXIS_COUNT],
        }
    }

    /// Record the directions of `delta` and return the compensation move
    /// required before it, if any axis reverses
    pub fn compensate(&mut self, delta: &Steps) -> Option<Steps> {
        let mut comp = [0; AXIS_COUNT];
        let mut any = false;

        for i in 0..AXIS_COUNT {
            let dir = delta[i].signum() as i8;
            if dir == 0 {
                continue;
            }
            if self.last_dir[i] != 0 && self.last_dir[i] != dir && self.steps[i] > 0 {
                comp[i] = dir as i32 * self.steps[i] as i32;
                any = true;
            }
            self.last_dir[i] = dir;
        }

        any.then_some(comp)
    }
}
