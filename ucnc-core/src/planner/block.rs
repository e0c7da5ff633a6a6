//! Motion blocks
//!
//! A [`Block`] lives in the planner's lookahead and is mutated by the
//! recompute passes. When it is handed to the interpolator it is frozen
//! into a [`Segment`] carrying a precomputed [`Ramp`].

use crate::axis::{AxisMask, Coords, AXIS_COUNT};

use super::profile::{ProfileKind, Ramp};

/// What kind of motion a block performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionKind {
    /// Positioning at the axes' maximum feed, scaled by the rapid override
    Rapid,
    /// Programmed feed, scaled by the feed override
    Feed,
    /// Operator jog, never overridden
    Jog,
    /// Homing cycle move, never overridden and bypassing kinematics
    Homing,
}

/// One planned straight segment in actuator-step space
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Block {
    pub kind: MotionKind,
    /// Backlash take-up; its steps do not change the actuator position
    pub compensation: bool,
    /// Absolute step count per axis
    pub steps: [u32; AXIS_COUNT],
    /// Axes moving toward negative
    pub directions: AxisMask,
    /// Largest per-axis step count
    pub step_event_count: u32,
    /// Path length in actuator units
    pub distance: f32,
    /// Unit direction vector in actuator units
    pub unit: Coords,
    /// Requested speed before overrides, units/s
    pub programmed_speed: f32,
    /// Fastest speed the axes allow along this direction, units/s
    pub speed_limit: f32,
    /// Cruise speed after overrides, units/s
    pub nominal_speed: f32,
    /// Limit from the corner with the previous block, units/s
    pub max_junction_speed: f32,
    /// Highest entry speed allowed by corner and nominal speeds, units/s
    pub max_entry_speed: f32,
    /// Planned entry speed, units/s
    pub entry_speed: f32,
    /// Acceleration used for planning, units/s²
    pub acceleration: f32,
    /// Programmed spindle speed, rpm
    pub spindle: f32,
    /// Entry can no longer rise; the backward pass stops here
    pub nominal_locked: bool,
}

impl Block {
    /// Dominant-axis steps per path unit
    pub fn steps_per_unit(&self) -> f32 {
        self.step_event_count as f32 / self.distance
    }

    /// Freeze into a segment leaving the block at `exit_speed`
    pub fn segment(&self, profile: ProfileKind, exit_speed: f32) -> Segment {
        Segment {
            kind: self.kind,
            compensation: self.compensation,
            steps: self.steps,
            directions: self.directions,
            ramp: Ramp::new(
                profile,
                self.step_event_count,
                self.steps_per_unit(),
                self.entry_speed,
                self.nominal_speed,
                exit_speed,
                self.acceleration,
            ),
            spindle: self.spindle,
        }
    }
}

/// Block as consumed by the interpolator
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Segment {
    pub kind: MotionKind,
    pub compensation: bool,
    pub steps: [u32; AXIS_COUNT],
    pub directions: AxisMask,
    pub ramp: Ramp,
    pub spindle: f32,
}
