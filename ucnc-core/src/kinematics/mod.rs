//! Kinematics transforms
//!
//! Maps Cartesian machine coordinates to actuator coordinates and back.
//! The pipeline for an inverse transform is: soft limits, skew correction,
//! topology transform, steps-per-unit scaling with round-half-to-even.
//! Backlash compensation is applied later to the resulting step delta.
//!
//! The A axis is rotary and always passes straight through.

pub mod backlash;
pub mod cartesian;
pub mod corexy;
pub mod linear_delta;
pub mod rotary_delta;
pub mod skew;

pub use backlash::Backlash;
pub use cartesian::Cartesian;
pub use corexy::CoreXY;
pub use linear_delta::LinearDelta;
pub use rotary_delta::RotaryDelta;
pub use skew::Skew;

use crate::axis::{Coords, Steps, AXIS_COUNT};
use crate::config::{KinematicsConfig, MotionSettings};

/// Kinematics errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KinematicsError {
    /// Target cannot be realized by the machine geometry or lies beyond
    /// the configured travel
    OutOfReach,
}

/// Geometry transform between Cartesian and actuator units
///
/// Actuator units are carriage travel for linear actuators and degrees for
/// rotary ones; steps-per-unit scaling happens outside.
pub trait Kinematics {
    /// Cartesian position to actuator position
    fn inverse(&self, cartesian: &Coords) -> Result<Coords, KinematicsError>;

    /// Actuator position to Cartesian position
    fn forward(&self, actuator: &Coords) -> Coords;
}

/// Configured machine topology
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Topology {
    Cartesian(Cartesian),
    CoreXY(CoreXY),
    LinearDelta(LinearDelta),
    RotaryDelta(RotaryDelta),
}

impl Topology {
    /// Build the topology described by the settings
    pub fn from_config(config: &KinematicsConfig) -> Self {
        match *config {
            KinematicsConfig::Cartesian => Topology::Cartesian(Cartesian),
            KinematicsConfig::CoreXY => Topology::CoreXY(CoreXY),
            KinematicsConfig::LinearDelta {
                arm_length,
                base_radius,
                effector_radius,
            } => Topology::LinearDelta(LinearDelta::new(
                arm_length,
                base_radius - effector_radius,
            )),
            KinematicsConfig::RotaryDelta {
                bicep_length,
                forearm_length,
                base_radius,
                effector_radius,
            } => Topology::RotaryDelta(RotaryDelta::new(
                bicep_length,
                forearm_length,
                base_radius,
                effector_radius,
            )),
        }
    }
}

impl Kinematics for Topology {
    fn inverse(&self, cartesian: &Coords) -> Result<Coords, KinematicsError> {
        match self {
            Topology::Cartesian(k) => k.inverse(cartesian),
            Topology::CoreXY(k) => k.inverse(cartesian),
            Topology::LinearDelta(k) => k.inverse(cartesian),
            Topology::RotaryDelta(k) => k.inverse(cartesian),
        }
    }

    fn forward(&self, actuator: &Coords) -> Coords {
        match self {
            Topology::Cartesian(k) => k.forward(actuator),
            Topology::CoreXY(k) => k.forward(actuator),
            Topology::LinearDelta(k) => k.forward(actuator),
            Topology::RotaryDelta(k) => k.forward(actuator),
        }
    }
}

/// Round to the nearest step, ties to even
///
/// Ties to even keeps repeated conversions of values sitting exactly on a
/// half step from drifting in one direction.
pub fn to_steps(units: f32, steps_per_unit: f32) -> i32 {
    libm::rintf(units * steps_per_unit) as i32
}

/// Full Cartesian <-> step transform for one machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    topology: Topology,
    skew: Skew,
    steps_per_unit: [f32; AXIS_COUNT],
    travel: Option<[f32; AXIS_COUNT]>,
}

impl Transform {
    /// Build from validated settings
    pub fn new(settings: &MotionSettings) -> Self {
        let mut steps_per_unit = [0.0; AXIS_COUNT];
        let mut travel = [0.0; AXIS_COUNT];
        for (i, axis) in settings.axes.iter().enumerate() {
            steps_per_unit[i] = axis.steps_per_unit;
            travel[i] = axis.max_travel;
        }

        Self {
            topology: Topology::from_config(&settings.kinematics),
            skew: Skew::new(settings.skew),
            steps_per_unit,
            travel: settings.soft_limits.then_some(travel),
        }
    }

    /// Steps per actuator unit for each axis
    pub fn steps_per_unit(&self) -> &[f32; AXIS_COUNT] {
        &self.steps_per_unit
    }

    /// Cartesian target to actuator steps
    ///
    /// Fails before anything is queued when the target is unreachable.
    pub fn inverse(&self, cartesian: &Coords) -> Result<Steps, KinematicsError> {
        if let Some(travel) = &self.travel {
            if cartesian.iter().zip(travel).any(|(c, t)| libm::fabsf(*c) > *t) {
                return Err(KinematicsError::OutOfReach);
            }
        }

        let corrected = self.skew.apply(cartesian);
        let actuator = self.topology.inverse(&corrected)?;

        let mut steps = [0; AXIS_COUNT];
        for i in 0..AXIS_COUNT {
            if !actuator[i].is_finite() {
                return Err(KinematicsError::OutOfReach);
            }
            steps[i] = to_steps(actuator[i], self.steps_per_unit[i]);
        }
        Ok(steps)
    }

    /// Actuator steps to Cartesian position
    pub fn forward(&self, steps: &Steps) -> Coords {
        let mut actuator = [0.0; AXIS_COUNT];
        for i in 0..AXIS_COUNT {
            actuator[i] = steps[i] as f32 / self.steps_per_unit[i];
        }
        let corrected = self.topology.forward(&actuator);
        self.skew.remove(&corrected)
    }
}
