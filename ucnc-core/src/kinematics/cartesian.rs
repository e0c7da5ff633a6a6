//! Cartesian kinematics: one actuator per axis

use super::{Kinematics, KinematicsError};
use crate::axis::Coords;

/// Identity geometry
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cartesian;

impl Kinematics for Cartesian {
    fn inverse(&self, cartesian: &Coords) -> Result<Coords, KinematicsError> {
        Ok(*cartesian)
    }

    fn forward(&self, actuator: &Coords) -> Coords {
        *actuator
    }
}
