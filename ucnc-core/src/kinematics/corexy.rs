//! CoreXY kinematics
//!
//! Motor A = X + Y, motor B = X - Y. Z and A pass through.

use super::{Kinematics, KinematicsError};
use crate::axis::Coords;

/// Two belts sharing the XY gantry
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CoreXY;

impl Kinematics for CoreXY {
    fn inverse(&self, cartesian: &Coords) -> Result<Coords, KinematicsError> {
        let [x, y, z, a] = *cartesian;
        Ok([x + y, x - y, z, a])
    }

    fn forward(&self, actuator: &Coords) -> Coords {
        let [m1, m2, z, a] = *actuator;
        [(m1 + m2) * 0.5, (m1 - m2) * 0.5, z, a]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pure_x_moves_both_motors() {
        assert_eq!(CoreXY.inverse(&[10.0, 0.0, 0.0, 0.0]), Ok([10.0, 10.0, 0.0, 0.0]));
    }

    #[test]
    fn test_pure_y_moves_motors_opposite() {
        assert_eq!(CoreXY.inverse(&[0.0, 10.0, 0.0, 0.0]), Ok([10.0, -10.0, 0.0, 0.0]));
    }

    #[test]
    fn test_forward() {
        assert_eq!(CoreXY.forward(&[30.0, 10.0, 5.0, 1.0]), [20.0, 10.0, 5.0, 1.0]);
    }
}
