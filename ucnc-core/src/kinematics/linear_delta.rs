//! Linear delta kinematics
//!
//! Three vertical towers at 210°, 330° and 90° around the origin, each
//! carrying a carriage joined to the effector by a pair of parallel rods.
//! Carriage height for a tower at horizontal offset `d` from the effector is
//! `z + sqrt(L² - d²)`.

use super::{Kinematics, KinematicsError};
use crate::axis::Coords;

const TOWER_ANGLES_DEG: [f64; 3] = [210.0, 330.0, 90.0];

/// Three-tower linear delta
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearDelta {
    arm_sq: f64,
    towers: [(f64, f64); 3],
}

impl LinearDelta {
    /// `radius` is the base radius minus the effector radius
    pub fn new(arm_length: f32, radius: f32) -> Self {
        let radius = radius as f64;
        let towers = TOWER_ANGLES_DEG.map(|deg| {
            let rad = deg.to_radians();
            (radius * libm::cos(rad), radius * libm::sin(rad))
        });
        Self {
            arm_sq: (arm_length as f64) * (arm_length as f64),
            towers,
        }
    }
}

impl Kinematics for LinearDelta {
    fn inverse(&self, cartesian: &Coords) -> Result<Coords, KinematicsError> {
        let x = cartesian[0] as f64;
        let y = cartesian[1] as f64;
        let z = cartesian[2] as f64;

        let mut out = [0.0; 4];
        for (i, (tx, ty)) in self.towers.iter().enumerate() {
            let dx = x - tx;
            let dy = y - ty;
            let rise_sq = self.arm_sq - dx * dx - dy * dy;
            if rise_sq < 0.0 {
                return Err(KinematicsError::OutOfReach);
            }
            out[i] = (z + libm::sqrt(rise_sq)) as f32;
        }
        out[3] = cartesian[3];
        Ok(out)
    }

    /// Trilateration of the three carriage joints, taking the solution
    /// below the carriages
    fn forward(&self, actuator: &Coords) -> Coords {
        let p = |i: usize| -> [f64; 3] {
            [self.towers[i].0, self.towers[i].1, actuator[i] as f64]
        };
        let (p1, p2, p3) = (p(0), p(1), p(2));

        let p12 = sub(p2, p1);
        let d = norm(p12);
        let ex = scale(p12, 1.0 / d);

        let p13 = sub(p3, p1);
        let i = dot(ex, p13);
        let ey_raw = sub(p13, scale(ex, i));
        let ey = scale(ey_raw, 1.0 / norm(ey_raw));
        let ez = cross(ex, ey);
        let j = dot(ey, p13);

        // Equal rod lengths put the X solution halfway between towers 1 and 2
        let xn = d * 0.5;
        let yn = ((i * i + j * j) * 0.5 - i * xn) / j;
        let zn = libm::sqrt((self.arm_sq - xn * xn - yn * yn).max(0.0));

        let r = sub(add(p1, add(scale(ex, xn), scale(ey, yn))), scale(ez, zn));
        [r[0] as f32, r[1] as f32, r[2] as f32, actuator[3]]
    }
}

fn add(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn scale(a: [f64; 3], s: f64) -> [f64; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn norm(a: [f64; 3]) -> f64 {
    libm::sqrt(dot(a, a))
}
