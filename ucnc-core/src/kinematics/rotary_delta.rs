//! Rotary delta kinematics
//!
//! Three motors on a horizontal base, 120° apart, each swinging a bicep in
//! its vertical plane; forearms join the elbows to the effector. Actuator
//! units are bicep angles in degrees, 0° horizontal and positive downward.
//! Working heights are negative (effector below the motor plane).

use super::{Kinematics, KinematicsError};
use crate::axis::Coords;

const COS_120: f64 = -0.5;
const SIN_120: f64 = 0.866_025_403_784_438_6;
const TAN_60: f64 = 1.732_050_807_568_877_2;

/// Three-arm rotary delta
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotaryDelta {
    bicep: f64,
    forearm: f64,
    base_radius: f64,
    effector_radius: f64,
}

impl RotaryDelta {
    pub fn new(bicep: f32, forearm: f32, base_radius: f32, effector_radius: f32) -> Self {
        Self {
            bicep: bicep as f64,
            forearm: forearm as f64,
            base_radius: base_radius as f64,
            effector_radius: effector_radius as f64,
        }
    }

    /// Bicep angle for the arm lying in the YZ plane on the -Y side
    ///
    /// Intersects the circle swept by the elbow with the sphere of forearm
    /// radius around the effector joint.
    fn arm_angle(&self, x0: f64, y0: f64, z0: f64) -> Option<f64> {
        if z0 == 0.0 {
            return None;
        }
        let rf = self.bicep;
        let y1 = -self.base_radius;
        let y0 = y0 - self.effector_radius;

        let a = (x0 * x0 + y0 * y0 + z0 * z0 + rf * rf - self.forearm * self.forearm - y1 * y1)
            / (2.0 * z0);
        let b = (y1 - y0) / z0;
        let disc = -(a + b * y1) * (a + b * y1) + rf * (b * b * rf + rf);
        if disc < 0.0 {
            return None;
        }

        let yj = (y1 - a * b - libm::sqrt(disc)) / (b * b + 1.0);
        let zj = a + b * yj;
        let mut theta = libm::atan(-zj / (y1 - yj)).to_degrees();
        if yj > y1 {
            theta += 180.0;
        }
        Some(theta)
    }
}

impl Kinematics for RotaryDelta {
    fn inverse(&self, cartesian: &Coords) -> Result<Coords, KinematicsError> {
        let x = cartesian[0] as f64;
        let y = cartesian[1] as f64;
        let z = cartesian[2] as f64;

        let t1 = self.arm_angle(x, y, z);
        let t2 = self.arm_angle(x * COS_120 + y * SIN_120, y * COS_120 - x * SIN_120, z);
        let t3 = self.arm_angle(x * COS_120 - y * SIN_120, y * COS_120 + x * SIN_120, z);

        match (t1, t2, t3) {
            (Some(t1), Some(t2), Some(t3)) => Ok([t1 as f32, t2 as f32, t3 as f32, cartesian[3]]),
            _ => Err(KinematicsError::OutOfReach),
        }
    }

    /// Closed-form intersection of the three forearm spheres centered on
    /// the elbows shifted inward by the effector radius
    fn forward(&self, actuator: &Coords) -> Coords {
        let rf = self.bicep;
        let t = self.base_radius - self.effector_radius;
        let [t1, t2, t3] = [0, 1, 2].map(|i| (actuator[i] as f64).to_radians());

        let y1 = -(t + rf * libm::cos(t1));
        let z1 = -rf * libm::sin(t1);

        let y2 = (t + rf * libm::cos(t2)) * 0.5;
        let x2 = y2 * TAN_60;
        let z2 = -rf * libm::sin(t2);

        let y3 = (t + rf * libm::cos(t3)) * 0.5;
        let x3 = -y3 * TAN_60;
        let z3 = -rf * libm::sin(t3);

        let dnm = (y2 - y1) * x3 - (y3 - y1) * x2;

        let w1 = y1 * y1 + z1 * z1;
        let w2 = x2 * x2 + y2 * y2 + z2 * z2;
        let w3 = x3 * x3 + y3 * y3 + z3 * z3;

        // x = (a1·z + b1) / dnm
        let a1 = (z2 - z1) * (y3 - y1) - (z3 - z1) * (y2 - y1);
        let b1 = -((w2 - w1) * (y3 - y1) - (w3 - w1) * (y2 - y1)) * 0.5;

        // y = (a2·z + b2) / dnm
        let a2 = -(z2 - z1) * x3 + (z3 - z1) * x2;
        let b2 = ((w2 - w1) * x3 - (w3 - w1) * x2) * 0.5;

        // a·z² + b·z + c = 0
        let a = a1 * a1 + a2 * a2 + dnm * dnm;
        let b = 2.0 * (a1 * b1 + a2 * (b2 - y1 * dnm) - z1 * dnm * dnm);
        let c = (b2 - y1 * dnm) * (b2 - y1 * dnm) + b1 * b1
            + dnm * dnm * (z1 * z1 - self.forearm * self.forearm);
        let disc = (b * b - 4.0 * a * c).max(0.0);

        let z0 = -0.5 * (b + libm::sqrt(disc)) / a;
        let x0 = (a1 * z0 + b1) / dnm;
        let y0 = (a2 * z0 + b2) / dnm;

        [x0 as f32, y0 as f32, z0 as f32, actuator[3]]
    }
}
