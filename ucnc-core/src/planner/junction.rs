//! Junction speed between consecutive blocks
//!
//! The corner is approximated by a circle tangent to both segments whose
//! deviation from the sharp corner equals the configured junction
//! deviation; the junction speed is the speed at which centripetal
//! acceleration on that circle equals the acceleration limit.

use crate::axis::{Coords, AXIS_COUNT};

/// Corners closer to straight than this are treated as collinear
const COLLINEAR_COS: f32 = 0.999_999;

/// Maximum speed (units/s) for passing from `prev` to `next`
///
/// `prev` and `next` are unit direction vectors. Returns `f32::INFINITY`
/// for collinear blocks (the caller caps with the nominal speeds) and 0
/// when any axis reverses.
pub fn junction_speed(prev: &Coords, next: &Coords, acceleration: f32, deviation: f32) -> f32 {
    if reverses(prev, next) {
        return 0.0;
    }

    // Cosine of the angle between the incoming and outgoing paths, with
    // the incoming vector flipped so a straight line gives -1
    let mut cos_theta = 0.0;
    for i in 0..AXIS_COUNT {
        cos_theta -= prev[i] * next[i];
    }

    if cos_theta > COLLINEAR_COS {
        return 0.0;
    }
    if cos_theta < -COLLINEAR_COS {
        return f32::INFINITY;
    }

    let sin_half = libm::sqrtf(0.5 * (1.0 - cos_theta));
    libm::sqrtf(acceleration * deviation * sin_half / (1.0 - sin_half))
}

/// True when some axis moves in opposite directions in the two blocks
pub fn reverses(prev: &Coords, next: &Coords) -> bool {
    prev.iter()
        .zip(next.iter())
        .any(|(a, b)| (*a > 0.0 && *b < 0.0) || (*a < 0.0 && *b > 0.0))
}
