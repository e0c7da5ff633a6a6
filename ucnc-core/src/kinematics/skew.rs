//! Skew (shear) correction for out-of-square axes

use crate::axis::Coords;
use crate::config::SkewFactors;

/// Shear applied to Cartesian targets before the topology transform
///
/// `x' = x - y·xy - z·xz`, `y' = y - z·yz`; the XZ and YZ terms are
/// dropped when correcting the XY plane only.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Skew {
    xy: f32,
    xz: f32,
    yz: f32,
}

impl Skew {
    pub fn new(factors: SkewFactors) -> Self {
        if factors.xy_only {
            Self {
                xy: factors.xy,
                xz: 0.0,
                yz: 0.0,
            }
        } else {
            Self {
                xy: factors.xy,
                xz: factors.xz,
                yz: factors.yz,
            }
        }
    }

    /// Correct a commanded position
    pub fn apply(&self, p: &Coords) -> Coords {
        let [x, y, z, a] = *p;
        [x - y * self.xy - z * self.xz, y - z * self.yz, z, a]
    }

    /// Undo [`Skew::apply`]
    pub fn remove(&self, p: &Coords) -> Coords {
        let [xs, ys, z, a] = *p;
        let y = ys + z * self.yz;
        [xs + y * self.xy + z * self.xz, y, z, a]
    }
}
