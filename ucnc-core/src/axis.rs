//! Axis identifiers and per-axis array types
//!
//! Actuator positions are integer step counts; Cartesian positions are
//! floating-point machine units (mm for linear axes, degrees for A).

use bitflags::bitflags;

/// Number of axes driven by the controller (X, Y, Z, A)
pub const AXIS_COUNT: usize = 4;

/// Integer actuator position or delta, one entry per axis
pub type Steps = [i32; AXIS_COUNT];

/// Cartesian position or delta in machine units, one entry per axis
pub type Coords = [f32; AXIS_COUNT];

/// Axis identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Axis {
    X,
    Y,
    Z,
    /// Rotary axis, never transformed by kinematics
    A,
}

impl Axis {
    /// All axes in index order
    pub const ALL: [Axis; AXIS_COUNT] = [Axis::X, Axis::Y, Axis::Z, Axis::A];

    /// Array index of this axis
    pub const fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
            Axis::A => 3,
        }
    }

    /// Single-bit mask for this axis
    pub const fn mask(self) -> AxisMask {
        AxisMask::from_bits_truncate(1 << self.index())
    }
}

bitflags! {
    /// Set of axes, used for step pulses and direction bits
    ///
    /// For direction bits a set bit means the axis moves toward negative.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AxisMask: u8 {
        const X = 1 << 0;
        const Y = 1 << 1;
        const Z = 1 << 2;
        const A = 1 << 3;
    }
}

impl AxisMask {
    /// Mask with only the axis at `index` set
    pub const fn from_index(index: usize) -> Self {
        Self::from_bits_truncate(1 << index)
    }

    /// Check whether the axis at `index` is set
    pub const fn has_index(self, index: usize) -> bool {
        self.bits() & (1 << index) != 0
    }

    /// Direction mask for a signed step delta (bit set = negative)
    pub fn negative_of(delta: &Steps) -> Self {
        let mut mask = AxisMask::empty();
        for (i, d) in delta.iter().enumerate() {
            if *d < 0 {
                mask |= AxisMask::from_index(i);
            }
        }
        mask
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for AxisMask {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "AxisMask({=u8:04b})", self.bits())
    }
}
