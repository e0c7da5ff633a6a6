//! Step/direction output trait
//!
//! Implemented by the board for its step and direction pins (GPIO, PIO,
//! shift register). Called from the tick context with the result of
//! [`Interpolator::tick`](crate::interpolator::Interpolator::tick).

use crate::axis::{AxisMask, AXIS_COUNT};

/// Step and direction outputs for all axes
pub trait StepPort {
    /// Drive the direction pins (set bit = negative direction)
    ///
    /// Called before every pulse; implementations may skip unchanged pins.
    fn set_directions(&mut self, directions: AxisMask);

    /// Emit one step pulse on every axis in `steps`
    fn pulse(&mut self, steps: AxisMask);

    /// Enable or disable the drivers
    ///
    /// When disabled the motors do not hold position.
    fn enable(&mut self, enabled: bool);
}

/// Port that counts pulses per axis instead of driving pins
///
/// Used by host tests and by boards running without motors attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RecordingPort {
    /// Net signed pulses per axis
    pub position: [i32; AXIS_COUNT],
    /// Total pulses per axis
    pub pulses: [u32; AXIS_COUNT],
    pub directions: AxisMask,
    pub enabled: bool,
}

impl StepPort for RecordingPort {
    fn set_directions(&mut self, directions: AxisMask) {
        self.directions = directions;
    }

    fn pulse(&mut self, steps: AxisMask) {
        for i in 0..AXIS_COUNT {
            if steps.has_index(i) {
                self.pulses[i] += 1;
                if self.directions.has_index(i) {
                    self.position[i] -= 1;
                } else {
                    self.position[i] += 1;
                }
            }
        }
    }

    fn enable(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolator::TickOutput;

    #[test]
    fn test_tick_output_drives_port() {
        let mut port = RecordingPort::default();
        port.enable(true);

        let out = TickOutput {
            steps: AxisMask::X | AxisMask::Z,
            directions: AxisMask::Z,
            period: 100,
        };
        out.apply(&mut port);
        out.apply(&mut port);

        assert!(port.enabled);
        assert_eq!(port.pulses, [2, 0, 2, 0]);
        assert_eq!(port.position, [2, 0, -2, 0]);
    }

    #[test]
    fn test_empty_output_only_sets_directions() {
        let mut port = RecordingPort::default();
        TickOutput {
            steps: AxisMask::empty(),
            directions: AxisMask::Y,
            period: 1000,
        }
        .apply(&mut port);
        assert_eq!(port.pulses, [0; 4]);
        assert_eq!(port.directions, AxisMask::Y);
    }
}
