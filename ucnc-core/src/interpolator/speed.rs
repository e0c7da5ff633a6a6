//! Speed adjustments layered over a segment's planned ramp
//!
//! The planned ramp assumes the machine follows it from the block's first
//! step. Holds and restarts break that assumption, so the interpolator
//! caps the ramp with one of these limits until it no longer binds.

use crate::planner::profile::isqrt;
use crate::planner::Ramp;

/// Active cap on the planned step rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpeedControl {
    /// Follow the planned ramp
    #[default]
    Planned,
    /// Accelerate from `origin_sq` (rate²) at step `origin_step`
    Limit { origin_sq: u64, origin_step: u32 },
    /// Decelerate from `start_sq` (rate²) at step `start_step` to a stop
    Hold { start_sq: u64, start_step: u32 },
}

impl SpeedControl {
    /// Accelerate from rest at `step`
    pub const fn from_rest(step: u32) -> Self {
        SpeedControl::Limit {
            origin_sq: 0,
            origin_step: step,
        }
    }

    /// Check whether a hold deceleration is in progress
    pub fn is_holding(&self) -> bool {
        matches!(self, SpeedControl::Hold { .. })
    }

    /// Start decelerating at `step` from `rate`
    pub fn hold(rate: u32, step: u32) -> Self {
        let r = rate as u64;
        SpeedControl::Hold {
            start_sq: r * r,
            start_step: step,
        }
    }

    /// Rate for step event `step`, or `None` once a hold has to stop
    ///
    /// A limit that no longer binds reverts to the planned ramp.
    pub fn rate(&mut self, ramp: &Ramp, step: u32) -> Option<u32> {
        let planned = ramp.rate(step);
        let two_a = 2 * ramp.accel_rate as u64;

        match *self {
            SpeedControl::Planned => Some(planned),
            SpeedControl::Limit {
                origin_sq,
                origin_step,
            } => {
                let gained = two_a * (step.saturating_sub(origin_step) as u64 + 1);
                let limit = isqrt(origin_sq + gained);
                if limit >= ramp.peak_rate {
                    *self = SpeedControl::Planned;
                    Some(planned)
                } else {
                    Some(planned.min(limit).max(1))
                }
            }
            SpeedControl::Hold {
                start_sq,
                start_step,
            } => {
                let shed = two_a * (step.saturating_sub(start_step) as u64 + 1);
                // Below the speed of a first step from rest: stop here
                if start_sq < shed + two_a {
                    None
                } else {
                    Some(planned.min(isqrt(start_sq - shed)).max(1))
                }
            }
        }
    }

    /// Hold released mid-deceleration: accelerate again from `rate`
    pub fn release(self, rate: u32, step: u32) -> Self {
        match self {
            SpeedControl::Hold { .. } => {
                let r = rate as u64;
                SpeedControl::Limit {
                    origin_sq: r * r,
                    origin_step: step,
                }
            }
            other => other,
        }
    }

    /// Continue into the next block at the same path speed
    ///
    /// `rate` is the converted rate in the new block's steps.
    pub fn carry(self, rate: u32) -> Self {
        let r = rate as u64;
        match self {
            SpeedControl::Planned => SpeedControl::Planned,
            SpeedControl::Limit { .. } => SpeedControl::Limit {
                origin_sq: r * r,
                origin_step: 0,
            },
            SpeedControl::Hold { .. } => SpeedControl::Hold {
                start_sq: r * r,
                start_step: 0,
            },
        }
    }
}

/// Convert a step rate between blocks with different steps per path unit
pub fn convert_rate(rate: u32, from: &Ramp, to: &Ramp) -> u32 {
    if from.steps_per_unit <= 0.0 {
        return rate;
    }
    libm::rintf(rate as f32 * to.steps_per_unit / from.steps_per_unit) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::ProfileKind;

    /// 10000 steps cruising at 10000 steps/s, 100000 steps/s² acceleration
    fn cruise() -> Ramp {
        Ramp::new(ProfileKind::Trapezoidal, 10_000, 100.0, 100.0, 100.0, 100.0, 1000.0)
    }

    #[test]
    fn test_planned_follows_ramp() {
        let ramp = cruise();
        let mut control = SpeedControl::Planned;
        assert_eq!(control.rate(&ramp, 5000), Some(10_000));
    }

    #[test]
    fn test_hold_decelerates_to_stop() {
        let ramp = cruise();
        let mut control = SpeedControl::hold(10_000, 100);
        let mut prev = 10_000u64;
        let mut step = 100;
        while let Some(rate) = control.rate(&ramp, step) {
            let r = rate as u64;
            assert!(r <= prev);
            assert!(prev * prev - r * r <= 2 * ramp.accel_rate as u64 + 2 * prev + 2);
            prev = r;
            step += 1;
        }
        // v² / 2a = 10^8 / 2·10^5 = 500 steps to stop
        assert!((498..=500).contains(&(step - 100)), "{}", step - 100);
        assert!(prev < 1000);
    }

    #[test]
    fn test_hold_from_rest_stops_immediately() {
        let ramp = cruise();
        let mut control = SpeedControl::hold(0, 10);
        assert_eq!(control.rate(&ramp, 10), None);
    }

    #[test]
    fn test_limit_reverts_to_planned() {
        let ramp = cruise();
        let mut control = SpeedControl::from_rest(200);
        let first = control.rate(&ramp, 200).unwrap();
        // sqrt(2 · 100000)
        assert_eq!(first, 447);
        for step in 201..1000 {
            control.rate(&ramp, step);
        }
        assert_eq!(control, SpeedControl::Planned);
    }

    #[test]
    fn test_release_and_carry() {
        let held = SpeedControl::hold(5000, 7);
        assert_eq!(
            held.release(4000, 20),
            SpeedControl::Limit {
                origin_sq: 16_000_000,
                origin_step: 20
            }
        );
        assert_eq!(
            held.carry(3000),
            SpeedControl::Hold {
                start_sq: 9_000_000,
                start_step: 0
            }
        );
        assert_eq!(SpeedControl::Planned.carry(3000), SpeedControl::Planned);
    }

    #[test]
    fn test_convert_rate() {
        let from = cruise();
        let to = Ramp::new(ProfileKind::Trapezoidal, 1000, 50.0, 0.0, 100.0, 0.0, 1000.0);
        assert_eq!(convert_rate(10_000, &from, &to), 5_000);
    }
}
