//! Speed profiles
//!
//! A block's ramp is computed once at handoff from its entry, nominal and
//! exit speeds and its acceleration. The interpolator then asks the profile
//! for the step rate of every step event. Rates are steps/s of the block's
//! dominant axis.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Lowest rate handed to the interpolator; keeps periods finite
pub const MIN_STEP_RATE: u32 = 1;

/// Strategy for shaping speed along a block
pub trait SpeedProfile {
    /// Acceleration the planner must assume so the profile never exceeds
    /// `limit` (units/s²)
    fn planning_acceleration(&self, limit: f32) -> f32;

    /// Step rate for the 0-based step event `step` of `ramp`
    fn rate_at(&self, ramp: &Ramp, step: u32) -> u32;
}

/// Constant-acceleration ramps (accelerate, cruise, decelerate)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Trapezoidal;

/// Rounded ramps: speed² follows a smoothstep, so acceleration rises from
/// zero and falls back to zero at both ends of each ramp
///
/// Ramps are planned with 2/3 of the limit; the smoothstep's peak slope of
/// 3/2 then lands exactly on the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SCurve;

impl SpeedProfile for Trapezoidal {
    fn planning_acceleration(&self, limit: f32) -> f32 {
        limit
    }

    fn rate_at(&self, ramp: &Ramp, step: u32) -> u32 {
        let two_a = 2 * ramp.accel_rate as u64;
        let entry = ramp.entry_rate as u64;
        let exit = ramp.exit_rate as u64;

        let up = isqrt(entry * entry + two_a * (step as u64 + 1));
        let down = isqrt(exit * exit + two_a * ramp.total.saturating_sub(step) as u64);
        ramp.peak_rate.min(up).min(down)
    }
}

impl SpeedProfile for SCurve {
    fn planning_acceleration(&self, limit: f32) -> f32 {
        limit * (2.0 / 3.0)
    }

    fn rate_at(&self, ramp: &Ramp, step: u32) -> u32 {
        let peak_sq = sq(ramp.peak_rate);

        let v_sq = if step < ramp.accelerate_until {
            let u = (step + 1) as f32 / ramp.accelerate_until as f32;
            let entry_sq = sq(ramp.entry_rate);
            entry_sq + (peak_sq - entry_sq) * smoothstep(u)
        } else if step >= ramp.decelerate_after && ramp.total > ramp.decelerate_after {
            let u = (ramp.total - step) as f32 / (ramp.total - ramp.decelerate_after) as f32;
            let exit_sq = sq(ramp.exit_rate);
            exit_sq + (peak_sq - exit_sq) * smoothstep(u)
        } else {
            peak_sq
        };

        libm::rintf(libm::sqrtf(v_sq.max(0.0))) as u32
    }
}

fn sq(rate: u32) -> f32 {
    let r = rate as f32;
    r * r
}

fn smoothstep(u: f32) -> f32 {
    let u = u.clamp(0.0, 1.0);
    u * u * (3.0 - 2.0 * u)
}

/// Selectable profile strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ProfileKind {
    #[default]
    Trapezoidal,
    SCurve,
}

impl SpeedProfile for ProfileKind {
    fn planning_acceleration(&self, limit: f32) -> f32 {
        match self {
            ProfileKind::Trapezoidal => Trapezoidal.planning_acceleration(limit),
            ProfileKind::SCurve => SCurve.planning_acceleration(limit),
        }
    }

    fn rate_at(&self, ramp: &Ramp, step: u32) -> u32 {
        match self {
            ProfileKind::Trapezoidal => Trapezoidal.rate_at(ramp, step),
            ProfileKind::SCurve => SCurve.rate_at(ramp, step),
        }
    }
}

/// Precomputed speed ramp of one block, in steps
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ramp {
    pub profile: ProfileKind,
    /// Step events in the block
    pub total: u32,
    /// Step events spent accelerating
    pub accelerate_until: u32,
    /// Step event where deceleration starts
    pub decelerate_after: u32,
    pub entry_rate: u32,
    /// Cruise rate, or the highest rate reached when the block is too short
    pub peak_rate: u32,
    pub exit_rate: u32,
    /// Planning acceleration in steps/s²
    pub accel_rate: u32,
    /// Dominant-axis steps per path unit
    pub steps_per_unit: f32,
}

impl Ramp {
    /// Build a ramp from path speeds (units/s) and acceleration (units/s²)
    ///
    /// `steps_per_unit` converts path units to dominant-axis steps.
    pub fn new(
        profile: ProfileKind,
        total: u32,
        steps_per_unit: f32,
        entry: f32,
        nominal: f32,
        exit: f32,
        acceleration: f32,
    ) -> Self {
        let k = steps_per_unit;
        let e = entry * k;
        let n = nominal.max(entry).max(exit) * k;
        let x = exit * k;
        let two_a = (2.0 * acceleration * k).max(2.0);
        let total_f = total as f32;

        let accel_steps = ((n * n - e * e) / two_a).max(0.0);
        let decel_steps = ((n * n - x * x) / two_a).max(0.0);

        let (accel_steps, decel_steps, peak) = if accel_steps + decel_steps > total_f {
            // No cruise: meet where the two ramps intersect
            let acc = ((two_a * total_f + x * x - e * e) / (2.0 * two_a)).clamp(0.0, total_f);
            let peak = libm::sqrtf(e * e + two_a * acc);
            (acc, total_f - acc, peak)
        } else {
            (accel_steps, decel_steps, n)
        };

        let accelerate_until = (libm::rintf(accel_steps) as u32).min(total);
        let decelerate_after = total
            .saturating_sub(libm::rintf(decel_steps) as u32)
            .max(accelerate_until);

        Self {
            profile,
            total,
            accelerate_until,
            decelerate_after,
            entry_rate: libm::rintf(e) as u32,
            peak_rate: (libm::rintf(peak) as u32).max(MIN_STEP_RATE),
            exit_rate: libm::rintf(x) as u32,
            accel_rate: (libm::rintf(two_a * 0.5) as u32).max(1),
            steps_per_unit: k,
        }
    }

    /// Step rate for step event `step`
    pub fn rate(&self, step: u32) -> u32 {
        self.profile.rate_at(self, step).max(MIN_STEP_RATE)
    }
}

/// Integer square root, rounded down
pub fn isqrt(value: u64) -> u32 {
    let mut op = value;
    let mut res: u64 = 0;
    let mut one: u64 = 1 << 62;

    while one > op {
        one >>= 2;
    }
    while one != 0 {
        if op >= res + one {
            op -= res + one;
            res = (res >> 1) + one;
        } else {
            res >>= 1;
        }
        one >>= 2;
    }
    res as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isqrt() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(1), 1);
        assert_eq!(isqrt(15), 3);
        assert_eq!(isqrt(16), 4);
        assert_eq!(isqrt(100_000_000), 10_000);
        assert_eq!(isqrt(u64::MAX), u32::MAX);
    }

    #[test]
    fn test_trapezoid_with_cruise() {
        // 1000 steps, 100 steps/unit, 0 -> 100 -> 50 units/s at 1000 units/s²
        let ramp = Ramp::new(ProfileKind::Trapezoidal, 1000, 100.0, 0.0, 100.0, 50.0, 1000.0);
        assert_eq!(ramp.accelerate_until, 500);
        assert_eq!(ramp.decelerate_after, 625);
        assert_eq!(ramp.peak_rate, 10_000);
        assert_eq!(ramp.exit_rate, 5_000);
        assert_eq!(ramp.accel_rate, 100_000);

        assert_eq!(ramp.rate(499), 10_000);
        assert_eq!(ramp.rate(550), 10_000);
        assert!(ramp.rate(0) < 1_000);
        assert!(ramp.rate(999) >= 5_000 && ramp.rate(999) < 5_100);
    }

    #[test]
    fn test_trapezoid_without_cruise() {
        // Too short to reach nominal: symmetric triangle
        let ramp = Ramp::new(ProfileKind::Trapezoidal, 200, 100.0, 0.0, 100.0, 0.0, 1000.0);
        assert_eq!(ramp.accelerate_until, 100);
        assert_eq!(ramp.decelerate_after, 100);
        // sqrt(2 * 100000 * 100)
        assert_eq!(ramp.peak_rate, 4_472);
    }

    #[test]
    fn test_trapezoid_rates_respect_acceleration() {
        let ramp = Ramp::new(ProfileKind::Trapezoidal, 1000, 100.0, 10.0, 100.0, 0.0, 1000.0);
        let a = ramp.accel_rate as u64;
        let e = ramp.entry_rate as u64;
        for n in 0..ramp.total {
            let r = ramp.rate(n) as u64;
            assert!(r <= ramp.peak_rate as u64);
            assert!(r * r <= e * e + 2 * a * (n as u64 + 1));
            assert!(r * r <= 2 * a * (ramp.total - n) as u64);
        }
    }

    #[test]
    fn test_scurve_uses_reduced_planning_acceleration() {
        assert_eq!(SCurve.planning_acceleration(300.0), 200.0);
        assert_eq!(Trapezoidal.planning_acceleration(300.0), 300.0);
    }

    #[test]
    fn test_scurve_stays_within_limit() {
        let limit = 1000.0;
        let a_plan = SCurve.planning_acceleration(limit);
        let ramp = Ramp::new(ProfileKind::SCurve, 2000, 100.0, 0.0, 100.0, 0.0, a_plan);
        let a_limit = (limit * 100.0) as u64;
        for n in 0..ramp.total {
            let r = ramp.rate(n) as u64;
            assert!(r <= ramp.peak_rate as u64 + 1);
            // one unit of slack for rounding to whole steps/s
            let bound = isqrt(2 * a_limit * (n as u64 + 1)) as u64 + 1;
            assert!(r <= bound, "step {}: {} > {}", n, r, bound);
        }
        // Ramp ends gently: last step is slower than a trapezoid's
        let trap = Ramp::new(ProfileKind::Trapezoidal, 2000, 100.0, 0.0, 100.0, 0.0, limit);
        assert!(ramp.rate(ramp.total - 1) <= trap.rate(trap.total - 1));
    }

    #[test]
    fn test_profile_cruises_at_peak() {
        for profile in [ProfileKind::Trapezoidal, ProfileKind::SCurve] {
            let ramp = Ramp::new(profile, 10_000, 100.0, 0.0, 50.0, 0.0, 1000.0);
            assert!(ramp.accelerate_until < ramp.decelerate_after);
            let mid = (ramp.accelerate_until + ramp.decelerate_after) / 2;
            assert_eq!(ramp.rate(mid), 5_000);
        }
    }
}
