//! Motion settings
//!
//! These values are owned by an external settings collaborator and consumed
//! read-only by the kinematics, planner and interpolator at initialization
//! and on explicit reload.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::axis::AXIS_COUNT;
use crate::planner::ProfileKind;

use super::ConfigError;

/// Maximum supported DSS oversampling level (2^3 sub-ticks per step)
pub const MAX_DSS_OVERSAMPLING: u8 = 3;

/// Per-axis limits and scaling
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AxisSettings {
    /// Actuator steps per machine unit (mm, or degrees for rotary actuators)
    pub steps_per_unit: f32,
    /// Maximum feed rate in units/min
    pub max_feed: f32,
    /// Maximum acceleration in units/s²
    pub max_accel: f32,
    /// Maximum travel in units (used by soft limits)
    pub max_travel: f32,
    /// Backlash to take up on direction reversal, in steps
    pub backlash_steps: u16,
}

impl Default for AxisSettings {
    fn default() -> Self {
        Self {
            steps_per_unit: 80.0,
            max_feed: 3000.0,
            max_accel: 500.0,
            max_travel: 200.0,
            backlash_steps: 0,
        }
    }
}

/// Machine geometry
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum KinematicsConfig {
    /// One actuator per axis
    #[default]
    Cartesian,
    /// X and Y driven by two belts in combination
    CoreXY,
    /// Three vertical carriages with parallel arms to a planar effector
    LinearDelta {
        /// Diagonal rod length
        arm_length: f32,
        /// Horizontal distance from center to the carriage joints
        base_radius: f32,
        /// Horizontal distance from effector center to its joints
        effector_radius: f32,
    },
    /// Three rotating biceps with forearms to a planar effector
    RotaryDelta {
        /// Motor shaft to elbow
        bicep_length: f32,
        /// Elbow to effector joint
        forearm_length: f32,
        /// Center to motor shaft
        base_radius: f32,
        /// Effector center to forearm joint
        effector_radius: f32,
    },
}

/// Shear factors compensating axis misalignment
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SkewFactors {
    pub xy: f32,
    pub xz: f32,
    pub yz: f32,
    /// Only correct the XY plane
    pub xy_only: bool,
}

impl SkewFactors {
    /// True when no correction is configured
    pub fn is_identity(&self) -> bool {
        self.xy == 0.0 && (self.xy_only || (self.xz == 0.0 && self.yz == 0.0))
    }
}

/// Dynamic Step Spread (oversampling) settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DssSettings {
    /// Maximum oversampling level, 0 disables DSS
    pub max_oversampling: u8,
    /// Step rate below which oversampling kicks in (Hz)
    pub cutoff_hz: u32,
}

impl Default for DssSettings {
    fn default() -> Self {
        Self {
            max_oversampling: 0,
            cutoff_hz: 500,
        }
    }
}

/// Allowed range and increments for feed/spindle overrides (percent)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OverrideLimits {
    pub min: u8,
    pub max: u8,
    pub coarse: u8,
    pub fine: u8,
}

impl Default for OverrideLimits {
    fn default() -> Self {
        Self {
            min: 10,
            max: 200,
            coarse: 10,
            fine: 1,
        }
    }
}

/// Complete motion configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MotionSettings {
    /// Per-axis settings, X, Y, Z, A
    pub axes: [AxisSettings; AXIS_COUNT],
    /// Junction deviation in units
    pub junction_deviation: f32,
    /// Machine geometry
    pub kinematics: KinematicsConfig,
    /// Skew correction
    pub skew: SkewFactors,
    /// Speed profile strategy
    pub profile: ProfileKind,
    /// Dynamic Step Spread
    pub dss: DssSettings,
    /// Step timer frequency in Hz (period unit of the interpolator)
    pub timer_hz: u32,
    /// Tick rate while no block is executing (Hz)
    pub idle_rate_hz: u32,
    /// Reject targets beyond `max_travel`
    pub soft_limits: bool,
    /// Feed and spindle override limits
    pub overrides: OverrideLimits,
}

impl Default for MotionSettings {
    fn default() -> Self {
        let xy = AxisSettings::default();
        Self {
            axes: [
                xy,
                xy,
                AxisSettings {
                    steps_per_unit: 400.0,
                    max_feed: 600.0,
                    max_accel: 100.0,
                    max_travel: 100.0,
                    backlash_steps: 0,
                },
                AxisSettings {
                    steps_per_unit: 10.0,
                    max_feed: 3600.0,
                    max_accel: 300.0,
                    max_travel: 360.0,
                    backlash_steps: 0,
                },
            ],
            junction_deviation: 0.01,
            kinematics: KinematicsConfig::Cartesian,
            skew: SkewFactors::default(),
            profile: ProfileKind::Trapezoidal,
            dss: DssSettings::default(),
            timer_hz: 1_000_000,
            idle_rate_hz: 1_000,
            soft_limits: false,
            overrides: OverrideLimits::default(),
        }
    }
}

impl MotionSettings {
    /// Check the settings for values the motion pipeline cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        for axis in &self.axes {
            let positive = |v: f32| v.is_finite() && v > 0.0;
            if !positive(axis.steps_per_unit) || !positive(axis.max_feed) || !positive(axis.max_accel)
            {
                return Err(ConfigError::InvalidAxis);
            }
            if !axis.max_travel.is_finite() || axis.max_travel < 0.0 {
                return Err(ConfigError::InvalidAxis);
            }
        }

        if !self.junction_deviation.is_finite() || self.junction_deviation <= 0.0 {
            return Err(ConfigError::InvalidJunction);
        }

        if self.timer_hz == 0 || self.idle_rate_hz == 0 || self.idle_rate_hz > self.timer_hz {
            return Err(ConfigError::InvalidTimer);
        }

        if self.dss.max_oversampling > MAX_DSS_OVERSAMPLING {
            return Err(ConfigError::InvalidTimer);
        }

        let o = &self.overrides;
        if o.min == 0 || o.min > 100 || o.max < 100 || o.fine == 0 || o.coarse < o.fine {
            return Err(ConfigError::InvalidOverrides);
        }

        match self.kinematics {
            KinematicsConfig::Cartesian | KinematicsConfig::CoreXY => Ok(()),
            KinematicsConfig::LinearDelta {
                arm_length,
                base_radius,
                effector_radius,
            } => {
                let radius = base_radius - effector_radius;
                if arm_length > 0.0 && radius > 0.0 && arm_length > radius {
                    Ok(())
                } else {
                    Err(ConfigError::InvalidGeometry)
                }
            }
            KinematicsConfig::RotaryDelta {
                bicep_length,
                forearm_length,
                base_radius,
                effector_radius,
            } => {
                if bicep_length > 0.0
                    && forearm_length > bicep_length
                    && base_radius > effector_radius
                    && effector_radius >= 0.0
                {
                    Ok(())
                } else {
                    Err(ConfigError::InvalidGeometry)
                }
            }
        }
    }
}
