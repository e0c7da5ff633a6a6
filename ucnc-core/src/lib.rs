//! Board-agnostic motion pipeline for the uCNC stepper controller
//!
//! This crate contains everything between "move to this point" and
//! "pulse these step pins now", none of which depends on a specific board:
//!
//! - Machine kinematics (Cartesian, CoreXY, linear and rotary delta)
//! - Look-ahead motion planner with junction and override handling
//! - Real-time step interpolator with dynamic step spread
//! - Execution state machine and the state shared with the tick context
//! - Configuration types and their persisted form
//!
//! The foreground side is driven through [`context::MotionContext`]; the
//! tick side through [`interpolator::Interpolator::tick`]. The two meet only
//! at [`state::MotionShared`] and the block handoff queue.

#![no_std]
#![deny(unsafe_code)]

pub mod axis;
pub mod config;
pub mod context;
pub mod interpolator;
pub mod kinematics;
pub mod listener;
pub mod planner;
pub mod state;
pub mod traits;

pub use axis::{AxisMask, Coords, Steps, AXIS_COUNT};
pub use context::{MotionContext, Status};
