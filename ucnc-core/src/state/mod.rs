//! Execution state machine
//!
//! Machine-wide state gating planner admission and interpolator stepping,
//! plus the flag block shared between the foreground and the step tick.

pub mod events;
pub mod machine;
pub mod shared;

pub use events::Event;
pub use machine::{FaultKind, State};
pub use shared::{ExecFlags, MotionShared, StepperStatus};
