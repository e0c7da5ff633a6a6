//! Hardware abstraction traits
//!
//! These traits define the interface between the motion pipeline and the
//! board collaborator that owns the pins and timers.

pub mod stepper;

pub use stepper::{RecordingPort, StepPort};
