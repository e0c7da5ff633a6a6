//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.
//! The stepper task runs on the high-priority interrupt executor, all
//! others on the thread-mode executor.

pub mod inputs;
pub mod motion;
pub mod status;
pub mod stepper;

pub use inputs::{door_task, limits_task};
pub use motion::motion_task;
pub use status::status_task;
pub use stepper::stepper_task;
