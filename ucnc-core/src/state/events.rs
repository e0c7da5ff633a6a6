//! Events that trigger state transitions

use super::machine::FaultKind;

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    // Motion events
    /// A feed or rapid block was admitted
    CycleStart,
    /// A jog block was admitted
    JogStart,
    /// Planner and interpolator have drained
    QueueEmpty,

    // Operator commands
    /// Decelerate to a stop and keep the remaining motion
    FeedHold,
    /// Continue held motion
    Resume,
    /// Stop jogging and discard queued jog motion
    JogCancel,
    /// Stop, discard all motion and return to idle
    Reset,
    /// Leave alarm after the operator has cleared the cause
    Unlock,

    // Safety door
    /// Door opened; motion holds until closed
    DoorOpened,
    /// Door closed; motion stays held until resumed
    DoorClosed,

    // Homing
    /// Homing cycle started
    HomeStart,
    /// Homing cycle finished and position was set
    HomeComplete,

    // Faults
    /// Fault escalated from a collaborator or the tick context
    Fault(FaultKind),
}
