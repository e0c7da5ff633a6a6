//! State machine definition
//!
//! Planner admission and interpolator stepping are a function of the
//! current state. Alarm is sticky: only `Unlock` or `Reset` leaves it.

use super::events::Event;

/// Machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// No motion queued or executing
    #[default]
    Idle,
    /// Executing feed/rapid motion
    Run,
    /// Motion decelerated and paused, queue kept
    Hold,
    /// Executing jog motion
    Jog,
    /// Homing cycle in progress
    Homing,
    /// Fault latched; motion refused until unlocked
    Alarm(FaultKind),
    /// Safety door open; behaves like Hold until the door closes
    Door,
}

/// Causes escalated to Alarm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultKind {
    /// Step tick handler overran its period
    TimingDeadlineMissed,
    /// Hard limit switch tripped
    LimitTrip,
    /// Probe contact outside a probing move
    ProbeTrip,
    /// Emergency stop input
    EmergencyStop,
    /// Homing cycle failed to find a switch
    HomingFailed,
}

impl FaultKind {
    /// Externally detected fault of the moving mass
    pub fn is_physical(&self) -> bool {
        !matches!(self, FaultKind::TimingDeadlineMissed)
    }

    /// Non-zero code for atomic storage
    pub const fn code(self) -> u8 {
        match self {
            FaultKind::TimingDeadlineMissed => 1,
            FaultKind::LimitTrip => 2,
            FaultKind::ProbeTrip => 3,
            FaultKind::EmergencyStop => 4,
            FaultKind::HomingFailed => 5,
        }
    }

    /// Inverse of [`FaultKind::code`]; 0 and unknown codes map to `None`
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(FaultKind::TimingDeadlineMissed),
            2 => Some(FaultKind::LimitTrip),
            3 => Some(FaultKind::ProbeTrip),
            4 => Some(FaultKind::EmergencyStop),
            5 => Some(FaultKind::HomingFailed),
            _ => None,
        }
    }
}

impl State {
    /// Check if this is the alarm state
    pub fn is_alarm(&self) -> bool {
        matches!(self, State::Alarm(_))
    }

    /// Process an event and return the next state
    pub fn transition(self, event: Event) -> Self {
        use Event::*;
        use State::*;

        match (self, event) {
            // Faults win from every state; the latest cause is kept
            (_, Fault(kind)) => Alarm(kind),

            // Alarm only clears on explicit request
            (Alarm(_), Unlock | Reset) => Idle,
            (Alarm(_), _) => self,

            (_, Reset) => Idle,

            // Idle transitions
            (Idle, CycleStart) => Run,
            (Idle, JogStart) => Jog,
            (Idle, HomeStart) => Homing,
            (Idle, DoorOpened) => Door,

            // Run transitions
            (Run, FeedHold) => Hold,
            (Run, QueueEmpty) => Idle,
            (Run, DoorOpened) => Door,

            // Hold transitions
            (Hold, Resume) => Run,
            (Hold, DoorOpened) => Door,

            // Jog transitions; a held jog is cancelled, never resumed
            (Jog, FeedHold) => Idle,
            (Jog, JogCancel) => Idle,
            (Jog, QueueEmpty) => Idle,
            (Jog, DoorOpened) => Door,

            // Door transitions
            (Door, DoorClosed) => Hold,

            // Homing transitions
            (Homing, HomeComplete) => Idle,
            (Homing, DoorOpened) => Alarm(FaultKind::HomingFailed),

            // Default: stay in current state
            _ => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_start_and_drain() {
        let state = State::Idle.transition(Event::CycleStart);
        assert_eq!(state, State::Run);
        assert_eq!(state.transition(Event::QueueEmpty), State::Idle);
    }

    #[test]
    fn test_hold_and_resume() {
        let held = State::Run.transition(Event::FeedHold);
        assert_eq!(held, State::Hold);
        // Queue drain does not leave hold
        assert_eq!(held.transition(Event::QueueEmpty), State::Hold);
        assert_eq!(held.transition(Event::Resume), State::Run);
    }

    #[test]
    fn test_fault_from_any_state() {
        let states = [
            State::Idle,
            State::Run,
            State::Hold,
            State::Jog,
            State::Homing,
            State::Door,
        ];

        for state in states {
            let next = state.transition(Event::Fault(FaultKind::LimitTrip));
            assert_eq!(next, State::Alarm(FaultKind::LimitTrip));
        }
    }

    #[test]
    fn test_alarm_is_sticky() {
        let alarm = State::Alarm(FaultKind::EmergencyStop);
        for event in [
            Event::CycleStart,
            Event::JogStart,
            Event::Resume,
            Event::QueueEmpty,
            Event::HomeStart,
            Event::DoorClosed,
        ] {
            assert_eq!(alarm.transition(event), alarm);
        }
        assert_eq!(alarm.transition(Event::Unlock), State::Idle);
        assert_eq!(alarm.transition(Event::Reset), State::Idle);
    }

    #[test]
    fn test_door_blocks_run_until_closed() {
        let door = State::Run.transition(Event::DoorOpened);
        assert_eq!(door, State::Door);
        assert_eq!(door.transition(Event::Resume), State::Door);
        assert_eq!(door.transition(Event::CycleStart), State::Door);

        let closed = door.transition(Event::DoorClosed);
        assert_eq!(closed, State::Hold);
        assert_eq!(closed.transition(Event::Resume), State::Run);
    }

    #[test]
    fn test_jog_only_from_idle() {
        assert_eq!(State::Idle.transition(Event::JogStart), State::Jog);
        assert_eq!(State::Run.transition(Event::JogStart), State::Run);
        assert_eq!(State::Jog.transition(Event::JogCancel), State::Idle);
        assert_eq!(State::Jog.transition(Event::FeedHold), State::Idle);
        assert_eq!(State::Jog.transition(Event::CycleStart), State::Jog);
    }

    #[test]
    fn test_homing_cycle() {
        let homing = State::Idle.transition(Event::HomeStart);
        assert_eq!(homing, State::Homing);
        assert_eq!(homing.transition(Event::QueueEmpty), State::Homing);
        assert_eq!(homing.transition(Event::HomeComplete), State::Idle);
        assert_eq!(
            homing.transition(Event::Fault(FaultKind::HomingFailed)),
            State::Alarm(FaultKind::HomingFailed)
        );
        assert_eq!(State::Run.transition(Event::HomeStart), State::Run);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        for state in [State::Run, State::Hold, State::Jog, State::Door, State::Homing] {
            assert_eq!(state.transition(Event::Reset), State::Idle);
        }
    }

    #[test]
    fn test_fault_codes() {
        for kind in [
            FaultKind::TimingDeadlineMissed,
            FaultKind::LimitTrip,
            FaultKind::ProbeTrip,
            FaultKind::EmergencyStop,
            FaultKind::HomingFailed,
        ] {
            assert_eq!(FaultKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(FaultKind::from_code(0), None);
        assert!(!FaultKind::TimingDeadlineMissed.is_physical());
        assert!(FaultKind::ProbeTrip.is_physical());
    }
}
