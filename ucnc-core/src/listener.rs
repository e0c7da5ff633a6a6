//! State change observers
//!
//! Collaborators such as a signal light, a status LED or the spindle
//! controller register here to follow the execution state. Listeners are
//! called in registration order, from the foreground context, after the
//! transition has taken effect.

use heapless::Vec;

use crate::state::{FaultKind, State};

/// Maximum number of registered listeners
pub const MAX_LISTENERS: usize = 4;

/// Registry errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ListenerError {
    /// No free registration slot
    Full,
}

/// Observer of execution state changes
pub trait StateListener {
    /// Called after every state change
    fn on_state_change(&mut self, from: State, to: State);

    /// Called when a fault escalates to Alarm
    fn on_fault(&mut self, fault: FaultKind) {
        let _ = fault;
    }
}

/// Ordered listener registry
pub struct Listeners<'a, const N: usize = MAX_LISTENERS> {
    listeners: Vec<&'a mut dyn StateListener, N>,
}

impl<'a, const N: usize> Default for Listeners<'a, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, const N: usize> Listeners<'a, N> {
    pub const fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Append a listener
    pub fn register(&mut self, listener: &'a mut dyn StateListener) -> Result<(), ListenerError> {
        self.listeners
            .push(listener)
            .map_err(|_| ListenerError::Full)
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Notify every listener of a transition
    pub fn state_changed(&mut self, from: State, to: State) {
        for listener in self.listeners.iter_mut() {
            listener.on_state_change(from, to);
        }
    }

    /// Notify every listener of a fault
    pub fn fault(&mut self, fault: FaultKind) {
        for listener in self.listeners.iter_mut() {
            listener.on_fault(fault);
        }
    }
}

/// Tower light colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Light {
    #[default]
    Off,
    Green,
    Yellow,
    Red,
}

/// Three-color signal light following the machine state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SignalLight {
    pub light: Light,
    /// Blink while a fault is latched
    pub blinking: bool,
}

impl SignalLight {
    pub fn color_for(state: State) -> Light {
        match state {
            State::Idle => Light::Off,
            State::Run | State::Jog | State::Homing => Light::Green,
            State::Hold | State::Door => Light::Yellow,
            State::Alarm(_) => Light::Red,
        }
    }
}

impl StateListener for SignalLight {
    fn on_state_change(&mut self, _from: State, to: State) {
        self.light = Self::color_for(to);
        if !to.is_alarm() {
            self.blinking = false;
        }
    }

    fn on_fault(&mut self, _fault: FaultKind) {
        self.blinking = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        seen: Vec<(State, State), 8>,
    }

    impl StateListener for Recorder {
        fn on_state_change(&mut self, from: State, to: State) {
            let _ = self.seen.push((from, to));
        }
    }

    #[test]
    fn test_listeners_called_in_order() {
        let mut light = SignalLight::default();
        let mut recorder = Recorder { seen: Vec::new() };
        {
            let mut listeners: Listeners<'_, 2> = Listeners::new();
            listeners.register(&mut light).unwrap();
            listeners.register(&mut recorder).unwrap();
            assert_eq!(listeners.len(), 2);

            listeners.state_changed(State::Idle, State::Run);
            listeners.state_changed(State::Run, State::Alarm(FaultKind::LimitTrip));
            listeners.fault(FaultKind::LimitTrip);
        }
        assert_eq!(light.light, Light::Red);
        assert!(light.blinking);
        assert_eq!(recorder.seen.len(), 2);
        assert_eq!(recorder.seen[0], (State::Idle, State::Run));
    }

    #[test]
    fn test_registry_full() {
        let mut a = SignalLight::default();
        let mut b = SignalLight::default();
        let mut listeners: Listeners<'_, 1> = Listeners::new();
        listeners.register(&mut a).unwrap();
        assert_eq!(listeners.register(&mut b), Err(ListenerError::Full));
    }

    #[test]
    fn test_signal_light_clears_blink() {
        let mut light = SignalLight::default();
        light.on_fault(FaultKind::EmergencyStop);
        light.on_state_change(State::Alarm(FaultKind::EmergencyStop), State::Idle);
        assert_eq!(light.light, Light::Off);
        assert!(!light.blinking);
    }
}
