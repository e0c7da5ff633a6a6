//! Board outputs
//!
//! Pin assignments are board-specific. For the BTT SKR Pico:
//!
//! | Axis | STEP   | DIR    | ENABLE |
//! |------|--------|--------|--------|
//! | X    | GPIO11 | GPIO10 | GPIO12 |
//! | Y    | GPIO6  | GPIO5  | GPIO7  |
//! | Z    | GPIO19 | GPIO28 | GPIO2  |
//! | A    | GPIO14 | GPIO13 | GPIO15 |
//!
//! Endstops X/Y/Z on GPIO4/3/25, e-stop on GPIO16 (E0-STOP), door switch
//! on GPIO22 (probe header), signal light on the fan outputs GPIO17/18/20.

use embedded_hal::digital::{OutputPin, PinState};

use ucnc_core::listener::{Light, SignalLight, StateListener};
use ucnc_core::state::{FaultKind, State};
use ucnc_core::traits::StepPort;
use ucnc_core::{AxisMask, AXIS_COUNT};

/// Core clock cycles the STEP line stays high (~2 µs at 125 MHz)
const PULSE_CYCLES: u32 = 250;

/// Core clock cycles between a DIR change and the next STEP edge
const DIR_SETUP_CYCLES: u32 = 125;

/// Step/direction drivers on plain GPIO
pub struct PinStepPort<P> {
    step: [P; AXIS_COUNT],
    dir: [P; AXIS_COUNT],
    enable: [P; AXIS_COUNT],
    /// Drivers are enabled with a low level (TMC2209, A4988)
    enable_inverted: bool,
    directions: AxisMask,
}

impl<P: OutputPin> PinStepPort<P> {
    pub fn new(
        step: [P; AXIS_COUNT],
        dir: [P; AXIS_COUNT],
        enable: [P; AXIS_COUNT],
        enable_inverted: bool,
    ) -> Self {
        let mut port = Self {
            step,
            dir,
            enable,
            enable_inverted,
            directions: AxisMask::empty(),
        };
        for pin in port.step.iter_mut().chain(port.dir.iter_mut()) {
            let _ = pin.set_low();
        }
        port.enable(false);
        port
    }
}

impl<P: OutputPin> StepPort for PinStepPort<P> {
    fn set_directions(&mut self, directions: AxisMask) {
        if directions == self.directions {
            return;
        }
        for (i, pin) in self.dir.iter_mut().enumerate() {
            let _ = pin.set_state(PinState::from(directions.has_index(i)));
        }
        self.directions = directions;
        cortex_m::asm::delay(DIR_SETUP_CYCLES);
    }

    fn pulse(&mut self, steps: AxisMask) {
        if steps.is_empty() {
            return;
        }
        for (i, pin) in self.step.iter_mut().enumerate() {
            if steps.has_index(i) {
                let _ = pin.set_high();
            }
        }
        cortex_m::asm::delay(PULSE_CYCLES);
        for pin in self.step.iter_mut() {
            let _ = pin.set_low();
        }
    }

    fn enable(&mut self, enabled: bool) {
        let level = PinState::from(enabled != self.enable_inverted);
        for pin in self.enable.iter_mut() {
            let _ = pin.set_state(level);
        }
    }
}

/// Green/yellow/red tower light driven from state changes
pub struct TowerLight<P> {
    green: P,
    yellow: P,
    red: P,
    signal: SignalLight,
}

impl<P: OutputPin> TowerLight<P> {
    pub fn new(green: P, yellow: P, red: P) -> Self {
        let mut light = Self {
            green,
            yellow,
            red,
            signal: SignalLight::default(),
        };
        light.show();
        light
    }

    fn show(&mut self) {
        let on = self.signal.light;
        let _ = self.green.set_state(PinState::from(on == Light::Green));
        let _ = self.yellow.set_state(PinState::from(on == Light::Yellow));
        let _ = self.red.set_state(PinState::from(on == Light::Red));
    }
}

impl<P: OutputPin> StateListener for TowerLight<P> {
    fn on_state_change(&mut self, from: State, to: State) {
        self.signal.on_state_change(from, to);
        self.show();
    }

    fn on_fault(&mut self, fault: FaultKind) {
        self.signal.on_fault(fault);
        defmt::warn!("Signal light: fault {:?}", fault);
    }
}
