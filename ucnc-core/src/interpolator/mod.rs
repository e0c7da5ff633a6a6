//! Real-time step interpolator
//!
//! Runs in the tick context. Every call to [`Interpolator::tick`] is one
//! timer firing: it decides which axes pulse now and returns the period
//! until the next firing. Segments arrive from the planner through the
//! single-producer/single-consumer handoff queue; completion is reported
//! back by bumping the retired counter in [`MotionShared`].
//!
//! ```text
//!            dequeue                   last step event
//!   Idle ─────────────► Executing ─────────────────────► BlockDone
//!    ▲                   │     ▲                            │
//!    │   hold stopped    │     │ stop flags cleared         │ next segment
//!    │                   ▼     │                            ▼
//!    └────── flush ──── Paused ┘                        Executing / Idle
//! ```
//!
//! Stop requests (HOLD, ALARM, DOOR) decelerate with the segment's own
//! acceleration and keep the remaining steps for resume. The actuator
//! position is owned here and only published to [`MotionShared`].

pub mod bresenham;
pub mod deadline;
pub mod speed;

pub use bresenham::{spread_level, StepSpread};
pub use deadline::DeadlineMonitor;
pub use speed::SpeedControl;

use crate::axis::{AxisMask, Steps, AXIS_COUNT};
use crate::config::{DssSettings, MotionSettings};
use crate::planner::{HandoffConsumer, Segment};
use crate::state::{ExecFlags, MotionShared, StepperStatus};
use crate::traits::StepPort;

/// Interpolator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterpolatorState {
    /// No segment loaded
    Idle,
    /// Stepping the loaded segment
    Executing,
    /// Loaded segment finished and retired, next one loads on the next tick
    BlockDone,
    /// Stopped mid-segment by a stop request, remaining steps kept
    Paused,
}

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickOutput {
    /// Axes to pulse now
    pub steps: AxisMask,
    /// Direction bits of the loaded segment (set = negative)
    pub directions: AxisMask,
    /// Timer counts until the next tick
    pub period: u32,
}

impl TickOutput {
    /// Drive the step and direction outputs
    pub fn apply<P: StepPort>(&self, port: &mut P) {
        port.set_directions(self.directions);
        if !self.steps.is_empty() {
            port.pulse(self.steps);
        }
    }
}

/// Segment being executed
#[derive(Debug, Clone, Copy)]
struct Active {
    segment: Segment,
    spread: StepSpread,
    /// +1 / -1 per axis
    sign: [i32; AXIS_COUNT],
    /// Completed step events
    event: u32,
    /// Sub-ticks done in the current event
    sub: u32,
    level: u8,
    /// Rate of the current event, steps/s
    rate: u32,
    control: SpeedControl,
}

impl Active {
    fn new(segment: Segment, max_level: u8, control: SpeedControl, rate: u32) -> Self {
        let mut sign = [1; AXIS_COUNT];
        for (i, s) in sign.iter_mut().enumerate() {
            if segment.directions.has_index(i) {
                *s = -1;
            }
        }
        Self {
            spread: StepSpread::new(&segment.steps, segment.ramp.total, max_level),
            segment,
            sign,
            event: 0,
            sub: 0,
            level: 0,
            rate,
            control,
        }
    }

    fn finished(&self) -> bool {
        self.event >= self.segment.ramp.total
    }
}

/// The tick-context stepper
pub struct Interpolator<'a> {
    consumer: HandoffConsumer<'a>,
    shared: &'a MotionShared,
    state: InterpolatorState,
    active: Option<Active>,
    position: Steps,
    timer_hz: u32,
    idle_period: u32,
    dss: DssSettings,
}

impl<'a> Interpolator<'a> {
    pub fn new(
        consumer: HandoffConsumer<'a>,
        shared: &'a MotionShared,
        settings: &MotionSettings,
    ) -> Self {
        let position = shared.position();
        shared.set_status(StepperStatus::IDLE);
        Self {
            consumer,
            shared,
            state: InterpolatorState::Idle,
            active: None,
            position,
            timer_hz: settings.timer_hz,
            idle_period: idle_period(settings),
            dss: settings.dss,
        }
    }

    /// Take new timer and DSS settings; applied from the next segment
    pub fn configure(&mut self, settings: &MotionSettings) {
        self.timer_hz = settings.timer_hz;
        self.idle_period = idle_period(settings);
        self.dss = settings.dss;
    }

    pub fn state(&self) -> InterpolatorState {
        self.state
    }

    /// Actuator position as stepped so far
    pub fn position(&self) -> Steps {
        self.position
    }

    /// Run one timer tick
    pub fn tick(&mut self) -> TickOutput {
        let exec = self.shared.exec();
        match self.state {
            InterpolatorState::Idle => self.tick_idle(exec),
            InterpolatorState::BlockDone => self.tick_block_done(exec),
            InterpolatorState::Paused => self.tick_paused(exec),
            InterpolatorState::Executing => self.step(exec),
        }
    }

    fn tick_idle(&mut self, exec: ExecFlags) -> TickOutput {
        if exec.contains(ExecFlags::FLUSH) {
            self.flush();
            return self.idle_output();
        }

        if let Some(position) = self.shared.take_position_sync() {
            self.position = position;
            self.shared.publish_position(position);
        }

        if exec.intersects(ExecFlags::STOPPING) {
            return self.idle_output();
        }

        match self.consumer.dequeue() {
            Some(segment) => {
                self.load(segment, SpeedControl::from_rest(0), 0);
                self.step(exec)
            }
            None => self.idle_output(),
        }
    }

    fn tick_block_done(&mut self, exec: ExecFlags) -> TickOutput {
        let Some(done) = self.active.take() else {
            return self.go_idle();
        };

        let Some(segment) = self.consumer.dequeue() else {
            return self.go_idle();
        };

        let rate = speed::convert_rate(done.rate, &done.segment.ramp, &segment.ramp);
        self.load(segment, done.control.carry(rate), rate);
        self.step(exec)
    }

    fn tick_paused(&mut self, exec: ExecFlags) -> TickOutput {
        if exec.contains(ExecFlags::FLUSH) {
            // The paused segment counts as retired
            self.active = None;
            self.shared.retire(1);
            self.flush();
            return self.idle_output();
        }

        if exec.intersects(ExecFlags::STOPPING) {
            return self.idle_output();
        }

        let Some(active) = self.active.as_mut() else {
            return self.go_idle();
        };
        active.control = SpeedControl::from_rest(active.event);
        active.rate = 0;
        self.state = InterpolatorState::Executing;
        self.shared.set_status(StepperStatus::empty());
        self.step(exec)
    }

    /// Drop every queued segment and return to idle
    fn flush(&mut self) {
        while self.consumer.dequeue().is_some() {
            self.shared.retire(1);
        }
        self.state = InterpolatorState::Idle;
        self.shared.set_status(StepperStatus::IDLE);
        self.shared.set_step_rate(0);
        self.shared.clear_exec(ExecFlags::FLUSH | ExecFlags::HOLD);
    }

    fn load(&mut self, segment: Segment, control: SpeedControl, rate: u32) {
        let spindle = segment.spindle * self.shared.spindle_override() as f32 / 100.0;
        self.shared.set_spindle_rpm(libm::rintf(spindle.max(0.0)) as u32);

        self.active = Some(Active::new(
            segment,
            self.dss.max_oversampling,
            control,
            rate,
        ));
        self.state = InterpolatorState::Executing;
        self.shared.set_status(StepperStatus::empty());
    }

    fn go_idle(&mut self) -> TickOutput {
        self.active = None;
        self.state = InterpolatorState::Idle;
        self.shared.set_status(StepperStatus::IDLE);
        self.shared.set_step_rate(0);
        self.idle_output()
    }

    fn idle_output(&self) -> TickOutput {
        TickOutput {
            steps: AxisMask::empty(),
            directions: self
                .active
                .map_or(AxisMask::empty(), |a| a.segment.directions),
            period: self.idle_period,
        }
    }

    /// One sub-tick of the loaded segment
    fn step(&mut self, exec: ExecFlags) -> TickOutput {
        let Some(mut active) = self.active else {
            return self.go_idle();
        };
        if active.finished() {
            // Zero-length segment
            self.shared.retire(1);
            self.state = InterpolatorState::BlockDone;
            return self.idle_output();
        }

        if active.sub == 0 {
            // Step event boundary: speed and oversampling may change here
            let stopping = exec.intersects(ExecFlags::STOPPING);
            if stopping && !active.control.is_holding() {
                active.control = SpeedControl::hold(active.rate, active.event);
            } else if !stopping && active.control.is_holding() {
                active.control = active.control.release(active.rate, active.event);
            }

            match active.control.rate(&active.segment.ramp, active.event) {
                Some(rate) => {
                    active.rate = rate;
                    active.level = spread_level(rate, &self.dss).min(active.spread.max_level());
                }
                None => {
                    active.rate = 0;
                    self.active = Some(active);
                    self.state = InterpolatorState::Paused;
                    self.shared.set_status(StepperStatus::STOPPED);
                    self.shared.set_step_rate(0);
                    return self.idle_output();
                }
            }
            self.shared.set_step_rate(active.rate);
        }

        let steps = active.spread.sub_tick(active.level);
        if !steps.is_empty() && !active.segment.compensation {
            for i in 0..AXIS_COUNT {
                if steps.has_index(i) {
                    self.position[i] = self.position[i].wrapping_add(active.sign[i]);
                }
            }
            self.shared.publish_position(self.position);
        }

        let sub_rate = (active.rate as u64) << active.level;
        let period = (self.timer_hz as u64 / sub_rate.max(1)).clamp(1, u32::MAX as u64) as u32;

        active.sub += 1;
        if active.sub >= 1 << active.level {
            active.sub = 0;
            active.event += 1;
        }

        let directions = active.segment.directions;
        if active.finished() {
            self.shared.retire(1);
            self.state = InterpolatorState::BlockDone;
        }
        self.active = Some(active);

        TickOutput {
            steps,
            directions,
            period,
        }
    }
}

fn idle_period(settings: &MotionSettings) -> u32 {
    (settings.timer_hz / settings.idle_rate_hz.max(1)).max(1)
}
