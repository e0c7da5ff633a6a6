//! Foreground motion context
//!
//! [`MotionContext`] is the one object collaborators talk to: the command
//! dispatcher admits targets and issues hold/resume/reset, the homing
//! driver uses the actuator-level calls, reporting reads [`Status`]. It
//! owns the planner, the kinematics and the execution state, and feeds the
//! tick context through the handoff producer.
//!
//! Call [`MotionContext::poll`] regularly (every foreground loop pass).
//! It hands planned blocks to the tick, picks up faults raised there and
//! notices when the queue has drained.

use crate::axis::{Coords, Steps};
use crate::config::{ConfigError, MotionSettings};
use crate::kinematics::Transform;
use crate::listener::{ListenerError, Listeners, StateListener};
use crate::planner::{
    Admission, HandoffProducer, MotionKind, MotionRequest, Overrides, PlanError, Planner,
    RapidOverride, PLANNER_CAPACITY,
};
use crate::state::{Event, ExecFlags, FaultKind, MotionShared, State};

/// Snapshot for status reports
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status {
    pub state: State,
    /// Last fault cause, kept after unlock
    pub last_fault: Option<FaultKind>,
    /// Actuator position in steps
    pub actuator: Steps,
    /// Cartesian position in machine units
    pub position: Coords,
    /// Dominant-axis step rate of the executing block, steps/s
    pub step_rate: u32,
    pub feed_override: u8,
    pub rapid_override: u8,
    pub spindle_override: u8,
    /// Override-scaled spindle speed of the executing block
    pub spindle_rpm: u32,
    /// Blocks admitted and not yet finished
    pub queued: usize,
    /// Free planner slots
    pub available: usize,
}

/// Foreground side of the motion pipeline
pub struct MotionContext<'a> {
    shared: &'a MotionShared,
    producer: HandoffProducer<'a>,
    planner: Planner,
    transform: Transform,
    settings: MotionSettings,
    overrides: Overrides,
    state: State,
    listeners: Listeners<'a>,
    /// Planner position must be re-read from the tick once it settles
    resync: bool,
}

impl<'a> MotionContext<'a> {
    /// Create the context from validated settings
    pub fn new(
        shared: &'a MotionShared,
        producer: HandoffProducer<'a>,
        settings: &MotionSettings,
    ) -> Self {
        let overrides = Overrides::new(settings.overrides);
        shared.store_overrides(
            overrides.feed,
            overrides.rapid.percent(),
            overrides.spindle,
        );

        let mut planner = Planner::new(settings);
        planner.sync_position(shared.position());

        Self {
            shared,
            producer,
            planner,
            transform: Transform::new(settings),
            settings: *settings,
            overrides,
            state: State::Idle,
            listeners: Listeners::new(),
            resync: false,
        }
    }

    /// Add a state observer
    pub fn register_listener(
        &mut self,
        listener: &'a mut dyn StateListener,
    ) -> Result<(), ListenerError> {
        self.listeners.register(listener)
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn settings(&self) -> &MotionSettings {
        &self.settings
    }

    /// Last fault cause, available even while in Alarm
    pub fn last_fault(&self) -> Option<FaultKind> {
        self.shared.last_fault()
    }

    /// Admit a Cartesian target
    ///
    /// Rejections leave the queue and the planner position untouched.
    pub fn admit(
        &mut self,
        target: &Coords,
        request: MotionRequest,
    ) -> Result<Admission, PlanError> {
        self.check_admission(request.kind)?;
        let steps = self.transform.inverse(target)?;
        self.plan(&steps, request)
    }

    /// Admit an actuator-space target, bypassing kinematics
    ///
    /// Only accepted during homing.
    pub fn admit_actuator(&mut self, target: &Steps, feed: f32) -> Result<Admission, PlanError> {
        self.check_admission(MotionKind::Homing)?;
        self.plan(target, MotionRequest::homing(feed))
    }

    fn plan(&mut self, steps: &Steps, request: MotionRequest) -> Result<Admission, PlanError> {
        let admission = self
            .planner
            .plan(steps, request, self.shared.retired())
            .inspect_err(|_e| {
                #[cfg(feature = "defmt")]
                defmt::debug!("admission rejected: {}", _e);
            })?;

        if admission == Admission::Queued && self.state == State::Idle {
            match request.kind {
                MotionKind::Feed | MotionKind::Rapid => self.fire(Event::CycleStart),
                MotionKind::Jog => self.fire(Event::JogStart),
                MotionKind::Homing => {}
            }
        }
        Ok(admission)
    }

    fn check_admission(&self, kind: MotionKind) -> Result<(), PlanError> {
        let exec = self.shared.exec();
        if self.resync
            || exec.intersects(ExecFlags::FLUSH | ExecFlags::ALARM)
            || self.state.is_alarm()
        {
            return Err(PlanError::PlannerFull);
        }

        let allowed = match kind {
            MotionKind::Feed | MotionKind::Rapid => {
                !matches!(self.state, State::Jog | State::Homing)
            }
            MotionKind::Jog => matches!(self.state, State::Idle | State::Jog),
            MotionKind::Homing => self.state == State::Homing,
        };
        if allowed {
            Ok(())
        } else {
            Err(PlanError::PlannerFull)
        }
    }

    /// Foreground housekeeping
    pub fn poll(&mut self) {
        let exec = self.shared.exec();

        // Fault raised in the tick context (deadline overrun)
        if exec.contains(ExecFlags::ALARM) && !self.state.is_alarm() {
            let fault = self
                .shared
                .last_fault()
                .unwrap_or(FaultKind::TimingDeadlineMissed);
            self.enter_alarm(fault);
        }

        if exec.contains(ExecFlags::FLUSH) {
            return;
        }

        if self.resync && !self.shared.position_sync_pending() {
            self.planner.sync_position(self.shared.position());
            self.resync = false;
        }

        self.planner.hand_off(&mut self.producer);

        if matches!(self.state, State::Run | State::Jog) && self.in_flight() == 0 {
            self.fire(Event::QueueEmpty);
        }
    }

    /// Blocks admitted and not yet finished by the tick
    pub fn in_flight(&self) -> usize {
        self.planner.in_flight(self.shared.retired())
    }

    /// Decelerate to a stop, keeping queued motion
    ///
    /// A jog is not held but cancelled: it stops and its remaining motion
    /// is dropped.
    pub fn hold(&mut self) {
        match self.state {
            State::Run => {
                self.shared.set_exec(ExecFlags::HOLD);
                self.fire(Event::FeedHold);
            }
            State::Jog => {
                self.discard();
                self.fire(Event::FeedHold);
            }
            _ => {}
        }
    }

    /// Continue after a hold; refused while the door is open or in alarm
    pub fn resume(&mut self) {
        if self.state == State::Hold {
            self.shared.clear_exec(ExecFlags::HOLD);
            self.fire(Event::Resume);
        }
    }

    /// Stop jogging and discard queued jog motion
    pub fn jog_cancel(&mut self) {
        if self.state == State::Jog {
            self.discard();
            self.fire(Event::JogCancel);
        }
    }

    /// Stop, discard everything queued and return to Idle
    ///
    /// Also leaves Alarm; the moving mass still decelerates first.
    pub fn reset(&mut self) {
        self.discard();
        self.shared.clear_exec(ExecFlags::ALARM | ExecFlags::DOOR);
        self.fire(Event::Reset);
    }

    /// Leave Alarm after the cause has been cleared
    pub fn unlock(&mut self) {
        if self.state.is_alarm() {
            self.discard();
            self.shared.clear_exec(ExecFlags::ALARM | ExecFlags::DOOR);
            self.fire(Event::Unlock);
        }
    }

    /// Safety door opened
    pub fn door_opened(&mut self) {
        if self.state == State::Homing {
            self.notify_fault(FaultKind::HomingFailed);
            return;
        }
        if self.state == State::Jog {
            self.discard();
        }
        if !self.state.is_alarm() {
            self.shared.set_exec(ExecFlags::DOOR);
            self.fire(Event::DoorOpened);
        }
    }

    /// Safety door closed; motion stays held until resumed
    pub fn door_closed(&mut self) {
        if self.state == State::Door {
            self.shared.set_exec(ExecFlags::HOLD);
            self.shared.clear_exec(ExecFlags::DOOR);
            self.fire(Event::DoorClosed);
        }
    }

    /// Externally detected fault: stop with deceleration and latch Alarm
    pub fn notify_fault(&mut self, fault: FaultKind) {
        self.shared.raise_fault(fault);
        self.enter_alarm(fault);
    }

    /// Begin a homing cycle; only from Idle with nothing queued
    pub fn home_start(&mut self) -> bool {
        if self.state != State::Idle || self.in_flight() != 0 {
            return false;
        }
        self.fire(Event::HomeStart);
        self.state == State::Homing
    }

    /// Switch contact during homing: stop and drop the remaining approach
    pub fn homing_stop(&mut self) {
        if self.state == State::Homing {
            self.discard();
        }
    }

    /// Overwrite the actuator position (homing)
    ///
    /// The tick applies it at its next idle tick; admissions wait until then.
    pub fn set_actuator_position(&mut self, position: Steps) {
        self.shared.request_position_sync(position);
        self.planner.sync_position(position);
        self.resync = true;
    }

    /// Homing finished successfully
    pub fn home_complete(&mut self) {
        if self.state == State::Homing {
            self.fire(Event::HomeComplete);
        }
    }

    /// Homing could not find a switch
    pub fn home_failed(&mut self) {
        self.notify_fault(FaultKind::HomingFailed);
    }

    /// Current override settings
    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    pub fn set_feed_override(&mut self, percent: u8) {
        self.overrides.set_feed(percent);
        self.publish_overrides();
    }

    pub fn adjust_feed_override(&mut self, delta: i16) {
        self.overrides.adjust_feed(delta);
        self.publish_overrides();
    }

    pub fn set_rapid_override(&mut self, level: RapidOverride) {
        self.overrides.rapid = level;
        self.publish_overrides();
    }

    pub fn set_spindle_override(&mut self, percent: u8) {
        self.overrides.set_spindle(percent);
        self.publish_overrides();
    }

    pub fn adjust_spindle_override(&mut self, delta: i16) {
        self.overrides.adjust_spindle(delta);
        self.publish_overrides();
    }

    /// Restore all overrides to 100 %
    pub fn reset_overrides(&mut self) {
        self.overrides.reset();
        self.publish_overrides();
    }

    fn publish_overrides(&mut self) {
        let o = self.overrides;
        self.shared
            .store_overrides(o.feed, o.rapid.percent(), o.spindle);
        self.planner.apply_overrides(o.feed, o.rapid.percent());
    }

    /// Actuator position snapshot
    pub fn actuator_position(&self) -> Steps {
        self.shared.position()
    }

    /// Cartesian position of the actuators
    pub fn position(&self) -> Coords {
        self.transform.forward(&self.shared.position())
    }

    /// Status snapshot
    pub fn status(&self) -> Status {
        let actuator = self.shared.position();
        let queued = self.in_flight();
        Status {
            state: self.state,
            last_fault: self.shared.last_fault(),
            actuator,
            position: self.transform.forward(&actuator),
            step_rate: self.shared.step_rate(),
            feed_override: self.shared.feed_override(),
            rapid_override: self.shared.rapid_override(),
            spindle_override: self.shared.spindle_override(),
            spindle_rpm: self.shared.spindle_rpm(),
            queued,
            available: PLANNER_CAPACITY.saturating_sub(queued),
        }
    }

    /// Replace the settings; only while Idle with nothing queued
    ///
    /// The tick side must be reconfigured with the same settings
    /// ([`Interpolator::configure`](crate::interpolator::Interpolator::configure)).
    pub fn reload_settings(&mut self, settings: &MotionSettings) -> Result<(), ConfigError> {
        if self.state != State::Idle || self.in_flight() != 0 {
            return Err(ConfigError::Busy);
        }
        settings.validate()?;

        self.settings = *settings;
        self.transform = Transform::new(settings);
        self.planner.configure(settings);
        self.overrides.set_limits(settings.overrides);
        self.publish_overrides();
        Ok(())
    }

    /// Decelerate, then drop everything queued or executing
    fn discard(&mut self) {
        self.shared.set_exec(ExecFlags::HOLD | ExecFlags::FLUSH);
        self.planner.clear();
        self.resync = true;
    }

    fn enter_alarm(&mut self, fault: FaultKind) {
        #[cfg(feature = "defmt")]
        defmt::warn!("alarm: {}", fault);
        self.fire(Event::Fault(fault));
        self.listeners.fault(fault);
    }

    fn fire(&mut self, event: Event) {
        let from = self.state;
        let to = from.transition(event);
        if to != from {
            #[cfg(feature = "defmt")]
            defmt::debug!("state {} -> {} on {}", from, to, event);
            self.state = to;
            self.listeners.state_changed(from, to);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AxisSettings;
    use crate::planner::HandoffQueue;
    use crate::AXIS_COUNT;

    fn settings() -> MotionSettings {
        let mut settings = MotionSettings::default();
        settings.axes = [AxisSettings {
            steps_per_unit: 100.0,
            max_feed: 6000.0,
            max_accel: 1000.0,
            max_travel: 100.0,
            backlash_steps: 0,
        }; AXIS_COUNT];
        settings
    }

    #[test]
    fn test_admission_starts_cycle() {
        let shared = MotionShared::new();
        let mut queue = HandoffQueue::new();
        let (producer, _consumer) = queue.split();
        let mut ctx = MotionContext::new(&shared, producer, &settings());

        assert_eq!(
            ctx.admit(&[1.0, 0.0, 0.0, 0.0], MotionRequest::feed(600.0)),
            Ok(Admission::Queued)
        );
        assert_eq!(ctx.state(), State::Run);
        assert_eq!(ctx.in_flight(), 1);
    }

    #[test]
    fn test_zero_length_is_silent() {
        let shared = MotionShared::new();
        let mut queue = HandoffQueue::new();
        let (producer, _consumer) = queue.split();
        let mut ctx = MotionContext::new(&shared, producer, &settings());

        assert_eq!(
            ctx.admit(&[0.0; 4], MotionRequest::feed(600.0)),
            Ok(Admission::Coalesced)
        );
        assert_eq!(ctx.state(), State::Idle);
    }

    #[test]
    fn test_alarm_refuses_admission() {
        let shared = MotionShared::new();
        let mut queue = HandoffQueue::new();
        let (producer, _consumer) = queue.split();
        let mut ctx = MotionContext::new(&shared, producer, &settings());

        ctx.notify_fault(FaultKind::LimitTrip);
        assert_eq!(ctx.state(), State::Alarm(FaultKind::LimitTrip));
        assert_eq!(
            ctx.admit(&[1.0, 0.0, 0.0, 0.0], MotionRequest::feed(600.0)),
            Err(PlanError::PlannerFull)
        );
        assert_eq!(ctx.status().last_fault, Some(FaultKind::LimitTrip));
    }

    #[test]
    fn test_jog_rules() {
        let shared = MotionShared::new();
        let mut queue = HandoffQueue::new();
        let (producer, _consumer) = queue.split();
        let mut ctx = MotionContext::new(&shared, producer, &settings());

        ctx.admit(&[1.0, 0.0, 0.0, 0.0], MotionRequest::jog(600.0))
            .unwrap();
        assert_eq!(ctx.state(), State::Jog);
        // Program motion waits until jogging is over
        assert_eq!(
            ctx.admit(&[2.0, 0.0, 0.0, 0.0], MotionRequest::feed(600.0)),
            Err(PlanError::PlannerFull)
        );
        ctx.admit(&[2.0, 0.0, 0.0, 0.0], MotionRequest::jog(600.0))
            .unwrap();

        ctx.jog_cancel();
        assert_eq!(ctx.state(), State::Idle);
        assert!(shared.exec().contains(ExecFlags::FLUSH));
        // Until the tick has flushed, nothing new is admitted
        assert_eq!(
            ctx.admit(&[1.0, 0.0, 0.0, 0.0], MotionRequest::jog(600.0)),
            Err(PlanError::PlannerFull)
        );
    }

    #[test]
    fn test_hold_cancels_jog() {
        let shared = MotionShared::new();
        let mut queue = HandoffQueue::new();
        let (producer, _consumer) = queue.split();
        let mut ctx = MotionContext::new(&shared, producer, &settings());

        ctx.admit(&[1.0, 0.0, 0.0, 0.0], MotionRequest::jog(600.0))
            .unwrap();
        ctx.hold();
        assert_eq!(ctx.state(), State::Idle);
        assert!(shared.exec().contains(ExecFlags::FLUSH));
        assert_eq!(ctx.planner.queued(), 0);

        // Nothing held, so nothing to resume
        ctx.resume();
        assert_eq!(ctx.state(), State::Idle);
    }

    #[test]
    fn test_door_cancels_jog() {
        let shared = MotionShared::new();
        let mut queue = HandoffQueue::new();
        let (producer, _consumer) = queue.split();
        let mut ctx = MotionContext::new(&shared, producer, &settings());

        ctx.admit(&[1.0, 0.0, 0.0, 0.0], MotionRequest::jog(600.0))
            .unwrap();
        ctx.door_opened();
        assert_eq!(ctx.state(), State::Door);
        assert!(shared.exec().contains(ExecFlags::FLUSH | ExecFlags::DOOR));
        assert_eq!(ctx.planner.queued(), 0);
    }

    #[test]
    fn test_out_of_reach_with_soft_limits() {
        let shared = MotionShared::new();
        let mut queue = HandoffQueue::new();
        let (producer, _consumer) = queue.split();
        let mut s = settings();
        s.soft_limits = true;
        let mut ctx = MotionContext::new(&shared, producer, &s);

        assert_eq!(
            ctx.admit(&[150.0, 0.0, 0.0, 0.0], MotionRequest::rapid()),
            Err(PlanError::OutOfReach)
        );
        assert_eq!(ctx.in_flight(), 0);
        assert_eq!(ctx.state(), State::Idle);
    }

    #[test]
    fn test_overrides_are_clamped_and_shared() {
        let shared = MotionShared::new();
        let mut queue = HandoffQueue::new();
        let (producer, _consumer) = queue.split();
        let mut ctx = MotionContext::new(&shared, producer, &settings());

        ctx.set_feed_override(250);
        ctx.adjust_spindle_override(-10);
        ctx.set_rapid_override(RapidOverride::Half);
        assert_eq!(shared.feed_override(), 200);
        assert_eq!(shared.spindle_override(), 90);
        assert_eq!(shared.rapid_override(), 50);

        ctx.reset_overrides();
        let status = ctx.status();
        assert_eq!(
            (status.feed_override, status.rapid_override, status.spindle_override),
            (100, 100, 100)
        );
    }

    #[test]
    fn test_reload_only_when_idle() {
        let shared = MotionShared::new();
        let mut queue = HandoffQueue::new();
        let (producer, _consumer) = queue.split();
        let mut ctx = MotionContext::new(&shared, producer, &settings());

        let mut s = settings();
        s.junction_deviation = 0.05;
        assert_eq!(ctx.reload_settings(&s), Ok(()));
        assert_eq!(ctx.settings().junction_deviation, 0.05);

        s.junction_deviation = 0.0;
        assert_eq!(ctx.reload_settings(&s), Err(ConfigError::InvalidJunction));

        ctx.admit(&[1.0, 0.0, 0.0, 0.0], MotionRequest::feed(600.0))
            .unwrap();
        assert_eq!(ctx.reload_settings(&settings()), Err(ConfigError::Busy));
    }

    #[test]
    fn test_door_blocks_resume() {
        let shared = MotionShared::new();
        let mut queue = HandoffQueue::new();
        let (producer, _consumer) = queue.split();
        let mut ctx = MotionContext::new(&shared, producer, &settings());

        ctx.admit(&[1.0, 0.0, 0.0, 0.0], MotionRequest::feed(600.0))
            .unwrap();
        ctx.door_opened();
        assert_eq!(ctx.state(), State::Door);
        ctx.resume();
        assert_eq!(ctx.state(), State::Door);
        assert!(shared.exec().contains(ExecFlags::DOOR));

        ctx.door_closed();
        assert_eq!(ctx.state(), State::Hold);
        assert_eq!(shared.exec(), ExecFlags::HOLD);

        ctx.resume();
        assert_eq!(ctx.state(), State::Run);
        assert!(shared.exec().is_empty());
    }
}
