//! Look-ahead motion planner
//!
//! Owns the bounded lookahead of not-yet-executing blocks. Every admission
//! appends a block and re-plans entry speeds:
//!
//! - backward from the tail (which must be able to stop) toward the last
//!   block whose entry can no longer change, capping each entry by what
//!   deceleration into the following block allows
//! - forward from that block, capping each entry by what acceleration out
//!   of the previous block allows
//!
//! Speeds are path speeds in actuator units per second. The front block of
//! the lookahead always has a fixed entry: either rest, or the exit speed
//! of the block handed to the interpolator before it.
//!
//! Capacity counts every block not yet retired by the interpolator, so a
//! full planner stays full until the tick context finishes a block.

pub mod block;
pub mod junction;
pub mod overrides;
pub mod profile;

pub use block::{Block, MotionKind, Segment};
pub use overrides::{Overrides, RapidOverride};
pub use profile::{ProfileKind, Ramp, SCurve, SpeedProfile, Trapezoidal};

use heapless::spsc;
use heapless::Deque;

use crate::axis::{AxisMask, Coords, Steps, AXIS_COUNT};
use crate::config::MotionSettings;
use crate::kinematics::{Backlash, KinematicsError};

/// Blocks admitted but not yet retired, including those handed off
pub const PLANNER_CAPACITY: usize = 16;

/// Storage slots of the handoff queue (one less usable)
///
/// Segments buffered here carry the tick across foreground stalls shorter
/// than their combined duration.
pub const HANDOFF_SLOTS: usize = 4;

/// Lock-free single-producer/single-consumer handoff to the tick context
pub type HandoffQueue = spsc::Queue<Segment, HANDOFF_SLOTS>;
pub type HandoffProducer<'a> = spsc::Producer<'a, Segment, HANDOFF_SLOTS>;
pub type HandoffConsumer<'a> = spsc::Consumer<'a, Segment, HANDOFF_SLOTS>;

/// Admission errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlanError {
    /// Target is unreachable; do not retry unmodified
    OutOfReach,
    /// No free slot (or admissions refused); retry after the queue drains
    PlannerFull,
    /// Zero or invalid feed with non-zero motion
    InvalidFeed,
}

impl From<KinematicsError> for PlanError {
    fn from(e: KinematicsError) -> Self {
        match e {
            KinematicsError::OutOfReach => PlanError::OutOfReach,
        }
    }
}

/// Successful admission outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Admission {
    /// Block appended to the queue
    Queued,
    /// Zero-length motion, nothing queued
    Coalesced,
}

/// Motion parameters of one admission
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotionRequest {
    pub kind: MotionKind,
    /// Feed rate in units/min; ignored for rapids
    pub feed: f32,
    /// Spindle speed in rpm
    pub spindle: f32,
}

impl MotionRequest {
    pub const fn rapid() -> Self {
        Self {
            kind: MotionKind::Rapid,
            feed: 0.0,
            spindle: 0.0,
        }
    }

    pub const fn feed(feed: f32) -> Self {
        Self {
            kind: MotionKind::Feed,
            feed,
            spindle: 0.0,
        }
    }

    pub const fn jog(feed: f32) -> Self {
        Self {
            kind: MotionKind::Jog,
            feed,
            spindle: 0.0,
        }
    }

    pub const fn homing(feed: f32) -> Self {
        Self {
            kind: MotionKind::Homing,
            feed,
            spindle: 0.0,
        }
    }

    pub const fn with_spindle(mut self, rpm: f32) -> Self {
        self.spindle = rpm;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct AxisLimits {
    steps_per_unit: f32,
    /// units/s
    max_speed: f32,
    /// units/s²
    max_accel: f32,
}

/// The look-ahead planner
pub struct Planner {
    lookahead: Deque<Block, PLANNER_CAPACITY>,
    /// Target of the last admitted block
    position: Steps,
    /// Segments handed to the interpolator, wrapping
    handed_off: u32,
    axes: [AxisLimits; AXIS_COUNT],
    junction_deviation: f32,
    profile: ProfileKind,
    backlash: Backlash,
    feed_override: u8,
    rapid_override: u8,
}

impl Planner {
    pub fn new(settings: &MotionSettings) -> Self {
        let mut planner = Self {
            lookahead: Deque::new(),
            position: [0; AXIS_COUNT],
            handed_off: 0,
            axes: [AxisLimits {
                steps_per_unit: 1.0,
                max_speed: 1.0,
                max_accel: 1.0,
            }; AXIS_COUNT],
            junction_deviation: settings.junction_deviation,
            profile: settings.profile,
            backlash: Backlash::new(settings),
            feed_override: 100,
            rapid_override: 100,
        };
        planner.configure(settings);
        planner
    }

    /// Take new settings; only meaningful while nothing is queued
    pub fn configure(&mut self, settings: &MotionSettings) {
        for (limits, axis) in self.axes.iter_mut().zip(settings.axes.iter()) {
            *limits = AxisLimits {
                steps_per_unit: axis.steps_per_unit,
                max_speed: axis.max_feed / 60.0,
                max_accel: axis.max_accel,
            };
        }
        self.junction_deviation = settings.junction_deviation;
        self.profile = settings.profile;
        self.backlash = Backlash::new(settings);
    }

    /// Target position of the last admitted block
    pub fn position(&self) -> Steps {
        self.position
    }

    /// Restart planning from `position` (after a flush or homing)
    pub fn sync_position(&mut self, position: Steps) {
        self.position = position;
    }

    /// Blocks waiting in the lookahead, front first
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.lookahead.iter()
    }

    /// Number of blocks in the lookahead
    pub fn queued(&self) -> usize {
        self.lookahead.len()
    }

    /// Blocks admitted and not yet retired
    pub fn in_flight(&self, retired: u32) -> usize {
        self.lookahead.len() + self.handed_off.wrapping_sub(retired) as usize
    }

    /// Check whether another block can be admitted
    pub fn is_full(&self, retired: u32) -> bool {
        self.in_flight(retired) >= PLANNER_CAPACITY
    }

    /// Drop every block not yet handed off
    pub fn clear(&mut self) {
        self.lookahead.clear();
    }

    /// Admit a move to `target` (actuator steps)
    ///
    /// `retired` is the interpolator's retired-block counter.
    pub fn plan(
        &mut self,
        target: &Steps,
        request: MotionRequest,
        retired: u32,
    ) -> Result<Admission, PlanError> {
        let mut delta = [0i32; AXIS_COUNT];
        for i in 0..AXIS_COUNT {
            delta[i] = target[i].wrapping_sub(self.position[i]);
        }
        if delta.iter().all(|d| *d == 0) {
            return Ok(Admission::Coalesced);
        }

        if request.kind != MotionKind::Rapid && !(request.feed.is_finite() && request.feed > 0.0)
        {
            return Err(PlanError::InvalidFeed);
        }

        let mut backlash = self.backlash;
        let compensation = backlash.compensate(&delta);
        let needed = if compensation.is_some() { 2 } else { 1 };
        if self.in_flight(retired) + needed > PLANNER_CAPACITY {
            return Err(PlanError::PlannerFull);
        }

        if let Some(comp) = compensation {
            let block = self.build_block(&comp, &request, true);
            self.push(block)?;
        }
        let block = self.build_block(&delta, &request, false);
        self.push(block)?;

        self.backlash = backlash;
        self.position = *target;
        self.recalculate(false);
        Ok(Admission::Queued)
    }

    /// Apply new feed and rapid override percentages to queued blocks
    pub fn apply_overrides(&mut self, feed: u8, rapid: u8) {
        if feed == self.feed_override && rapid == self.rapid_override {
            return;
        }
        self.feed_override = feed;
        self.rapid_override = rapid;

        // The front entry is fixed. Blocks after it must still be able to
        // shed that speed, so they keep at least the speed a full
        // deceleration from it leaves.
        let mut floor_sq = 0.0f32;
        let mut prev_nominal = 0.0f32;
        let mut front = true;

        let (feed, rapid) = (self.feed_override, self.rapid_override);
        for block in self.lookahead.iter_mut() {
            let mut nominal = scaled_nominal(block, feed, rapid);

            if front {
                nominal = nominal.max(block.entry_speed);
                floor_sq = block.entry_speed * block.entry_speed;
                front = false;
            } else {
                let floor = libm::sqrtf(floor_sq.max(0.0));
                nominal = nominal.max(floor);
                block.max_entry_speed = block
                    .max_junction_speed
                    .min(nominal)
                    .min(prev_nominal)
                    .max(floor);
                floor_sq = floor * floor;
            }

            block.nominal_speed = nominal;
            floor_sq -= 2.0 * block.acceleration * block.distance;
            prev_nominal = nominal;
        }

        self.recalculate(true);
    }

    /// Move planned blocks into the handoff queue while it has room
    ///
    /// A block is frozen with its successor's entry as exit speed. The tail
    /// has no successor yet and would be frozen to stop, so it is held back
    /// until the queue has run dry.
    ///
    /// Returns the number of blocks handed off.
    pub fn hand_off(&mut self, producer: &mut HandoffProducer<'_>) -> usize {
        let mut count = 0;
        while producer.ready() {
            let Some(front) = self.lookahead.front() else {
                break;
            };
            let next = self.lookahead.iter().nth(1);
            if next.is_none() && producer.len() > 0 {
                break;
            }
            let exit = next.map_or(0.0, |next| next.entry_speed);

            let segment = front.segment(self.profile, exit);
            if producer.enqueue(segment).is_err() {
                break;
            }

            self.lookahead.pop_front();
            self.handed_off = self.handed_off.wrapping_add(1);
            count += 1;
        }
        count
    }

    fn push(&mut self, block: Block) -> Result<(), PlanError> {
        self.lookahead
            .push_back(block)
            .map_err(|_| PlanError::PlannerFull)
    }

    fn build_block(&self, delta: &Steps, request: &MotionRequest, compensation: bool) -> Block {
        let mut steps = [0u32; AXIS_COUNT];
        let mut travel: Coords = [0.0; AXIS_COUNT];
        for i in 0..AXIS_COUNT {
            steps[i] = delta[i].unsigned_abs();
            travel[i] = delta[i] as f32 / self.axes[i].steps_per_unit;
        }
        let step_event_count = steps.iter().copied().max().unwrap_or(0);

        let distance = libm::sqrtf(travel.iter().map(|t| t * t).sum());
        let mut unit = [0.0; AXIS_COUNT];
        let mut speed_limit = f32::INFINITY;
        let mut accel_limit = f32::INFINITY;
        for i in 0..AXIS_COUNT {
            unit[i] = travel[i] / distance;
            let share = libm::fabsf(unit[i]);
            if share > 0.0 {
                speed_limit = speed_limit.min(self.axes[i].max_speed / share);
                accel_limit = accel_limit.min(self.axes[i].max_accel / share);
            }
        }

        let programmed_speed = if compensation || request.kind == MotionKind::Rapid {
            speed_limit
        } else {
            (request.feed / 60.0).min(speed_limit)
        };
        let acceleration = self.profile.planning_acceleration(accel_limit);

        let (max_junction_speed, prev_nominal) = match self.lookahead.back() {
            Some(prev) => (
                junction::junction_speed(&prev.unit, &unit, acceleration, self.junction_deviation),
                prev.nominal_speed,
            ),
            // Nothing queued: whatever was handed off stops at its end
            None => (0.0, 0.0),
        };

        let mut block = Block {
            kind: request.kind,
            compensation,
            steps,
            directions: AxisMask::negative_of(delta),
            step_event_count,
            distance,
            unit,
            programmed_speed,
            speed_limit,
            nominal_speed: 0.0,
            max_junction_speed,
            max_entry_speed: 0.0,
            entry_speed: 0.0,
            acceleration,
            spindle: request.spindle,
            nominal_locked: false,
        };
        block.nominal_speed = scaled_nominal(&block, self.feed_override, self.rapid_override);
        block.max_entry_speed = max_junction_speed
            .min(block.nominal_speed)
            .min(prev_nominal);
        block
    }

    /// Re-plan entry speeds from the tail back to the nearest locked
    /// block, then forward from it
    ///
    /// A block is locked once its entry can no longer rise: it sits at its
    /// ceiling, or it is capped by acceleration out of a final predecessor.
    /// The front block's entry is always fixed. With `full` every lock is
    /// ignored and recomputed.
    fn recalculate(&mut self, full: bool) {
        let len = self.lookahead.len();
        if len == 0 {
            return;
        }

        // Backward: the tail must be able to stop
        let mut start = 0;
        let mut next_entry = 0.0f32;
        let mut idx = len;
        for block in self.lookahead.iter_mut().rev() {
            idx -= 1;
            if idx == 0 || (!full && block.nominal_locked) {
                start = idx;
                break;
            }

            let reachable =
                libm::sqrtf(next_entry * next_entry + 2.0 * block.acceleration * block.distance);
            block.entry_speed = block.max_entry_speed.min(reachable);
            next_entry = block.entry_speed;
        }

        // Forward: entries reachable by accelerating out of the previous block
        let mut prev: Option<(f32, f32, f32)> = None;
        for block in self.lookahead.iter_mut().skip(start) {
            if let Some((entry, accel, distance)) = prev {
                let gain = 2.0 * accel * distance;
                let mut capped = false;

                if entry < block.entry_speed {
                    let reachable = libm::sqrtf(entry * entry + gain);
                    if reachable < block.entry_speed {
                        block.entry_speed = reachable;
                        capped = true;
                    }
                }

                // A fixed fast entry must still be able to slow down in time
                let floor_sq = entry * entry - gain;
                if floor_sq > block.entry_speed * block.entry_speed {
                    block.entry_speed = libm::sqrtf(floor_sq);
                }

                block.nominal_locked = capped || block.entry_speed >= block.max_entry_speed;
            }
            prev = Some((block.entry_speed, block.acceleration, block.distance));
        }
    }
}

fn scaled_nominal(block: &Block, feed: u8, rapid: u8) -> f32 {
    let percent = if block.compensation {
        100
    } else {
        match block.kind {
            MotionKind::Feed => feed,
            MotionKind::Rapid => rapid,
            MotionKind::Jog | MotionKind::Homing => 100,
        }
    };
    (block.programmed_speed * percent as f32 / 100.0).min(block.speed_limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AxisSettings;

    /// 100 steps/unit, 1000 units/s², fast feeds on every axis
    fn settings() -> MotionSettings {
        let mut settings = MotionSettings::default();
        settings.axes = [AxisSettings {
            steps_per_unit: 100.0,
            max_feed: 60_000.0,
            max_accel: 1000.0,
            max_travel: 1000.0,
            backlash_steps: 0,
        }; AXIS_COUNT];
        settings
    }

    fn entries(planner: &Planner) -> heapless::Vec<f32, PLANNER_CAPACITY> {
        planner.blocks().map(|b| b.entry_speed).collect()
    }

    fn close(a: f32, b: f32) -> bool {
        libm::fabsf(a - b) < 1e-3
    }

    #[test]
    fn test_zero_length_is_coalesced() {
        let mut planner = Planner::new(&settings());
        assert_eq!(
            planner.plan(&[0; 4], MotionRequest::feed(600.0), 0),
            Ok(Admission::Coalesced)
        );
        assert_eq!(planner.queued(), 0);
    }

    #[test]
    fn test_zero_feed_is_invalid() {
        let mut planner = Planner::new(&settings());
        assert_eq!(
            planner.plan(&[100, 0, 0, 0], MotionRequest::feed(0.0), 0),
            Err(PlanError::InvalidFeed)
        );
        assert_eq!(
            planner.plan(&[100, 0, 0, 0], MotionRequest::feed(f32::NAN), 0),
            Err(PlanError::InvalidFeed)
        );
        // Rapids ignore the feed value
        assert_eq!(
            planner.plan(&[100, 0, 0, 0], MotionRequest::rapid(), 0),
            Ok(Admission::Queued)
        );
    }

    #[test]
    fn test_block_geometry() {
        let mut planner = Planner::new(&settings());
        planner
            .plan(&[300, -400, 0, 0], MotionRequest::feed(600.0), 0)
            .unwrap();

        let block = planner.blocks().next().unwrap();
        assert_eq!(block.steps, [300, 400, 0, 0]);
        assert_eq!(block.directions, AxisMask::Y);
        assert_eq!(block.step_event_count, 400);
        assert!(close(block.distance, 5.0));
        assert!(close(block.unit[0], 0.6));
        assert!(close(block.unit[1], -0.8));
        assert!(close(block.nominal_speed, 10.0));
        // First block starts from rest
        assert_eq!(block.entry_speed, 0.0);
        assert_eq!(planner.position(), [300, -400, 0, 0]);
    }

    #[test]
    fn test_feed_limited_by_axis_speed() {
        let mut s = settings();
        s.axes[0].max_feed = 600.0; // 10 units/s
        let mut planner = Planner::new(&s);
        planner
            .plan(&[1000, 0, 0, 0], MotionRequest::feed(6000.0), 0)
            .unwrap();
        assert!(close(planner.blocks().next().unwrap().nominal_speed, 10.0));

        planner
            .plan(&[2000, 0, 0, 0], MotionRequest::rapid(), 0)
            .unwrap();
        assert!(close(planner.blocks().nth(1).unwrap().nominal_speed, 10.0));
    }

    #[test]
    fn test_three_block_scenario() {
        let mut planner = Planner::new(&settings());
        // 10 units each along X at 100, 50, 100 units/s
        planner
            .plan(&[1000, 0, 0, 0], MotionRequest::feed(6000.0), 0)
            .unwrap();
        planner
            .plan(&[2000, 0, 0, 0], MotionRequest::feed(3000.0), 0)
            .unwrap();
        planner
            .plan(&[3000, 0, 0, 0], MotionRequest::feed(6000.0), 0)
            .unwrap();

        let e = entries(&planner);
        assert_eq!(e[0], 0.0);
        // Collinear junctions are capped by the slower nominal speed
        assert!(close(e[1], 50.0));
        assert!(close(e[2], 50.0));
    }

    #[test]
    fn test_locked_blocks_bound_the_backward_pass() {
        let mut planner = Planner::new(&settings());
        // 10 units at 50 units/s: every block reaches cruise on its own
        for i in 1..=8 {
            planner
                .plan(&[i * 1000, 0, 0, 0], MotionRequest::feed(3000.0), 0)
                .unwrap();
        }
        let locked: heapless::Vec<bool, PLANNER_CAPACITY> =
            planner.blocks().map(|b| b.nominal_locked).collect();
        assert!(locked[1..].iter().all(|l| *l));

        // A locked block in the middle is never visited again
        planner.lookahead.iter_mut().nth(3).unwrap().entry_speed = 1.0;
        planner
            .plan(&[9000, 0, 0, 0], MotionRequest::feed(3000.0), 0)
            .unwrap();
        let e = entries(&planner);
        assert_eq!(e[3], 1.0);
        assert!(close(e[8], 50.0));
        assert!(planner.blocks().nth(8).unwrap().nominal_locked);

        // A full re-plan ignores the locks
        planner.apply_overrides(50, 100);
        let e = entries(&planner);
        assert!(close(e[3], 25.0));
    }

    #[test]
    fn test_tail_must_be_able_to_stop() {
        let mut planner = Planner::new(&settings());
        // Two short blocks: 1 unit each at 100 units/s
        planner
            .plan(&[100, 0, 0, 0], MotionRequest::feed(6000.0), 0)
            .unwrap();
        planner
            .plan(&[200, 0, 0, 0], MotionRequest::feed(6000.0), 0)
            .unwrap();

        let e = entries(&planner);
        // sqrt(2 * 1000 * 1): stop within the last block
        assert!(close(e[1], libm::sqrtf(2000.0)));

        // Appending raises the previous tail's exit
        planner
            .plan(&[300, 0, 0, 0], MotionRequest::feed(6000.0), 0)
            .unwrap();
        let e = entries(&planner);
        assert!(e[1] > libm::sqrtf(2000.0) - 1e-3);
        assert!(close(e[2], libm::sqrtf(2000.0)));
    }

    #[test]
    fn test_forward_pass_limits_acceleration() {
        let mut planner = Planner::new(&settings());
        for i in 1..=4 {
            planner
                .plan(&[i * 100, 0, 0, 0], MotionRequest::feed(6000.0), 0)
                .unwrap();
        }
        let e = entries(&planner);
        let blocks: heapless::Vec<Block, PLANNER_CAPACITY> = planner.blocks().copied().collect();
        for i in 1..e.len() {
            let gain = 2.0 * blocks[i - 1].acceleration * blocks[i - 1].distance;
            assert!(e[i] * e[i] <= e[i - 1] * e[i - 1] + gain + 1e-2);
            assert!(e[i] <= blocks[i].max_entry_speed + 1e-6);
        }
    }

    #[test]
    fn test_reversal_forces_stop() {
        let mut planner = Planner::new(&settings());
        planner
            .plan(&[1000, 0, 0, 0], MotionRequest::feed(6000.0), 0)
            .unwrap();
        planner
            .plan(&[0, 0, 0, 0], MotionRequest::feed(6000.0), 0)
            .unwrap();
        let block = planner.blocks().nth(1).unwrap();
        assert_eq!(block.max_junction_speed, 0.0);
        assert_eq!(block.entry_speed, 0.0);
    }

    #[test]
    fn test_full_queue_rejects_and_stays_unchanged() {
        let mut planner = Planner::new(&settings());
        for i in 1..=PLANNER_CAPACITY as i32 {
            planner
                .plan(&[i * 10, 0, 0, 0], MotionRequest::feed(600.0), 0)
                .unwrap();
        }
        assert!(planner.is_full(0));

        let before = entries(&planner);
        assert_eq!(
            planner.plan(&[1_000_000, 0, 0, 0], MotionRequest::feed(600.0), 0),
            Err(PlanError::PlannerFull)
        );
        assert_eq!(entries(&planner), before);
        assert_eq!(planner.position(), [PLANNER_CAPACITY as i32 * 10, 0, 0, 0]);
    }

    #[test]
    fn test_handoff_counts_until_retired() {
        let mut planner = Planner::new(&settings());
        let mut queue = HandoffQueue::new();
        let (mut producer, mut consumer) = queue.split();

        for i in 1..=3 {
            planner
                .plan(&[i * 1000, 0, 0, 0], MotionRequest::feed(6000.0), 0)
                .unwrap();
        }
        // The tail waits while segments are still buffered
        assert_eq!(planner.hand_off(&mut producer), 2);
        assert_eq!(planner.queued(), 1);
        assert_eq!(planner.in_flight(0), 3);

        let segment = consumer.dequeue().unwrap();
        assert_eq!(segment.ramp.entry_rate, 0);
        assert_eq!(segment.ramp.exit_rate, 10_000);
        // Handed off but not retired: still counted
        assert_eq!(planner.in_flight(0), 3);
        assert_eq!(planner.in_flight(1), 2);

        // The new front keeps its entry even when more blocks arrive
        let front_entry = planner.blocks().next().unwrap().entry_speed;
        planner
            .plan(&[4000, 0, 0, 0], MotionRequest::feed(6000.0), 1)
            .unwrap();
        assert_eq!(planner.blocks().next().unwrap().entry_speed, front_entry);
    }

    #[test]
    fn test_feed_override_rescales_queued_blocks() {
        let mut planner = Planner::new(&settings());
        for i in 1..=3 {
            planner
                .plan(&[i * 1000, 0, 0, 0], MotionRequest::feed(3000.0), 0)
                .unwrap();
        }
        planner
            .plan(&[4000, 0, 0, 0], MotionRequest::rapid(), 0)
            .unwrap();

        planner.apply_overrides(50, 100);
        let nominal: heapless::Vec<f32, PLANNER_CAPACITY> =
            planner.blocks().map(|b| b.nominal_speed).collect();
        assert!(close(nominal[1], 25.0));
        assert!(close(nominal[2], 25.0));
        // Rapid untouched by the feed override
        assert!(close(nominal[3], 1000.0));

        let e = entries(&planner);
        assert!(e[1] <= 25.0 + 1e-3);
        assert!(e[2] <= 25.0 + 1e-3);

        planner.apply_overrides(50, 25);
        let rapid = planner.blocks().nth(3).unwrap();
        assert!(close(rapid.nominal_speed, 250.0));
    }

    #[test]
    fn test_jog_is_never_overridden() {
        let mut planner = Planner::new(&settings());
        planner.apply_overrides(10, 25);
        planner
            .plan(&[1000, 0, 0, 0], MotionRequest::jog(600.0), 0)
            .unwrap();
        assert!(close(planner.blocks().next().unwrap().nominal_speed, 10.0));
    }

    #[test]
    fn test_backlash_queues_compensation_block() {
        let mut s = settings();
        s.axes[0].backlash_steps = 7;
        let mut planner = Planner::new(&s);

        planner
            .plan(&[1000, 0, 0, 0], MotionRequest::feed(600.0), 0)
            .unwrap();
        planner
            .plan(&[500, 0, 0, 0], MotionRequest::feed(600.0), 0)
            .unwrap();

        assert_eq!(planner.queued(), 3);
        let comp = planner.blocks().nth(1).unwrap();
        assert!(comp.compensation);
        assert_eq!(comp.steps, [7, 0, 0, 0]);
        assert_eq!(comp.directions, AxisMask::X);
        // Position tracks the programmed target only
        assert_eq!(planner.position(), [500, 0, 0, 0]);
    }

    #[test]
    fn test_backlash_needs_two_slots() {
        let mut s = settings();
        s.axes[0].backlash_steps = 7;
        let mut planner = Planner::new(&s);
        for i in 1..PLANNER_CAPACITY as i32 {
            planner
                .plan(&[i * 10, 0, 0, 0], MotionRequest::feed(600.0), 0)
                .unwrap();
        }
        // One slot left, but a reversal needs two
        assert_eq!(
            planner.plan(&[0, 0, 0, 0], MotionRequest::feed(600.0), 0),
            Err(PlanError::PlannerFull)
        );
        // Direction memory untouched by the rejected admission
        assert_eq!(
            planner.plan(&[1000, 0, 0, 0], MotionRequest::feed(600.0), 0),
            Ok(Admission::Queued)
        );
    }
}
