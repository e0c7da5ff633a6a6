//! State shared between the foreground and the step tick
//!
//! Single-writer rules:
//! - `exec` flags: written by the foreground (HOLD, FLUSH, DOOR, ALARM) and
//!   by the tick (clears FLUSH and HOLD once a flush is done; ALARM on overrun)
//! - `status`, `retired`, `position`, `step_rate`, `spindle_rpm`: tick only
//! - overrides and the position sync request: foreground only
//!
//! Every field is a single atomic word except the position, which is read
//! and written as a whole under a critical section so readers never see a
//! mix of old and new axis values.

use core::cell::Cell;

use bitflags::bitflags;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use portable_atomic::{AtomicU32, AtomicU8, Ordering};

use super::machine::FaultKind;
use crate::axis::Steps;

bitflags! {
    /// Requests from the foreground to the step tick
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ExecFlags: u8 {
        /// Decelerate to a stop and pause
        const HOLD = 1 << 0;
        /// Decelerate to a stop; never resume until cleared by unlock
        const ALARM = 1 << 1;
        /// Once stopped, discard the current and queued blocks
        const FLUSH = 1 << 2;
        /// Safety door open, treated like HOLD
        const DOOR = 1 << 3;
    }
}

impl ExecFlags {
    /// Any flag that stops motion
    pub const STOPPING: Self = Self::HOLD.union(Self::ALARM).union(Self::DOOR);
}

bitflags! {
    /// Interpolator status published by the tick
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StepperStatus: u8 {
        /// No block loaded
        const IDLE = 1 << 0;
        /// Block loaded but paused by a stop request
        const STOPPED = 1 << 1;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ExecFlags {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "ExecFlags({=u8:04b})", self.bits())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for StepperStatus {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "StepperStatus({=u8:02b})", self.bits())
    }
}

/// Cross-context motion state, usually placed in a `static`
pub struct MotionShared {
    exec: AtomicU8,
    status: AtomicU8,
    retired: AtomicU32,
    fault: AtomicU8,
    feed_override: AtomicU8,
    rapid_override: AtomicU8,
    spindle_override: AtomicU8,
    step_rate: AtomicU32,
    spindle_rpm: AtomicU32,
    position: Mutex<CriticalSectionRawMutex, Cell<Steps>>,
    position_sync: Mutex<CriticalSectionRawMutex, Cell<Option<Steps>>>,
}

impl Default for MotionShared {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionShared {
    /// Create the shared block with 100 % overrides at the origin
    pub const fn new() -> Self {
        Self {
            exec: AtomicU8::new(0),
            status: AtomicU8::new(StepperStatus::IDLE.bits()),
            retired: AtomicU32::new(0),
            fault: AtomicU8::new(0),
            feed_override: AtomicU8::new(100),
            rapid_override: AtomicU8::new(100),
            spindle_override: AtomicU8::new(100),
            step_rate: AtomicU32::new(0),
            spindle_rpm: AtomicU32::new(0),
            position: Mutex::new(Cell::new([0; crate::axis::AXIS_COUNT])),
            position_sync: Mutex::new(Cell::new(None)),
        }
    }

    /// Current exec flags
    pub fn exec(&self) -> ExecFlags {
        ExecFlags::from_bits_truncate(self.exec.load(Ordering::Acquire))
    }

    /// Set flags
    pub fn set_exec(&self, flags: ExecFlags) {
        self.exec.fetch_or(flags.bits(), Ordering::AcqRel);
    }

    /// Clear flags
    pub fn clear_exec(&self, flags: ExecFlags) {
        self.exec.fetch_and(!flags.bits(), Ordering::AcqRel);
    }

    /// Latch a fault cause and request the alarm stop
    pub fn raise_fault(&self, kind: FaultKind) {
        self.fault.store(kind.code(), Ordering::Release);
        self.set_exec(ExecFlags::ALARM);
    }

    /// Last fault cause, kept after unlock for reporting
    pub fn last_fault(&self) -> Option<FaultKind> {
        FaultKind::from_code(self.fault.load(Ordering::Acquire))
    }

    /// Interpolator status
    pub fn status(&self) -> StepperStatus {
        StepperStatus::from_bits_truncate(self.status.load(Ordering::Acquire))
    }

    pub(crate) fn set_status(&self, status: StepperStatus) {
        self.status.store(status.bits(), Ordering::Release);
    }

    /// Total blocks retired (completed or flushed) by the tick, wrapping
    pub fn retired(&self) -> u32 {
        self.retired.load(Ordering::Acquire)
    }

    pub(crate) fn retire(&self, count: u32) {
        self.retired.fetch_add(count, Ordering::AcqRel);
    }

    /// Consistent snapshot of the actuator position
    pub fn position(&self) -> Steps {
        self.position.lock(|p| p.get())
    }

    pub(crate) fn publish_position(&self, position: Steps) {
        self.position.lock(|p| p.set(position));
    }

    /// Ask the tick to overwrite the actuator position when no block is loaded
    pub fn request_position_sync(&self, position: Steps) {
        self.position_sync.lock(|s| s.set(Some(position)));
    }

    /// Check whether a position sync is still waiting for the tick
    pub fn position_sync_pending(&self) -> bool {
        self.position_sync.lock(|s| s.get().is_some())
    }

    pub(crate) fn take_position_sync(&self) -> Option<Steps> {
        self.position_sync.lock(|s| s.take())
    }

    /// Feed override in percent
    pub fn feed_override(&self) -> u8 {
        self.feed_override.load(Ordering::Relaxed)
    }

    /// Rapid override in percent
    pub fn rapid_override(&self) -> u8 {
        self.rapid_override.load(Ordering::Relaxed)
    }

    /// Spindle override in percent
    pub fn spindle_override(&self) -> u8 {
        self.spindle_override.load(Ordering::Relaxed)
    }

    pub(crate) fn store_overrides(&self, feed: u8, rapid: u8, spindle: u8) {
        self.feed_override.store(feed, Ordering::Relaxed);
        self.rapid_override.store(rapid, Ordering::Relaxed);
        self.spindle_override.store(spindle, Ordering::Relaxed);
    }

    /// Step rate of the executing block in steps/s of its dominant axis
    pub fn step_rate(&self) -> u32 {
        self.step_rate.load(Ordering::Relaxed)
    }

    pub(crate) fn set_step_rate(&self, rate: u32) {
        self.step_rate.store(rate, Ordering::Relaxed);
    }

    /// Override-scaled spindle speed of the executing block
    pub fn spindle_rpm(&self) -> u32 {
        self.spindle_rpm.load(Ordering::Relaxed)
    }

    pub(crate) fn set_spindle_rpm(&self, rpm: u32) {
        self.spindle_rpm.store(rpm, Ordering::Relaxed);
    }
}
