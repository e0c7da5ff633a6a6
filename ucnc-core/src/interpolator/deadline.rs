//! Step tick deadline monitor
//!
//! The tick handler must finish before its next scheduled firing. The
//! board hands the instant a tick was due and the instant its handler
//! finished to [`DeadlineMonitor::check_tick`], so a late wake-up counts
//! as much as a slow handler. An overrun is fatal and latches
//! [`FaultKind::TimingDeadlineMissed`].

use crate::state::{FaultKind, MotionShared};

/// Tracks tick handler durations against their budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeadlineMonitor {
    overruns: u32,
    worst: u32,
}

impl DeadlineMonitor {
    pub const fn new() -> Self {
        Self {
            overruns: 0,
            worst: 0,
        }
    }

    /// Compare one handler run against its budget (same time unit)
    ///
    /// Returns `false` and raises the timing fault when `elapsed` exceeds
    /// `budget`.
    pub fn check(&mut self, elapsed: u32, budget: u32, shared: &MotionShared) -> bool {
        self.worst = self.worst.max(elapsed);
        if elapsed > budget {
            self.overruns = self.overruns.saturating_add(1);
            shared.raise_fault(FaultKind::TimingDeadlineMissed);
            return false;
        }
        true
    }

    /// Check one tick from the instant it was due (timer ticks)
    ///
    /// `budget` is the period to the next scheduled tick.
    pub fn check_tick(
        &mut self,
        due: u64,
        finished: u64,
        budget: u32,
        shared: &MotionShared,
    ) -> bool {
        let late = finished.saturating_sub(due).min(u32::MAX as u64) as u32;
        self.check(late, budget, shared)
    }

    /// Number of overruns seen
    pub fn overruns(&self) -> u32 {
        self.overruns
    }

    /// Longest handler run seen
    pub fn worst(&self) -> u32 {
        self.worst
    }
}
