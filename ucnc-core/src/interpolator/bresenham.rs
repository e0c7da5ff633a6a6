//! Multi-axis Bresenham stepping with Dynamic Step Spread
//!
//! Every step event of a block is split into `2^level` sub-ticks. Each
//! sub-tick adds a share of the axis step count to that axis' accumulator,
//! scaled so a full event always adds `steps << max_level` no matter how it
//! was split. The threshold is `events << max_level`, so the total number
//! of pulses per axis is exactly its step count and only their placement
//! in time depends on the level.

use crate::axis::{AxisMask, AXIS_COUNT};
use crate::config::DssSettings;

/// Per-block step accumulators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepSpread {
    steps: [u32; AXIS_COUNT],
    counters: [u64; AXIS_COUNT],
    threshold: u64,
    max_level: u8,
}

impl StepSpread {
    /// Start a block of `events` step events moving `steps` per axis
    pub fn new(steps: &[u32; AXIS_COUNT], events: u32, max_level: u8) -> Self {
        let threshold = (events as u64) << max_level;
        Self {
            steps: *steps,
            // Starting half way places each axis' pulses mid-interval
            counters: [threshold / 2; AXIS_COUNT],
            threshold,
            max_level,
        }
    }

    /// Highest level this block was set up for
    pub fn max_level(&self) -> u8 {
        self.max_level
    }

    /// Run one sub-tick at `level` and return the axes that step
    ///
    /// `level` must stay constant for all sub-ticks of one step event.
    pub fn sub_tick(&mut self, level: u8) -> AxisMask {
        let shift = self.max_level.saturating_sub(level);
        let mut mask = AxisMask::empty();

        for i in 0..AXIS_COUNT {
            self.counters[i] += (self.steps[i] as u64) << shift;
            if self.counters[i] >= self.threshold {
                self.counters[i] -= self.threshold;
                mask |= AxisMask::from_index(i);
            }
        }
        mask
    }
}

/// Oversampling level for a step rate
///
/// The highest level `k <= max_oversampling` whose sub-tick rate
/// `rate << k` stays within the cutoff. Rates above the cutoff run
/// without oversampling.
pub fn spread_level(rate: u32, dss: &DssSettings) -> u8 {
    let mut level = 0;
    while level < dss.max_oversampling && ((rate as u64) << (level + 1)) <= dss.cutoff_hz as u64 {
        level += 1;
    }
    level
}
