//! Feed, rapid and spindle overrides

use crate::config::OverrideLimits;

/// Discrete rapid override levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RapidOverride {
    #[default]
    Full,
    Half,
    Quarter,
}

impl RapidOverride {
    pub const fn percent(self) -> u8 {
        match self {
            RapidOverride::Full => 100,
            RapidOverride::Half => 50,
            RapidOverride::Quarter => 25,
        }
    }
}

/// Current override percentages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Overrides {
    pub feed: u8,
    pub rapid: RapidOverride,
    pub spindle: u8,
    limits: OverrideLimits,
}

impl Overrides {
    pub fn new(limits: OverrideLimits) -> Self {
        Self {
            feed: 100,
            rapid: RapidOverride::Full,
            spindle: 100,
            limits,
        }
    }

    /// Configured limits
    pub fn limits(&self) -> &OverrideLimits {
        &self.limits
    }

    /// Set the feed override, clamped to the limits
    pub fn set_feed(&mut self, percent: u8) {
        self.feed = self.clamp(percent as i16);
    }

    /// Adjust the feed override by a signed amount (usually ± coarse or fine)
    pub fn adjust_feed(&mut self, delta: i16) {
        self.feed = self.clamp(self.feed as i16 + delta);
    }

    /// Set the spindle override, clamped to the limits
    pub fn set_spindle(&mut self, percent: u8) {
        self.spindle = self.clamp(percent as i16);
    }

    /// Adjust the spindle override by a signed amount
    pub fn adjust_spindle(&mut self, delta: i16) {
        self.spindle = self.clamp(self.spindle as i16 + delta);
    }

    /// Restore 100 % everywhere
    pub fn reset(&mut self) {
        self.feed = 100;
        self.rapid = RapidOverride::Full;
        self.spindle = 100;
    }

    /// Replace the limits, re-clamping current values
    pub fn set_limits(&mut self, limits: OverrideLimits) {
        self.limits = limits;
        self.feed = self.clamp(self.feed as i16);
        self.spindle = self.clamp(self.spindle as i16);
    }

    fn clamp(&self, value: i16) -> u8 {
        value.clamp(self.limits.min as i16, self.limits.max as i16) as u8
    }
}

impl Default for Overrides {
    fn default() -> Self {
        Self::new(OverrideLimits::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_clamps_to_limits() {
        let mut o = Overrides::default();
        o.adjust_feed(250);
        assert_eq!(o.feed, 200);
        o.set_feed(0);
        assert_eq!(o.feed, 10);
    }

    #[test]
    fn test_coarse_and_fine_increments() {
        let mut o = Overrides::default();
        let coarse = o.limits().coarse as i16;
        let fine = o.limits().fine as i16;
        o.adjust_spindle(coarse);
        o.adjust_spindle(-fine);
        assert_eq!(o.spindle, 109);
    }

    #[test]
    fn test_rapid_levels_and_reset() {
        let mut o = Overrides::default();
        o.rapid = RapidOverride::Quarter;
        o.set_feed(150);
        assert_eq!(o.rapid.percent(), 25);
        o.reset();
        assert_eq!(o.rapid.percent(), 100);
        assert_eq!(o.feed, 100);
    }

    #[test]
    fn test_new_limits_reclamp() {
        let mut o = Overrides::default();
        o.set_feed(180);
        o.set_limits(OverrideLimits {
            min: 50,
            max: 150,
            coarse: 10,
            fine: 1,
        });
        assert_eq!(o.feed, 150);
    }
}
