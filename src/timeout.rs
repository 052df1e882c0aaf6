//! Monostable timeout, the single timing building block of the sequencer.
//!
//! A rising edge on `start` loads the counter with `value`. The counter then
//! counts down once per tick and the timeout is running while it is non-zero,
//! so a trigger with `value = N` keeps `running` asserted for exactly `N`
//! ticks. A trigger with `value = 0` never runs. A fresh rising edge while
//! running restarts the count; a level held high does not retrigger.

use crate::edge::Edge;

/// Re-triggerable countdown timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timeout {
    value: u8,
    counter: u8,
    start: Edge,
}

impl Timeout {
    /// Create an idle timeout that will count `value` ticks once started.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self {
            value,
            counter: 0,
            start: Edge::new(false),
        }
    }

    /// Prime the start input with its idle level.
    ///
    /// A timeout whose start input rests high would otherwise see a rising
    /// edge on the first tick.
    #[must_use]
    pub const fn with_start_level(mut self, level: bool) -> Self {
        self.start = Edge::new(level);
        self
    }

    /// Target count loaded on the next trigger.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.value
    }

    /// Change the target count. A count already in progress is not affected.
    pub fn set_value(&mut self, value: u8) {
        self.value = value;
    }

    /// Ticks remaining.
    #[must_use]
    pub const fn counter(&self) -> u8 {
        self.counter
    }

    /// True while counting.
    #[must_use]
    pub const fn running(&self) -> bool {
        self.counter > 0
    }

    /// Advance one tick with the sampled `start` level and return `running`.
    pub fn tick(&mut self, start: bool) -> bool {
        if self.start.rose(start) {
            self.counter = self.value;
        } else {
            self.counter = self.counter.saturating_sub(1);
        }
        self.running()
    }

    /// Stop counting and record `start` as the current input level.
    pub fn reset(&mut self, start: bool) {
        self.counter = 0;
        self.start = Edge::new(start);
    }
}
