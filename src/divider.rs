//! Periodic tick divider.
//!
//! The divider toggles an internal phase every `divisor` input ticks, so its
//! output is a square wave with a period of `2 * divisor` input ticks. The
//! scan sequencer uses the rising edge of that output as its state-advance
//! event.

/// Fixed-ratio frequency divider driven by the shared input tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickDivider {
    divisor: u16,
    count: u16,
    phase: bool,
}

impl TickDivider {
    /// Create a divider that toggles its output every `divisor` ticks.
    ///
    /// A divisor of zero behaves like a divisor of one.
    #[must_use]
    pub const fn new(divisor: u16) -> Self {
        Self {
            divisor,
            count: 0,
            phase: false,
        }
    }

    /// Configured divisor (half of the output period).
    #[must_use]
    pub const fn divisor(&self) -> u16 {
        self.divisor
    }

    /// Full output period in input ticks.
    #[must_use]
    pub const fn period(&self) -> u32 {
        let divisor = if self.divisor == 0 { 1 } else { self.divisor };
        2 * divisor as u32
    }

    /// Current output level.
    #[must_use]
    pub const fn output(&self) -> bool {
        self.phase
    }

    /// Advance by one input tick and return the new output level.
    pub fn tick(&mut self) -> bool {
        if self.count + 1 >= self.divisor {
            self.count = 0;
            self.phase = !self.phase;
        } else {
            self.count += 1;
        }
        self.phase
    }

    /// Return to the known phase: output low, count zero.
    pub fn reset(&mut self) {
        self.count = 0;
        self.phase = false;
    }
}
