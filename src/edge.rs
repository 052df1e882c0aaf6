//! Level-comparison edge detection.
//!
//! Hardware reacts to signal edges directly. Here every watched signal is
//! sampled once per tick and compared against the previous sample.

/// Direction of a detected level change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    /// Low to high
    Rising,
    /// High to low
    Falling,
}

/// Remembers the last sampled level of a signal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Edge {
    last: bool,
}

impl Edge {
    /// Create a watcher whose previous sample is `level`.
    #[must_use]
    pub const fn new(level: bool) -> Self {
        Self { last: level }
    }

    /// Last sampled level.
    #[must_use]
    pub const fn level(&self) -> bool {
        self.last
    }

    /// Sample `level` and report the transition from the previous sample, if any.
    pub fn update(&mut self, level: bool) -> Option<Transition> {
        let last = core::mem::replace(&mut self.last, level);
        match (last, level) {
            (false, true) => Some(Transition::Rising),
            (true, false) => Some(Transition::Falling),
            _ => None,
        }
    }

    /// Sample `level` and return true on a rising transition.
    pub fn rose(&mut self, level: bool) -> bool {
        self.update(level) == Some(Transition::Rising)
    }

    /// Sample `level` and return true on a falling transition.
    pub fn fell(&mut self, level: bool) -> bool {
        self.update(level) == Some(Transition::Falling)
    }
}
