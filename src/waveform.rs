//! Captured output waveform, ready for DMA.
//!
//! A [`Waveform`] holds two [`Signals`] words per tick, the high half and
//! the low half of the input clock. Because the scan protocol is periodic, a
//! captured stretch (one row pass, one row, one full frame) can be replayed
//! by a parallel-output peripheral instead of running the sequencer in real
//! time: the DMA engine clocks out one word per half tick and the bit layout
//! of [`Signals`] maps straight onto the output pins, so `clk_pixel` toggles
//! once per column.
//!
//! # Example
//! ```rust
//! use hub75_sequencer::{ScanSequencer, Waveform, ROW_WORDS};
//!
//! let mut sequencer = ScanSequencer::new();
//! let mut waveform = Waveform::<ROW_WORDS>::new();
//! waveform.capture(&mut sequencer);
//!
//! // the first state advance only arrives 33 ticks after reset
//! assert_eq!(waveform.rising_edges(|s| s.clk_pixel()), 5 * 64 + 33);
//! ```
//!
//! # Safety
//! The `ReadBuffer` implementations hand out a raw pointer to the word
//! array. The waveform must not be modified while a transfer is running.

use core::fmt;

#[cfg(not(feature = "esp-dma"))]
use embedded_dma::ReadBuffer;
#[cfg(feature = "esp-dma")]
use esp_hal::dma::ReadBuffer;

use crate::edge::Edge;
use crate::sequencer::ScanSequencer;
use crate::signals::Signals;

/// Buffer of `WORDS` consecutive half-tick output words.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C)]
#[repr(align(4))]
pub struct Waveform<const WORDS: usize> {
    words: [Signals; WORDS],
}

impl<const WORDS: usize> Default for Waveform<WORDS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const WORDS: usize> Waveform<WORDS> {
    /// Create a waveform with every output inactive.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            words: [Signals::new(); WORDS],
        }
    }

    /// Size of the word array in bytes, for sizing `esp-hal` DMA descriptors.
    #[cfg(feature = "esp-dma")]
    #[must_use]
    pub const fn dma_buffer_size_bytes() -> usize {
        core::mem::size_of::<[Signals; WORDS]>()
    }

    /// Fill the waveform by stepping `sequencer` once per pair of words.
    ///
    /// An odd `WORDS` still steps the sequencer for the last word, dropping
    /// the low half of that tick.
    pub fn capture(&mut self, sequencer: &mut ScanSequencer) {
        for (word, signals) in self.words.iter_mut().zip(sequencer.phases_iter()) {
            *word = signals;
        }
    }

    /// Captured words in output order.
    #[must_use]
    pub fn words(&self) -> &[Signals] {
        &self.words
    }

    /// Number of words held.
    #[must_use]
    pub const fn len(&self) -> usize {
        WORDS
    }

    /// True for a zero-length waveform.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        WORDS == 0
    }

    /// Number of words in which `signal` is active.
    pub fn active_words(&self, signal: impl Fn(&Signals) -> bool) -> usize {
        self.words.iter().filter(|&word| signal(word)).count()
    }

    /// Number of low-to-high transitions of `signal`.
    ///
    /// The line is taken to be low before the first word, so a window that
    /// opens in the middle of a pulse counts that pulse.
    pub fn rising_edges(&self, signal: impl Fn(&Signals) -> bool) -> usize {
        let mut edge = Edge::new(false);
        self.words
            .iter()
            .filter(|&word| edge.rose(signal(word)))
            .count()
    }
}

unsafe impl<const WORDS: usize> ReadBuffer for Waveform<WORDS> {
    #[cfg(not(feature = "esp-dma"))]
    type Word = u8;

    unsafe fn read_buffer(&self) -> (*const u8, usize) {
        let ptr = &self.words as *const _ as *const u8;
        let len = core::mem::size_of_val(&self.words);
        (ptr, len)
    }
}

unsafe impl<const WORDS: usize> ReadBuffer for &mut Waveform<WORDS> {
    #[cfg(not(feature = "esp-dma"))]
    type Word = u8;

    unsafe fn read_buffer(&self) -> (*const u8, usize) {
        let ptr = &self.words as *const _ as *const u8;
        let len = core::mem::size_of_val(&self.words);
        (ptr, len)
    }
}

impl<const WORDS: usize> fmt::Debug for Waveform<WORDS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waveform")
            .field("words", &WORDS)
            .field("size", &core::mem::size_of_val(&self.words))
            .finish()
    }
}

#[cfg(feature = "defmt")]
impl<const WORDS: usize> defmt::Format for Waveform<WORDS> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Waveform<{}>", WORDS);
        defmt::write!(f, " size: {}", core::mem::size_of_val(&self.words));
    }
}
