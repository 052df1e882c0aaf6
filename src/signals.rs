//! Pin-level output word of the sequencer.
//!
//! Every tick produces two [`Signals`] words holding the complete output set,
//! one for each half of the input clock. The packing is fixed so captured
//! words can be streamed to a parallel output peripheral without
//! transformation.

use bitfield::bitfield;
use embedded_graphics::prelude::Point;

use crate::mask::BitPlaneMask;

bitfield! {
    /// 32-bit word holding every sequencer output for one half tick.
    ///
    /// In the high half the pixel clock follows its enable window and the
    /// column address is the value that edge consumes. In the low half the
    /// pixel clock is released and the column already holds the next value.
    ///
    /// The bit layout is as follows:
    /// - Bits 21-16: Brightness bit-plane mask (one-hot)
    /// - Bit 14: Output enable
    /// - Bit 13: Row latch
    /// - Bit 12: Pixel clock
    /// - Bits 11-8: Row address
    /// - Bits 7-0: Column address
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    #[repr(transparent)]
    pub struct Signals(u32);
    impl Debug;
    /// Active brightness bit-plane selector
    pub u8, brightness_mask, set_brightness_mask: 21, 16;
    /// LEDs of the latched row are lit
    pub output_enable, set_output_enable: 14;
    /// Latch pulse copying the shifted row into the output drivers
    pub row_latch, set_row_latch: 13;
    /// Gated pixel clock
    pub clk_pixel, set_clk_pixel: 12;
    /// Current scan row
    pub u8, row_address, set_row_address: 11, 8;
    /// Current column, counting down from 63
    pub u8, column_address, set_column_address: 7, 0;
}

impl Signals {
    /// All outputs inactive, as driven during reset.
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Raw packed word.
    #[must_use]
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Brightness mask as a typed value.
    #[must_use]
    pub fn mask(&self) -> BitPlaneMask {
        BitPlaneMask::from_bits(self.brightness_mask()).unwrap_or_default()
    }

    /// LED cell addressed by the column and row outputs.
    #[must_use]
    pub fn cell(&self) -> Point {
        Point::new(
            i32::from(self.column_address()),
            i32::from(self.row_address()),
        )
    }
}

impl From<Signals> for u32 {
    fn from(signals: Signals) -> Self {
        signals.0
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Signals {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Signals({=u32:#x})", self.0)
    }
}
