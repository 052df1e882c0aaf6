//! Scan and brightness sequencer for HUB75 LED matrix displays.
//!
//! ## Control signals this crate drives
//!
//! A HUB75 panel is driven by a handful of control lines around the colour data. This crate
//! produces all of them except the colour bits, as two pin words per input clock tick:
//!
//! - **CLK** – `clk_pixel`: high in the first half of a tick inside the 64-tick pixel window,
//!   low in the second half, so every column gets exactly one rising edge
//! - **Column** – `column_address`: counts 63 down to 0 and only moves in the low half, so the
//!   value is stable for half a tick before the edge that uses it
//! - **LAT** – `row_latch`: one tick wide, one tick after the last pixel clock of a pass
//! - **OE** – `output_enable`: starts two ticks after the latch and stays high for `2^k` ticks,
//!   where `k` is the bit-plane that latch loaded
//! - **A B C D** – `row_address`: moves on to the next row once the brightest plane is lit
//!
//! ### Bit-plane schedule
//! Each row is shown six times, once per brightness bit. The mask driven on the
//! `brightness_mask` lines tells the colour path which bit to shift, and the plane shifted in
//! one pass is lit during the next one for a number of ticks equal to its weight. The lit
//! times of one row add up to 1 + 2 + 4 + 8 + 16 + 32 = 63 ticks.
//!
//! ## What this crate does
//!
//! This crate is the timing core of a driver: it decides *when* to clock pixels, latch a row,
//! light it and move on, never *what* colour data is shifted. It is a synchronous,
//! cycle-exact model of a small piece of logic driving a 64 × 16 scan, 6-bit panel:
//!
//! - [`divider::TickDivider`] – produces the state-advance event every [`ROW_PASS_TICKS`] ticks
//! - [`timeout::Timeout`] – the re-triggerable monostable every other timing is made of
//! - [`sequencer::ScanSequencer`] – five timeouts in a trigger chain plus the row and
//!   bit-plane registers
//!
//! Each state advance starts one *row pass*: 64 pixel clocks while the column address counts
//! down from 63, one latch pulse, then an output-enable pulse whose width is the weight of the
//! bit-plane that was just latched. Six passes, one per bit-plane, make up a row; then the row
//! address advances.
//!
//! The outputs of each half tick are packed into a [`signals::Signals`] word. A run of them can
//! be captured into a [`waveform::Waveform`] and handed to a DMA engine to be clocked out to
//! the panel.
//!
//! ```rust
//! use hub75_sequencer::{ScanSequencer, ROW_TICKS};
//!
//! let mut sequencer = ScanSequencer::new();
//! let lit = sequencer
//!     .signals_iter()
//!     .skip(98) // up to and including the first latch pulse
//!     .take(ROW_TICKS)
//!     .filter(|s| s.output_enable())
//!     .count();
//! assert_eq!(lit, 63);
//! ```
//!
//! ## Fixed geometry
//!
//! The constants below encode one protocol. They are checked against each other at compile
//! time; changing the panel geometry means re-deriving them, not configuring them.
//!
//! ## Available Feature Flags
//!
//! ### `defmt` Feature
//! Implements `defmt::Format` for the public types and routes the crate's internal
//! diagnostics (reset, mask recovery, bit-plane rotation, row advance) to `defmt`.
//!
//! ### `log` Feature
//! Routes the same diagnostics to the `log` facade.
//!
//! ### `esp-dma` Feature (required when using `esp-hal`)
//! Switches the `ReadBuffer` implementation of [`waveform::Waveform`] from `embedded-dma`
//! to `esp-hal::dma`. The `esp32`, `esp32s3` and `esp32c6` features select the chip.
//!
//! ```toml
//! [dependencies]
//! hub75-sequencer = { version = "0.1.0", features = ["esp32s3"] }
//! ```
#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use embedded_graphics::prelude::Size;

mod fmt;

pub mod divider;
pub mod edge;
pub mod mask;
pub mod sequencer;
pub mod signals;
pub mod timeout;
pub mod waveform;

pub use mask::BitPlaneMask;
pub use sequencer::ScanSequencer;
pub use signals::Signals;
pub use waveform::Waveform;

/// Number of columns shifted per row pass
pub const COLS: usize = 64;
/// Number of scan rows (row address lines A-D)
pub const ROWS: usize = 16;
/// Number of brightness bit-planes
pub const BITS: u8 = 6;

/// Column address loaded at each state advance
pub const COLUMN_START: u8 = (COLS - 1) as u8;
/// Length of the pixel clock window in ticks
pub const PIXEL_ENABLE_TICKS: u8 = COLS as u8;
/// Ticks from state advance to the end of the latch delay
pub const LATCH_DELAY_TICKS: u8 = (COLS - 1) as u8;
/// Width of the row latch pulse in ticks
pub const LATCH_PULSE_TICKS: u8 = 1;
/// Divisor of the state-advance divider
pub const STATE_ADVANCE_DIVISOR: u16 = compute_state_advance_divisor(COLS);

/// Ticks between state advances (one bit-plane of one row)
pub const ROW_PASS_TICKS: usize = 2 * STATE_ADVANCE_DIVISOR as usize;
/// Ticks per row (all bit-planes)
pub const ROW_TICKS: usize = compute_row_ticks(ROW_PASS_TICKS, BITS);
/// Ticks per frame (all rows)
pub const FRAME_TICKS: usize = compute_frame_ticks(ROW_TICKS, ROWS);
/// Output-enable ticks per row, the sum of all bit-plane weights
pub const ON_TICKS_PER_ROW: usize = compute_on_ticks(BITS);

/// Pin words per tick, one for each half of the input clock
pub const WORDS_PER_TICK: usize = 2;
/// Pin words per row pass
pub const ROW_PASS_WORDS: usize = WORDS_PER_TICK * ROW_PASS_TICKS;
/// Pin words per row
pub const ROW_WORDS: usize = WORDS_PER_TICK * ROW_TICKS;
/// Pin words per frame
pub const FRAME_WORDS: usize = WORDS_PER_TICK * FRAME_TICKS;

/// Scan geometry: columns by scan rows
pub const SCAN_SIZE: Size = Size::new(COLS as u32, ROWS as u32);

/// Computes the state-advance divisor for a given number of columns
///
/// The divider output period is twice the divisor. It has to cover the pixel
/// clock window, the tick spent sampling the state advance and the latch tick.
///
/// # Arguments
///
/// * `cols` - Number of columns shifted per row pass
///
/// # Returns
///
/// Divisor giving a period of at least `cols + 2` ticks
#[must_use]
pub const fn compute_state_advance_divisor(cols: usize) -> u16 {
    cols.div_ceil(2) as u16 + 1
}

/// Computes the number of output-enable ticks for a given bit depth
///
/// Each bit-plane `k` is lit for `2^k` ticks, so all planes together take
/// `2^bits - 1` ticks.
///
/// # Arguments
///
/// * `bits` - Number of brightness bit-planes
///
/// # Returns
///
/// Number of lit ticks per row
#[must_use]
pub const fn compute_on_ticks(bits: u8) -> usize {
    (1usize << bits) - 1
}

/// Computes the number of ticks spent on one row
///
/// # Arguments
///
/// * `pass_ticks` - Ticks between state advances
/// * `bits` - Number of brightness bit-planes
#[must_use]
pub const fn compute_row_ticks(pass_ticks: usize, bits: u8) -> usize {
    pass_ticks * bits as usize
}

/// Computes the number of ticks spent on a full frame
///
/// # Arguments
///
/// * `row_ticks` - Ticks per row
/// * `rows` - Number of scan rows
#[must_use]
pub const fn compute_frame_ticks(row_ticks: usize, rows: usize) -> usize {
    row_ticks * rows
}

// Geometry checks. A failure here is a build error, not a runtime condition.
const _: () = assert!(ROWS.is_power_of_two() && ROWS <= 16, "row address is 4 bits");
const _: () = assert!(COLS > 0 && COLS <= 256, "column address is 8 bits");
const _: () = assert!(BITS > 0 && BITS <= 6, "brightness mask field is 6 bits");
const _: () = assert!(
    ROW_PASS_TICKS >= PIXEL_ENABLE_TICKS as usize + 2,
    "a row pass must hold the pixel window and the latch pulse"
);
const _: () = assert!(
    (1usize << (BITS - 1)) + 2 < ROW_PASS_TICKS,
    "the widest output-enable pulse must end before the next latch"
);
const _: () = assert!(LATCH_DELAY_TICKS + 1 == PIXEL_ENABLE_TICKS);
