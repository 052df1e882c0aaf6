//! Scan sequencer: the row/column scan and BCM timing state machine.
//!
//! The sequencer is five [`Timeout`]s wired into a trigger chain plus the
//! row and bit-plane registers. There is no state tag; the phase of a row
//! pass is whatever combination of timeouts happens to be running.
//!
//! ```text
//! state advance ──┬─> pixel enable (64)   ──> clk_pixel
//!                 ├─> column (63, ~clk)   ──> column_address
//!                 └─> latch delay (63) ─┬─> [fall] rotate mask, advance row
//!                                       └─> latch enable (1) ──> row_latch
//!                                             └─> [fall] output enable (2^k) ──> output_enable
//! ```
//!
//! # Timing
//! One call to [`ScanSequencer::tick`] is one period of the input clock and
//! is split into two sub-phases:
//! - **Rising**: every timeout clocked by the input clock samples its start
//!   input from the outputs of the previous tick, then the edge callbacks
//!   (mask rotation, row advance) run.
//! - **Falling**: the column timeout, clocked on the inverted input clock,
//!   samples the state-advance level produced half a tick earlier. The new
//!   column value is therefore staged before the next pixel clock edge.
//!
//! [`tick`](ScanSequencer::tick) returns the word driven during the high half
//! of the tick. [`tick_phases`](ScanSequencer::tick_phases) returns both
//! halves: the high word, then a low word with `clk_pixel` released and the
//! newly staged column. The column address therefore only ever changes while
//! the pixel clock is low, and streaming the two words per tick yields one
//! pixel clock edge per column.
//!
//! With `t` the tick on which the divider output rises, one row pass reads:
//!
//! | tick        | event                                              |
//! |-------------|----------------------------------------------------|
//! | `t`         | state advance, column loads 63 on the falling phase |
//! | `t+1..=t+64`| pixel clock active, column address 63 down to 0     |
//! | `t+64`      | latch delay ends, bit-plane mask rotates            |
//! | `t+65`      | row latch pulse                                     |
//! | `t+66`      | next state advance                                  |
//! | `t+67..`    | output enable for `2^k` ticks of the delayed plane  |
//!
//! # Example
//! ```rust
//! use hub75_sequencer::ScanSequencer;
//!
//! let mut sequencer = ScanSequencer::new();
//! let columns: Vec<u8> = sequencer
//!     .signals_iter()
//!     .filter(|s| s.clk_pixel())
//!     .take(64)
//!     .map(|s| s.column_address())
//!     .collect();
//! assert_eq!(columns, (0..64).rev().collect::<Vec<u8>>());
//! ```

use embedded_graphics::prelude::{OriginDimensions, Size};

use crate::divider::TickDivider;
use crate::edge::Edge;
use crate::fmt;
use crate::mask::BitPlaneMask;
use crate::signals::Signals;
use crate::timeout::Timeout;
use crate::{
    COLUMN_START, LATCH_DELAY_TICKS, LATCH_PULSE_TICKS, PIXEL_ENABLE_TICKS, ROWS, SCAN_SIZE,
    STATE_ADVANCE_DIVISOR,
};

const ROW_MASK: u8 = (ROWS - 1) as u8;

/// Cycle-exact scan sequencer for a 64 x 16, 6-bit HUB75 panel.
///
/// Drive it with [`tick`](Self::tick) once per input clock period and read
/// the returned [`Signals`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanSequencer {
    divider: TickDivider,
    pixel_enable: Timeout,
    column: Timeout,
    latch_delay: Timeout,
    latch_enable: Timeout,
    output_enable: Timeout,
    latch_delay_done: Edge,
    plane_done: Edge,
    mask: BitPlaneMask,
    delayed_mask: BitPlaneMask,
    row: u8,
    outputs: Signals,
    falling_outputs: Signals,
    ticks: u32,
}

impl Default for ScanSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanSequencer {
    /// Create a sequencer in its reset state.
    ///
    /// Start inputs are primed with the levels they rest at after reset so
    /// the release from reset never looks like a trigger. The latch-delay
    /// watcher starts high: the first tick sees a falling edge and takes the
    /// zero-mask recovery, leaving the mask on the lowest plane.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            divider: TickDivider::new(STATE_ADVANCE_DIVISOR),
            pixel_enable: Timeout::new(PIXEL_ENABLE_TICKS),
            column: Timeout::new(COLUMN_START),
            latch_delay: Timeout::new(LATCH_DELAY_TICKS),
            latch_enable: Timeout::new(LATCH_PULSE_TICKS).with_start_level(true),
            output_enable: Timeout::new(0).with_start_level(true),
            latch_delay_done: Edge::new(true),
            plane_done: Edge::new(false),
            mask: BitPlaneMask::ZERO,
            delayed_mask: BitPlaneMask::ZERO,
            row: 0,
            outputs: Signals::new(),
            falling_outputs: Signals::new(),
            ticks: 0,
        }
    }

    /// Synchronous reset: every counter and register returns to its initial value.
    pub fn reset(&mut self) {
        fmt::debug!("sequencer reset after {} ticks", self.ticks);
        self.divider.reset();

        // start inputs rest at these levels while reset is held
        self.pixel_enable.reset(false);
        self.column.reset(false);
        self.latch_delay.reset(false);
        self.latch_enable.reset(true);
        self.output_enable.reset(true);
        self.output_enable.set_value(0);

        self.latch_delay_done = Edge::new(true);
        self.plane_done = Edge::new(false);
        self.mask = BitPlaneMask::ZERO;
        self.delayed_mask = BitPlaneMask::ZERO;
        self.row = 0;
        self.outputs = Signals::new();
        self.falling_outputs = Signals::new();
        self.ticks = 0;
    }

    /// Advance one input clock period.
    ///
    /// While `reset` is asserted all outputs are held inactive and no pulses
    /// are generated.
    pub fn tick(&mut self, reset: bool) -> Signals {
        if reset {
            self.reset();
            return self.outputs;
        }

        self.ticks = self.ticks.wrapping_add(1);

        // Rising phase: inputs are the registered outputs of the previous tick.
        let state_advance = self.divider.output();
        let latch_delay_idle = !self.latch_delay.running();
        let latch_idle = !self.latch_enable.running();
        let width = self.delayed_mask.pulse_width();

        self.divider.tick();
        self.pixel_enable.tick(state_advance);
        self.latch_delay.tick(state_advance);
        self.latch_enable.tick(latch_delay_idle);
        self.output_enable.set_value(width);
        self.output_enable.tick(latch_idle);

        if self.latch_delay_done.fell(self.latch_delay.running()) {
            self.rotate_mask();
        }
        if self.plane_done.fell(self.delayed_mask.is_brightest()) {
            self.advance_row();
        }

        let mut outputs = Signals::new();
        outputs.set_column_address(self.column.counter());
        outputs.set_row_address(self.row);
        outputs.set_clk_pixel(self.pixel_enable.running());
        outputs.set_row_latch(self.latch_enable.running());
        outputs.set_output_enable(self.output_enable.running());
        outputs.set_brightness_mask(self.mask.bits());
        self.outputs = outputs;

        // Falling phase: stage the column for the next pixel clock edge.
        self.column.tick(self.divider.output());

        let mut falling = outputs;
        falling.set_clk_pixel(false);
        falling.set_column_address(self.column.counter());
        self.falling_outputs = falling;

        outputs
    }

    /// Advance one input clock period and return the high and low half words.
    pub fn tick_phases(&mut self, reset: bool) -> [Signals; 2] {
        let high = self.tick(reset);
        [high, self.falling_outputs]
    }

    /// Advance one input clock period with reset released.
    pub fn step(&mut self) -> Signals {
        self.tick(false)
    }

    /// Endless stream of high-half output words, one per tick.
    pub fn signals_iter(&mut self) -> impl Iterator<Item = Signals> + '_ {
        core::iter::from_fn(move || Some(self.step()))
    }

    /// Endless stream of pin words, two per tick: high half then low half.
    pub fn phases_iter(&mut self) -> impl Iterator<Item = Signals> + '_ {
        core::iter::from_fn(move || Some(self.tick_phases(false))).flatten()
    }

    fn rotate_mask(&mut self) {
        if !self.mask.is_valid() {
            fmt::debug!("brightness mask is zero, forcing lowest bit-plane");
        }
        self.delayed_mask = self.mask;
        self.mask = self.mask.rotate();
        fmt::trace!(
            "bit-plane {} -> {} at tick {}",
            self.delayed_mask.bits(),
            self.mask.bits(),
            self.ticks
        );
    }

    fn advance_row(&mut self) {
        self.row = self.row.wrapping_add(1) & ROW_MASK;
        fmt::trace!("row address {} at tick {}", self.row, self.ticks);
    }

    /// Outputs of the most recent tick.
    #[must_use]
    pub const fn outputs(&self) -> Signals {
        self.outputs
    }

    /// Outputs during the low half of the most recent tick.
    #[must_use]
    pub const fn falling_outputs(&self) -> Signals {
        self.falling_outputs
    }

    /// Ticks since construction or the last reset.
    #[must_use]
    pub const fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Bit-plane currently being shifted out.
    #[must_use]
    pub const fn mask(&self) -> BitPlaneMask {
        self.mask
    }

    /// Bit-plane one rotation behind, selecting the output-enable width.
    #[must_use]
    pub const fn delayed_mask(&self) -> BitPlaneMask {
        self.delayed_mask
    }

    /// Output-enable width the next latch will start.
    #[must_use]
    pub const fn output_enable_width(&self) -> u8 {
        self.delayed_mask.pulse_width()
    }

    /// Current row address.
    #[must_use]
    pub const fn row_address(&self) -> u8 {
        self.row
    }

    /// Column value staged for the next pixel clock edge.
    #[must_use]
    pub const fn column_address(&self) -> u8 {
        self.column.counter()
    }
}

impl OriginDimensions for ScanSequencer {
    fn size(&self) -> Size {
        SCAN_SIZE
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ScanSequencer {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "ScanSequencer ticks: {}, row: {}, mask: {}, delayed: {}",
            self.ticks,
            self.row,
            self.mask.bits(),
            self.delayed_mask.bits()
        );
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use super::*;
    use crate::{FRAME_TICKS, ON_TICKS_PER_ROW, ROW_PASS_TICKS, ROW_TICKS};

    // Tick on which the divider output first rises after reset
    const FIRST_ADVANCE: u32 = STATE_ADVANCE_DIVISOR as u32;
    // Tick of the first row address change
    const FIRST_ROW_ADVANCE: usize = FIRST_ADVANCE as usize + 64 + 6 * ROW_PASS_TICKS;

    fn run(sequencer: &mut ScanSequencer, ticks: usize) -> Vec<Signals> {
        sequencer.signals_iter().take(ticks).collect()
    }

    // Signals indexed by tick number (index 0 is the reset state)
    fn timeline(ticks: usize) -> Vec<Signals> {
        let mut sequencer = ScanSequencer::new();
        let mut out = Vec::with_capacity(ticks + 1);
        out.push(sequencer.outputs());
        out.extend(run(&mut sequencer, ticks));
        out
    }

    // (first tick, length) of every run of ticks where `active` holds
    fn pulses(signals: &[Signals], active: impl Fn(&Signals) -> bool) -> Vec<(usize, usize)> {
        let mut found = Vec::new();
        let mut start = None;
        for (tick, s) in signals.iter().enumerate() {
            match (active(s), start) {
                (true, None) => start = Some(tick),
                (false, Some(first)) => {
                    found.push((first, tick - first));
                    start = None;
                }
                _ => {}
            }
        }
        found
    }

    #[test]
    fn test_sequencer_construction() {
        let sequencer = ScanSequencer::new();
        assert_eq!(sequencer.outputs(), Signals::new());
        assert_eq!(sequencer.ticks(), 0);
        assert_eq!(sequencer.mask(), BitPlaneMask::ZERO);
        assert_eq!(sequencer.delayed_mask(), BitPlaneMask::ZERO);
        assert_eq!(sequencer.row_address(), 0);
        assert_eq!(sequencer.output_enable_width(), 0);
        assert_eq!(sequencer, ScanSequencer::default());
    }

    #[test]
    fn test_sequencer_size() {
        let sequencer = ScanSequencer::new();
        assert_eq!(sequencer.size(), Size::new(64, 16));
    }

    #[test]
    fn test_first_tick_recovers_zero_mask() {
        let mut sequencer = ScanSequencer::new();
        let signals = sequencer.step();
        assert_eq!(signals.brightness_mask(), 0b000001);
        assert_eq!(sequencer.mask(), BitPlaneMask::LOWEST);
        assert_eq!(sequencer.delayed_mask(), BitPlaneMask::ZERO);
        assert!(!signals.row_latch());
        assert!(!signals.output_enable());
        assert!(!signals.clk_pixel());
    }

    #[test]
    fn test_outputs_idle_before_first_state_advance() {
        let signals = timeline(FIRST_ADVANCE as usize);
        for s in &signals[1..] {
            assert!(!s.clk_pixel());
            assert!(!s.row_latch());
            assert!(!s.output_enable());
            assert_eq!(s.column_address(), 0);
            assert_eq!(s.row_address(), 0);
            assert_eq!(s.brightness_mask(), 1);
        }
    }

    #[test]
    fn test_first_pass_column_sequence() {
        let signals = timeline(ROW_PASS_TICKS * 2);
        let clocked: Vec<(usize, u8)> = signals
            .iter()
            .enumerate()
            .filter(|(_, s)| s.clk_pixel())
            .map(|(tick, s)| (tick, s.column_address()))
            .take(64)
            .collect();

        let first = FIRST_ADVANCE as usize + 1;
        let expected: Vec<(usize, u8)> = (0..64).map(|i| (first + i, 63 - i as u8)).collect();
        assert_eq!(clocked, expected);
    }

    #[test]
    fn test_pixel_clock_window_per_pass() {
        let signals = timeline(ROW_TICKS + ROW_PASS_TICKS);
        let windows = pulses(&signals, Signals::clk_pixel);
        assert_eq!(windows.len(), 6);
        for (pass, &(first, len)) in windows.iter().enumerate() {
            assert_eq!(first, FIRST_ADVANCE as usize + 1 + pass * ROW_PASS_TICKS);
            assert_eq!(len, 64);
        }
    }

    #[test]
    fn test_column_holds_zero_until_next_advance() {
        let signals = timeline(ROW_PASS_TICKS * 3);
        let last_clock = FIRST_ADVANCE as usize + 64;
        let next_first = last_clock + ROW_PASS_TICKS - 63;
        for s in &signals[last_clock..next_first] {
            assert_eq!(s.column_address(), 0);
        }
        assert_eq!(signals[next_first].column_address(), 63);
        assert!(signals[next_first].clk_pixel());
        assert!(!signals[next_first - 1].clk_pixel());
    }

    #[test]
    fn test_row_latch_follows_last_pixel_clock() {
        let signals = timeline(ROW_TICKS * 2 + ROW_PASS_TICKS);
        let latches = pulses(&signals, Signals::row_latch);
        assert_eq!(latches.len(), 12);
        for &(tick, len) in &latches {
            assert_eq!(len, 1);
            assert!(signals[tick - 1].clk_pixel());
            assert_eq!(signals[tick - 1].column_address(), 0);
            assert!(!signals[tick].clk_pixel());
        }
        assert_eq!(latches[0].0, FIRST_ADVANCE as usize + 65);
    }

    #[test]
    fn test_mask_rotates_after_first_pass() {
        let signals = timeline(ROW_PASS_TICKS * 2);
        let rotation = FIRST_ADVANCE as usize + 64;
        assert_eq!(signals[rotation - 1].brightness_mask(), 0b000001);
        assert_eq!(signals[rotation].brightness_mask(), 0b000010);
        assert!(signals[rotation + 1].row_latch());
    }

    #[test]
    fn test_mask_cycles_one_hot_in_order() {
        let signals = timeline(ROW_TICKS * 3);
        let mut sequence: Vec<u8> = Vec::new();
        for s in &signals[1..] {
            let mask = s.brightness_mask();
            assert_eq!(mask.count_ones(), 1);
            if sequence.last() != Some(&mask) {
                sequence.push(mask);
            }
        }
        let expected: Vec<u8> = [1u8, 2, 4, 8, 16, 32]
            .iter()
            .copied()
            .cycle()
            .take(sequence.len())
            .collect();
        assert_eq!(sequence, expected);
        assert!(sequence.len() >= 18);
    }

    #[test]
    fn test_output_enable_width_follows_delayed_plane() {
        let signals = timeline(ROW_TICKS * 2 + ROW_PASS_TICKS * 2);
        let latches = pulses(&signals, Signals::row_latch);
        let enables = pulses(&signals, Signals::output_enable);
        let widths: Vec<usize> = enables.iter().map(|&(_, len)| len).collect();
        assert_eq!(widths[..12], [1, 2, 4, 8, 16, 32, 1, 2, 4, 8, 16, 32]);

        // each enable starts two ticks after its latch pulse
        for (&(latch, _), &(enable, _)) in latches.iter().zip(enables.iter()) {
            assert_eq!(enable, latch + 2);
        }
    }

    #[test]
    fn test_output_enable_ends_before_next_latch() {
        let signals = timeline(ROW_TICKS);
        for s in &signals {
            assert!(!(s.output_enable() && s.row_latch()));
        }
    }

    #[test]
    fn test_on_ticks_per_row() {
        // one full pass over all 16 rows, ending where row 0 comes round again
        let end = FIRST_ROW_ADVANCE + 15 * ROW_TICKS;
        let signals = timeline(end);
        for row in 0..16u8 {
            let on = signals[1..end]
                .iter()
                .filter(|s| s.row_address() == row && s.output_enable())
                .count();
            assert_eq!(on, ON_TICKS_PER_ROW, "row {}", row);
        }
    }

    #[test]
    fn test_row_advances_every_six_passes() {
        let signals = timeline(FRAME_TICKS + ROW_TICKS);
        let first_advance = FIRST_ROW_ADVANCE;

        assert_eq!(signals[first_advance - 1].row_address(), 0);
        assert_eq!(signals[first_advance].row_address(), 1);

        let mut changes = Vec::new();
        for tick in 1..signals.len() {
            if signals[tick].row_address() != signals[tick - 1].row_address() {
                changes.push((tick, signals[tick].row_address()));
            }
        }
        assert_eq!(changes.len(), 16);
        for (i, &(tick, row)) in changes.iter().enumerate() {
            assert_eq!(tick, first_advance + i * ROW_TICKS);
            assert_eq!(row as usize, (i + 1) % 16);
        }
    }

    #[test]
    fn test_row_advance_coincides_with_plane_wrap() {
        let mut sequencer = ScanSequencer::new();
        let mut last_row = sequencer.row_address();
        for _ in 0..ROW_TICKS * 3 {
            sequencer.step();
            if sequencer.row_address() != last_row {
                assert_eq!(sequencer.delayed_mask(), BitPlaneMask::LOWEST);
                assert_eq!(sequencer.mask().bits(), 2);
                last_row = sequencer.row_address();
            }
        }
        assert_eq!(last_row, 2);
    }

    #[test]
    fn test_reset_holds_outputs_inactive() {
        let mut sequencer = ScanSequencer::new();
        run(&mut sequencer, 500);
        for _ in 0..10 {
            let signals = sequencer.tick(true);
            assert_eq!(signals, Signals::new());
            assert_eq!(sequencer.mask(), BitPlaneMask::ZERO);
            assert_eq!(sequencer.ticks(), 0);
        }
    }

    #[test]
    fn test_reset_reproduces_power_on_sequence() {
        let fresh = run(&mut ScanSequencer::new(), 2000);

        // 440 lands inside the widest output-enable pulse
        for prior in [1usize, 33, 97, 98, 440, 777, 1234] {
            let mut sequencer = ScanSequencer::new();
            run(&mut sequencer, prior);
            sequencer.tick(true);
            assert_eq!(sequencer, ScanSequencer::new());
            assert_eq!(run(&mut sequencer, 2000), fresh, "reset after {} ticks", prior);
        }
    }

    #[test]
    fn test_reset_while_held_keeps_every_counter_cleared() {
        let mut sequencer = ScanSequencer::new();
        run(&mut sequencer, 440);
        assert!(sequencer.output_enable_width() > 0);

        for _ in 0..3 {
            assert_eq!(sequencer.tick_phases(true), [Signals::new(); 2]);
            assert_eq!(sequencer, ScanSequencer::new());
        }
    }

    #[test]
    fn test_pixel_clock_toggles_once_per_column() {
        let mut sequencer = ScanSequencer::new();
        let words: Vec<Signals> = sequencer.phases_iter().take(2 * ROW_TICKS).collect();

        let mut clk = Edge::new(false);
        let rising: Vec<u8> = words
            .iter()
            .filter(|&word| clk.rose(word.clk_pixel()))
            .map(Signals::column_address)
            .collect();

        // six passes started in the first row; the last is cut after 33 columns
        assert_eq!(rising.len(), 5 * 64 + 33);
        assert_eq!(rising[..64], (0..64).rev().collect::<Vec<u8>>()[..]);
        assert_eq!(rising[64..128], rising[..64]);
    }

    #[test]
    fn test_column_changes_only_while_clock_low() {
        let mut sequencer = ScanSequencer::new();
        let words: Vec<Signals> = sequencer.phases_iter().take(2 * ROW_TICKS).collect();

        let mut changes = 0;
        for pair in words.windows(2) {
            if pair[0].column_address() != pair[1].column_address() {
                assert!(!pair[1].clk_pixel());
                changes += 1;
            }
        }
        // five full passes, then the load and 33 counts of the sixth
        assert_eq!(changes, 5 * 64 + 34);

        // high words repeat the column staged by the preceding low word
        for pair in words[1..].chunks_exact(2) {
            assert_eq!(pair[0].column_address(), pair[1].column_address());
        }
    }

    #[test]
    fn test_low_half_releases_only_the_pixel_clock() {
        let mut sequencer = ScanSequencer::new();
        for _ in 0..ROW_TICKS {
            let [high, low] = sequencer.tick_phases(false);
            assert!(!low.clk_pixel());
            assert_eq!(low, sequencer.falling_outputs());
            assert_eq!(low.column_address(), sequencer.column_address());

            let mut expected = high;
            expected.set_clk_pixel(false);
            expected.set_column_address(low.column_address());
            assert_eq!(low, expected);
        }
    }

    #[test]
    fn test_tick_without_reset_matches_step() {
        let mut a = ScanSequencer::new();
        let mut b = ScanSequencer::new();
        for _ in 0..300 {
            assert_eq!(a.tick(false), b.step());
        }
        assert_eq!(a.outputs(), b.outputs());
    }

    #[test]
    fn test_column_address_accessor_is_staged_value() {
        let mut sequencer = ScanSequencer::new();
        run(&mut sequencer, FIRST_ADVANCE as usize);
        // staged on the falling phase of the state-advance tick
        assert_eq!(sequencer.column_address(), 63);
        assert_eq!(sequencer.outputs().column_address(), 0);
        assert_eq!(sequencer.step().column_address(), 63);
    }

    #[test]
    fn test_signals_cell_tracks_addresses() {
        let signals = timeline(ROW_PASS_TICKS * 2);
        let first = FIRST_ADVANCE as usize + 1;
        assert_eq!(signals[first].cell().x, 63);
        assert_eq!(signals[first + 63].cell().x, 0);
        assert_eq!(signals[first].cell().y, 0);
    }
}
