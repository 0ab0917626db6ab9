//! Membrane button matrix and octave select latch.
//!
//! The firmware drives six row lines through a 74LS378 latch (U5) into the
//! diode cathodes of the membrane switches, then reads two CD4502B column
//! buffers (U8 group A, U9 group B). A switch only conducts when its row is
//! pulled low, and the CD4502B inverts, so pressed buttons read as 1.
//!
//! The octave buttons ("0" and "+1") bypass the matrix and feed a NAND SR
//! latch whose output appears on keyboard status D3.

use crate::services::InputPorts;
use tracing::debug;

/// Rows in the matrix.
pub const BUTTON_ROWS: usize = 6;

/// Row and column lines actually wired (D0-D5).
pub const MATRIX_LINES: u8 = 0x3F;

/// Data bits not connected to the column buffers; they float high.
pub const UNCONNECTED_BITS: u8 = 0xC0;

/// Column buffer groups of the button matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonGroup {
    /// U8, read at 0x8000.
    A,
    /// U9, read at 0xA000.
    B,
}

impl ButtonGroup {
    /// Name used in log messages.
    pub fn name(self) -> &'static str {
        match self {
            ButtonGroup::A => "A",
            ButtonGroup::B => "B",
        }
    }
}

/// Row latch of the button matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonMatrix {
    row_latch: u8,
}

impl ButtonMatrix {
    /// Create a matrix with every row deselected.
    pub fn new() -> Self {
        Self { row_latch: 0xFF }
    }

    /// Current row latch (active low).
    pub fn row_latch(&self) -> u8 {
        self.row_latch
    }

    /// Latch a new row selection. Only D0-D5 are wired.
    pub fn latch_rows(&mut self, data: u8) {
        self.row_latch = data & MATRIX_LINES;
    }

    /// Restore a saved row latch.
    pub fn set_row_latch(&mut self, row_latch: u8) {
        self.row_latch = row_latch;
    }

    /// Read a column group as the firmware sees it.
    pub fn read<I: InputPorts + ?Sized>(&self, group: ButtonGroup, inputs: &I) -> u8 {
        let pressed = read_column_group(self.row_latch, |row| inputs.button_row(group, row));
        if pressed & MATRIX_LINES != 0 {
            debug!(
                target: "moog_source::buttons",
                "Button read {} - {:02X}: {:02X}",
                group.name(),
                self.row_latch,
                pressed
            );
        }
        pressed
    }
}

impl Default for ButtonMatrix {
    fn default() -> Self {
        Self::new()
    }
}

/// Combine the raw (active-low) readings of every selected row.
///
/// A row is selected when its latch bit is 0. Presses on selected rows read
/// as 1; the two unconnected bits always read 1.
///
/// # Examples
///
/// ```rust
/// use moog_source::devices::buttons::read_column_group;
///
/// // Row 2 selected, column 4 pressed on that row.
/// let rows = |row: usize| if row == 2 { !0x10u8 } else { 0xFF };
/// assert_eq!(read_column_group(!0x04 & 0x3F, rows), 0xD0);
///
/// // Same press, but row 2 not selected.
/// assert_eq!(read_column_group(0x3F, rows), 0xC0);
/// ```
pub fn read_column_group(row_latch: u8, mut row_reading: impl FnMut(usize) -> u8) -> u8 {
    let pressed = (0..BUTTON_ROWS)
        .filter(|&row| row_latch & (1 << row) == 0)
        .fold(0u8, |acc, row| acc | !row_reading(row));
    pressed | UNCONNECTED_BITS
}

/// Octave selected by the SR latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OctaveSelect {
    /// "0" octave.
    Low,
    /// "+1" octave.
    High,
}

/// SR latch behind the octave buttons. "+1" sets, "0" resets; both or
/// neither pressed hold the previous state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OctaveLatch {
    state: OctaveSelect,
}

impl OctaveLatch {
    /// Latch in its power-on state (high).
    pub fn new() -> Self {
        Self {
            state: OctaveSelect::High,
        }
    }

    /// Current selection.
    pub fn state(&self) -> OctaveSelect {
        self.state
    }

    /// Whether the "+1" octave is selected.
    pub fn is_high(&self) -> bool {
        self.state == OctaveSelect::High
    }

    /// Force the selection, for save states.
    pub fn set_state(&mut self, state: OctaveSelect) {
        self.state = state;
    }

    /// Apply active-high set and reset inputs.
    pub fn apply(&mut self, set: bool, reset: bool) -> OctaveSelect {
        match (set, reset) {
            (true, false) => self.state = OctaveSelect::High,
            (false, true) => self.state = OctaveSelect::Low,
            // Undefined while both are held; resolved on release.
            _ => {}
        }
        self.state
    }

    /// Apply a raw octave button reading: bit 0 is "0", bit 1 is "+1",
    /// both active low.
    pub fn buttons_changed(&mut self, raw: u8) -> OctaveSelect {
        let reset = raw & 0x01 == 0;
        let set = raw & 0x02 == 0;
        let state = self.apply(set, reset);
        debug!(target: "moog_source::buttons", "Octave buttons {:02X}: {:?}", raw, state);
        state
    }

    /// Levels of the "0" and "+1" LEDs.
    pub fn leds(&self) -> [u8; 2] {
        match self.state {
            OctaveSelect::Low => [1, 0],
            OctaveSelect::High => [0, 1],
        }
    }
}

impl Default for OctaveLatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_latch_masks_unwired_lines() {
        let mut matrix = ButtonMatrix::new();
        assert_eq!(matrix.row_latch(), 0xFF);
        matrix.latch_rows(0xF0);
        assert_eq!(matrix.row_latch(), 0x30);
    }

    #[test]
    fn test_column_read_nothing_selected() {
        assert_eq!(read_column_group(0x3F, |_| 0x00), 0xC0);
    }

    #[test]
    fn test_column_read_merges_selected_rows() {
        let rows = |row: usize| match row {
            0 => !0x01u8,
            3 => !0x20u8,
            _ => 0xFF,
        };
        // Rows 0 and 3 selected.
        assert_eq!(read_column_group(0x3F & !0x09, rows), 0xE1);
        // Only row 3.
        assert_eq!(read_column_group(0x3F & !0x08, rows), 0xE0);
    }

    #[test]
    fn test_octave_latch_transitions() {
        let mut latch = OctaveLatch::new();
        assert_eq!(latch.state(), OctaveSelect::High);

        assert_eq!(latch.apply(false, true), OctaveSelect::Low);
        assert_eq!(latch.apply(true, false), OctaveSelect::High);
        assert_eq!(latch.apply(false, false), OctaveSelect::High);
    }

    #[test]
    fn test_octave_latch_holds_on_dual_assert() {
        let mut latch = OctaveLatch::new();
        latch.apply(false, true);
        latch.apply(true, true);
        latch.apply(false, false);
        assert_eq!(latch.state(), OctaveSelect::Low);
    }

    #[test]
    fn test_octave_buttons_active_low() {
        let mut latch = OctaveLatch::new();
        // "0" pressed.
        assert_eq!(latch.buttons_changed(0b10), OctaveSelect::Low);
        assert_eq!(latch.leds(), [1, 0]);
        // Released.
        assert_eq!(latch.buttons_changed(0b11), OctaveSelect::Low);
        // "+1" pressed.
        assert_eq!(latch.buttons_changed(0b01), OctaveSelect::High);
        assert_eq!(latch.leds(), [0, 1]);
        // Both pressed.
        assert_eq!(latch.buttons_changed(0b00), OctaveSelect::High);
    }
}
