//! Settable front-panel input state.
//!
//! [`PanelInputs`] holds what a user is doing to the machine (held keys,
//! pressed buttons, encoder position, trimmer positions) and presents it in
//! hardware polarity through [`InputPorts`].
//!
//! ## Button Matrix Layout
//!
//! Buttons are addressed by `(group, row, column)` with rows 0-5 selected by
//! the row latch and columns 0-5 read back on D0-D5 of the group's port.
//! Which membrane switch sits at which position is up to the firmware.

use super::config::Calibration;
use crate::devices::buttons::{BUTTON_ROWS, MATRIX_LINES};
use crate::devices::encoder::ENCODER_POSITIONS;
use crate::devices::keyboard::{KEYS, KEYS_PER_OCTAVE, OCTAVES};
use crate::devices::ButtonGroup;
use crate::services::{InputPorts, Trimmer};

/// Front-panel input state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelInputs {
    /// Pressed columns per `[group][row]`, bit N = column N.
    buttons: [[u8; BUTTON_ROWS]; 2],
    /// Held keys per octave group.
    keys: [u16; OCTAVES],
    /// Raw octave buttons (active low).
    octave_buttons: u8,
    encoder_position: u8,
    trigger: u8,
    calibration: Calibration,
}

impl Default for PanelInputs {
    fn default() -> Self {
        Self::new()
    }
}

impl PanelInputs {
    /// Idle panel with factory trimmer positions.
    pub fn new() -> Self {
        Self::with_calibration(Calibration::default())
    }

    /// Idle panel with the given trimmer positions.
    pub fn with_calibration(calibration: Calibration) -> Self {
        Self {
            buttons: [[0; BUTTON_ROWS]; 2],
            keys: [0; OCTAVES],
            octave_buttons: 0x03,
            encoder_position: 0,
            trigger: 0,
            calibration,
        }
    }

    fn group_index(group: ButtonGroup) -> usize {
        match group {
            ButtonGroup::A => 0,
            ButtonGroup::B => 1,
        }
    }

    /// Press the button at `row`/`column` of `group`.
    ///
    /// # Panics
    /// Panics in debug builds if `row` or `column` is >= 6.
    pub fn press_button(&mut self, group: ButtonGroup, row: usize, column: usize) {
        debug_assert!(row < BUTTON_ROWS && column < 6, "Button position out of range");
        self.buttons[Self::group_index(group)][row] |= (1 << column) & MATRIX_LINES;
    }

    /// Release the button at `row`/`column` of `group`.
    pub fn release_button(&mut self, group: ButtonGroup, row: usize, column: usize) {
        debug_assert!(row < BUTTON_ROWS && column < 6, "Button position out of range");
        self.buttons[Self::group_index(group)][row] &= !(1 << column);
    }

    /// Release every matrix button.
    pub fn release_all_buttons(&mut self) {
        self.buttons = [[0; BUTTON_ROWS]; 2];
    }

    /// Hold key `key` (0 = bottom C, 36 = top C). Out-of-range keys are
    /// ignored.
    pub fn press_key(&mut self, key: usize) {
        if key < KEYS {
            self.keys[key / KEYS_PER_OCTAVE] |= 1 << (key % KEYS_PER_OCTAVE);
        }
    }

    /// Release key `key`.
    pub fn release_key(&mut self, key: usize) {
        if key < KEYS {
            self.keys[key / KEYS_PER_OCTAVE] &= !(1 << (key % KEYS_PER_OCTAVE));
        }
    }

    /// Release every key.
    pub fn release_all_keys(&mut self) {
        self.keys = [0; OCTAVES];
    }

    /// Set the octave buttons and return the raw (active-low) reading.
    pub fn set_octave_buttons(&mut self, zero_pressed: bool, plus_one_pressed: bool) -> u8 {
        let mut raw = 0x03;
        if zero_pressed {
            raw &= !0x01;
        }
        if plus_one_pressed {
            raw &= !0x02;
        }
        self.octave_buttons = raw;
        raw
    }

    /// Move the encoder to `position` (wrapped to 0..240) and return the
    /// previous position.
    pub fn set_encoder_position(&mut self, position: u8) -> u8 {
        let old = self.encoder_position;
        self.encoder_position = position % ENCODER_POSITIONS;
        old
    }

    /// Drive the external trigger input.
    pub fn set_trigger(&mut self, high: bool) {
        self.trigger = u8::from(high);
    }

    /// Move a trimmer (clamped to 100).
    pub fn set_trimmer(&mut self, trimmer: Trimmer, position: u8) {
        self.calibration.set(trimmer, position);
    }

    /// Current trimmer positions.
    pub fn calibration(&self) -> Calibration {
        self.calibration
    }
}

impl InputPorts for PanelInputs {
    fn button_row(&self, group: ButtonGroup, row: usize) -> u8 {
        match self.buttons[Self::group_index(group)].get(row) {
            Some(pressed) => !pressed,
            None => 0xFF,
        }
    }

    fn keyboard_octave(&self, octave: usize) -> u16 {
        self.keys.get(octave).copied().unwrap_or(0)
    }

    fn octave_buttons(&self) -> u8 {
        self.octave_buttons
    }

    fn encoder_position(&self) -> u8 {
        self.encoder_position
    }

    fn trigger_in(&self) -> u8 {
        self.trigger
    }

    fn trimmer(&self, trimmer: Trimmer) -> u8 {
        self.calibration.get(trimmer)
    }
}
