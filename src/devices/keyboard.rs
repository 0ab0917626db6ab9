//! Keyboard voltage ladder and comparator.
//!
//! The 37 keys tap a resistor ladder fed from an 8.24V reference. Pressing
//! a key forms a divider whose output, reduced by R77/R76, goes to comparator
//! U31A. The other comparator input is the KEYBOARD APPROX CV, so the
//! firmware finds the pressed key with a successive-approximation search:
//! it sets a CV, reads the comparator bit, halves the interval, repeats.
//!
//! The ladder gives priority to the lowest held key.

use crate::analog::{res_k, res_r, voltage_divider};
use crate::services::InputPorts;
use tracing::trace;

/// Number of scanned keyboard groups.
pub const OCTAVES: usize = 4;

/// Keys in a full octave group.
pub const KEYS_PER_OCTAVE: usize = 12;

/// Keys wired in each group; the last group only carries the top C.
pub const OCTAVE_KEYS: [usize; OCTAVES] = [KEYS_PER_OCTAVE, KEYS_PER_OCTAVE, KEYS_PER_OCTAVE, 1];

/// Total number of keys.
pub const KEYS: usize = 3 * KEYS_PER_OCTAVE + 1;

/// Ladder reference voltage.
pub const KEYBOARD_VREF: f32 = 8.24;

/// Lowest key held in the four octave groups, numbered 0 (bottom C) to 36.
///
/// Bits beyond the keys wired in a group are ignored.
///
/// # Examples
///
/// ```rust
/// use moog_source::devices::keyboard::resolve_pressed_key;
///
/// // Keys 3 and 7 held: the lower one wins.
/// assert_eq!(resolve_pressed_key([(1 << 3) | (1 << 7), 0, 0, 0]), Some(3));
/// assert_eq!(resolve_pressed_key([0, 0, 0, 1]), Some(36));
/// assert_eq!(resolve_pressed_key([0; 4]), None);
/// ```
pub fn resolve_pressed_key(octaves: [u16; OCTAVES]) -> Option<u8> {
    octaves
        .iter()
        .zip(OCTAVE_KEYS)
        .enumerate()
        .find_map(|(octave, (&keys, wired))| {
            (0..wired)
                .find(|&key| keys & (1 << key) != 0)
                .map(|key| (octave * KEYS_PER_OCTAVE + key) as u8)
        })
}

/// Read the four octave groups from the input ports.
pub fn scan_octaves<I: InputPorts + ?Sized>(inputs: &I) -> [u16; OCTAVES] {
    std::array::from_fn(|octave| inputs.keyboard_octave(octave))
}

/// Voltage presented to the comparator for `key`, 0V when nothing is held.
pub fn key_voltage(key: Option<u8>) -> f32 {
    let Some(key) = key else {
        return 0.0;
    };
    let rkey = res_r(100.0);
    let r74 = res_r(150.0);
    let lower_r = r74 + f32::from(key) * rkey;
    let upper_r = (KEYS as f32 - f32::from(key) - 1.0) * rkey;
    let v = KEYBOARD_VREF * voltage_divider(upper_r, lower_r);
    let kb_voltage = v * voltage_divider(res_k(2.2), res_k(220.0));
    trace!(target: "moog_source::keyboard", "Key {} - {} - {}", key, v, kb_voltage);
    kb_voltage
}

/// Comparator U31A: high when the key voltage reaches the approximation CV.
pub fn comparator(key_v: f32, approx_cv: f32) -> bool {
    key_v >= approx_cv
}
