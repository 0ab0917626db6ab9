//! Integration tests for keyboard scanning through the comparator bit.

use moog_source::devices::keyboard::KEYS;
use moog_source::{BenchHost, CvChannel, MemoryBus, SourceMachine};

const KEYBOARD_STATUS: u16 = 0x6000;
const COMPARATOR_BIT: u8 = 0x01;

fn setup_machine() -> SourceMachine<BenchHost> {
    let mut machine = SourceMachine::new(BenchHost::new());
    machine.reset();
    machine.host_mut().clear_logs();
    machine
}

/// Successive-approximation search the way the firmware does it: the
/// largest DAC code still at or below the key voltage.
fn approximate(machine: &mut SourceMachine<BenchHost>) -> u8 {
    let mut code = 0u8;
    for bit in (0..8).rev() {
        let trial = code | (1 << bit);
        machine.io_write(CvChannel::KeyboardApprox as u16, trial);
        if machine.read(KEYBOARD_STATUS) & COMPARATOR_BIT != 0 {
            code = trial;
        }
    }
    code
}

#[test]
fn test_lowest_key_wins() {
    let mut machine = setup_machine();
    machine.host_mut().panel_mut().press_key(7);
    machine.host_mut().panel_mut().press_key(3);
    assert_eq!(machine.pressed_key(), Some(3));

    machine.host_mut().panel_mut().release_key(3);
    assert_eq!(machine.pressed_key(), Some(7));
}

#[test]
fn test_no_key_approximates_to_zero() {
    let mut machine = setup_machine();
    assert_eq!(machine.pressed_key(), None);
    assert_eq!(approximate(&mut machine), 0);
}

#[test]
fn test_approximation_rises_with_key() {
    let mut machine = setup_machine();
    let mut previous = 0u8;

    for key in 0..KEYS {
        machine.host_mut().panel_mut().release_all_keys();
        machine.host_mut().panel_mut().press_key(key);

        let code = approximate(&mut machine);
        assert!(code > previous, "key {} gave code {} after {}", key, code, previous);
        previous = code;
    }
}

#[test]
fn test_top_c_is_octave_four() {
    let mut machine = setup_machine();
    machine.host_mut().panel_mut().press_key(36);
    machine.host_mut().panel_mut().press_key(35);
    assert_eq!(machine.pressed_key(), Some(35));

    machine.host_mut().panel_mut().release_key(35);
    assert_eq!(machine.pressed_key(), Some(36));
}

#[test]
fn test_comparator_tracks_approx_channel() {
    let mut machine = setup_machine();
    machine.host_mut().panel_mut().press_key(12);
    let key_v = machine.keyboard_voltage();

    // Largest code at or below the key voltage, and the one above it.
    let below = (key_v * 25.5).floor() as u8;
    machine.io_write(CvChannel::KeyboardApprox as u16, below);
    assert_eq!(machine.read(KEYBOARD_STATUS) & COMPARATOR_BIT, 1);
    machine.io_write(CvChannel::KeyboardApprox as u16, below + 1);
    assert_eq!(machine.read(KEYBOARD_STATUS) & COMPARATOR_BIT, 0);
}
