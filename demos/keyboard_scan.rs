//! Demo of the firmware's keyboard scan.
//!
//! This demo shows how to:
//! - Hold keys on the panel
//! - Find the lowest held key with a successive-approximation search on
//!   the KEYBOARD APPROX channel and the comparator bit at 0x6000
//! - Decode the result back into a key number

use moog_source::devices::keyboard::KEYS;
use moog_source::{BenchHost, CvChannel, MemoryBus, SourceMachine};

const KEYBOARD_STATUS: u16 = 0x6000;

/// Binary search for the largest DAC code at or below the key voltage.
fn approximate(machine: &mut SourceMachine<BenchHost>) -> u8 {
    let mut code = 0u8;
    for bit in (0..8).rev() {
        let trial = code | (1 << bit);
        machine.io_write(CvChannel::KeyboardApprox as u16, trial);
        if machine.read(KEYBOARD_STATUS) & 0x01 != 0 {
            code = trial;
        }
    }
    code
}

fn main() {
    tracing_subscriber::fmt::init();

    println!("Moog Source Keyboard Scan");
    println!("=========================\n");

    let mut machine = SourceMachine::new(BenchHost::new());
    machine.reset();

    // Calibrate: the code each key settles on.
    let mut table = Vec::with_capacity(KEYS);
    for key in 0..KEYS {
        machine.host_mut().panel_mut().release_all_keys();
        machine.host_mut().panel_mut().press_key(key);
        table.push(approximate(&mut machine));
    }
    println!("Key codes: {:?}\n", table);

    // A chord: the lowest note wins.
    machine.host_mut().panel_mut().release_all_keys();
    for key in [19, 12, 28] {
        machine.host_mut().panel_mut().press_key(key);
    }
    let code = approximate(&mut machine);
    let key = table.iter().position(|&c| c == code);
    println!("Chord C-G-E scanned as code {} -> key {:?}", code, key);

    let cycles = -machine.host().total_cycle_adjustment();
    println!(
        "DAC wait states: {} cycles ({:?} at 2MHz)",
        cycles,
        machine.config().cycles_to_duration(cycles as u64)
    );
}
