//! Demo sweeping the MOD RATE CV and measuring the resulting LFO frequency.
//!
//! This demo shows how to:
//! - Write CVs through the I/O space the way the firmware does
//! - Stand in for the circuit solver's exponential converter
//! - Run virtual time and count LFO edges
//!
//! Run with `RUST_LOG=moog_source::lfo=debug` to see every recompute.

use moog_source::analog::CA3080_VABC;
use moog_source::{AnalogOutput, BenchHost, CvChannel, MemoryBus, Scheduler, SourceMachine};
use std::time::Duration;

/// Crude exponential converter: one octave of LFO rate per volt of CV,
/// 0.5Hz at 0V. Returns the voltage feeding the OTA's Iabc resistor.
fn expo_converter(cv: f32) -> f32 {
    // Iabc for 0.5Hz with the stock components is about 1uA.
    let iabc = 1.0e-6 * 2f32.powf(cv);
    iabc * 10_000.0 + CA3080_VABC
}

fn main() {
    tracing_subscriber::fmt::init();

    println!("Moog Source LFO Sweep");
    println!("=====================\n");

    let mut machine = SourceMachine::new(BenchHost::new());
    machine.reset();

    let window = Duration::from_secs(4);
    for raw in (0..=255u8).step_by(32) {
        // OUT (0x13), A
        machine.io_write(CvChannel::ModRate as u16, raw);
        let cv = machine.cv().voltage(CvChannel::ModRate);
        machine.on_analog_output_changed(AnalogOutput::LfoCv, expo_converter(cv));

        // Everything but the recompute itself is an LFO edge.
        let start = machine.host().queue().now();
        let edges = machine.run_until(start + window).saturating_sub(1);

        let hz = edges as f64 / 2.0 / window.as_secs_f64();
        println!("MOD RATE {:3} ({:5.2}V): {:7.2} Hz", raw, cv, hz);
    }

    println!(
        "\nTotal DAC wait cycles charged: {}",
        -machine.host().total_cycle_adjustment()
    );
}
