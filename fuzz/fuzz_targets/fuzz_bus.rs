//! Fuzz target for bus traffic and solver notifications.
//!
//! This target drives a machine with arbitrary reads, writes, DAC writes,
//! panel events and analog notifications interleaved with virtual time, to
//! find panics in the drivers and the scheduler.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use moog_source::{
    AnalogOutput, BenchHost, ContourKind, InputPorts, MemoryBus, Scheduler, SourceMachine,
    Trimmer,
};
use std::time::Duration;

/// One stimulus applied to the machine
#[derive(Debug, Arbitrary)]
enum FuzzOp {
    /// Memory read
    Read(u16),
    /// Memory write
    Write(u16, u8),
    /// I/O write (DAC)
    IoWrite(u16, u8),
    /// Probe-mode toggle
    Probe(bool),
    /// Encoder moved to a position
    Encoder(u8),
    /// Octave button raw reading
    OctaveButtons(u8),
    /// Key pressed or released
    Key { key: u8, down: bool },
    /// Contour converter output in volts
    ContourCv { loudness: bool, volts: f32 },
    /// LFO converter output in volts
    LfoCv(f32),
    /// Trimmer moved
    Trimmer { which: u8, position: u8 },
    /// Advance virtual time by microseconds
    Run(u16),
}

fuzz_target!(|ops: Vec<FuzzOp>| {
    let mut machine = SourceMachine::new(BenchHost::new());
    machine.reset();

    for op in ops.into_iter().take(512) {
        match op {
            FuzzOp::Read(addr) => {
                machine.read(addr);
            }
            FuzzOp::Write(addr, value) => machine.write(addr, value),
            FuzzOp::IoWrite(port, value) => machine.io_write(port, value),
            FuzzOp::Probe(on) => machine.host_mut().set_probing(on),
            FuzzOp::Encoder(position) => {
                let old = machine.host_mut().panel_mut().set_encoder_position(position);
                machine.encoder_moved(old);
            }
            FuzzOp::OctaveButtons(raw) => {
                machine
                    .host_mut()
                    .panel_mut()
                    .set_octave_buttons(raw & 0x01 == 0, raw & 0x02 == 0);
                machine.octave_buttons_changed();
            }
            FuzzOp::Key { key, down } => {
                let panel = machine.host_mut().panel_mut();
                if down {
                    panel.press_key(key as usize);
                } else {
                    panel.release_key(key as usize);
                }
            }
            FuzzOp::ContourCv { loudness, volts } => {
                let kind = if loudness {
                    ContourKind::Loudness
                } else {
                    ContourKind::Filter
                };
                machine.on_analog_output_changed(AnalogOutput::ContourCv(kind), volts);
            }
            FuzzOp::LfoCv(volts) => machine.on_analog_output_changed(AnalogOutput::LfoCv, volts),
            FuzzOp::Trimmer { which, position } => {
                let trimmer = Trimmer::ALL[which as usize % Trimmer::ALL.len()];
                machine.host_mut().panel_mut().set_trimmer(trimmer, position);
                machine.trimmer_changed(trimmer);
            }
            FuzzOp::Run(micros) => {
                let deadline = machine.host().now() + Duration::from_micros(micros.into());
                // Very fast LFO rates queue an edge per nanosecond; bound the work.
                let mut budget = 10_000;
                while budget > 0 {
                    match machine.host_mut().next_due(deadline) {
                        Some(event) => machine.dispatch(event),
                        None => break,
                    }
                    budget -= 1;
                }
            }
        }

        // The interrupt line always mirrors the encoder flip-flop.
        assert_eq!(machine.host().irq_line(), machine.irq_active());
    }
});
