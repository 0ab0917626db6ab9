//! Collaborator traits the control core is driven through.
//!
//! The core never owns a CPU, a circuit solver or a UI. It talks to them
//! through the traits below, all implemented by a single host object passed
//! to [`SourceMachine`](crate::SourceMachine). [`BenchHost`](crate::BenchHost)
//! is a recording implementation used by the tests and demos.
//!
//! # Design
//!
//! - **CpuControl**: cycle budget and interrupt line of the Z80 core
//! - **CircuitSolver**: analog inputs in, contour resistance/target in,
//!   contour voltages (present and projected) out
//! - **InputPorts**: raw switch, key, encoder and trimmer state
//! - **Indicators**: LEDs, 7-segment digits and routing flags
//! - **Scheduler**: virtual time and synchronized callbacks

use crate::devices::{ButtonGroup, ContourKind};
use crate::scheduler::MachineEvent;
use std::time::Duration;

/// Control surface of the CPU core the firmware runs on.
pub trait CpuControl {
    /// Add `delta` cycles to the CPU's remaining budget. Wait states are
    /// charged as negative deltas.
    fn adjust_cycle_budget(&mut self, delta: i32);

    /// Drive the maskable interrupt line.
    fn set_irq_line(&mut self, asserted: bool);

    /// True while the CPU is being probed by a debugger. Accesses made in
    /// this mode must not charge wait states or acknowledge interrupts.
    fn side_effects_disabled(&self) -> bool {
        false
    }
}

/// Solver inputs driven by the control core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalogInput {
    /// Rate CV feeding a contour's exponential converter.
    ContourRate(ContourKind),
    /// Range trimmer of a contour's exponential converter.
    ContourRange(ContourKind),
    /// MOD RATE CV feeding the LFO's exponential converter.
    LfoRate,
    /// Range trimmer of the LFO's exponential converter.
    LfoRange,
}

/// Solver outputs the control core listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalogOutput {
    /// Voltage driving a contour OTA's Iabc resistor.
    ContourCv(ContourKind),
    /// Voltage driving the LFO OTA's Iabc resistor.
    LfoCv,
}

/// External analog circuit simulation.
pub trait CircuitSolver {
    /// Set one of the solver's input voltages.
    fn set_analog_input(&mut self, input: AnalogInput, volts: f32);

    /// Program the effective charge resistance (ohms) of a contour.
    fn set_contour_resistance(&mut self, contour: ContourKind, ohms: f32);

    /// Program the voltage a contour charges toward.
    fn set_contour_target(&mut self, contour: ContourKind, volts: f32);

    /// Contour output voltage at `at`. Times after the present are
    /// projections assuming no further changes.
    fn contour_voltage(&self, contour: ContourKind, at: Duration) -> f32;
}

/// Calibration trimmers on the contour and LFO exponential converters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trimmer {
    /// Filter contour range.
    FilterContourRange,
    /// Loudness contour range.
    LoudnessContourRange,
    /// LFO range.
    LfoRange,
}

impl Trimmer {
    /// All trimmers, in the order they are pushed to the solver.
    pub const ALL: [Trimmer; 3] = [
        Trimmer::FilterContourRange,
        Trimmer::LoudnessContourRange,
        Trimmer::LfoRange,
    ];

    /// Solver input the trimmer position is fed into.
    pub fn analog_input(self) -> AnalogInput {
        match self {
            Trimmer::FilterContourRange => AnalogInput::ContourRange(ContourKind::Filter),
            Trimmer::LoudnessContourRange => AnalogInput::ContourRange(ContourKind::Loudness),
            Trimmer::LfoRange => AnalogInput::LfoRange,
        }
    }
}

/// Raw input state: switch matrices, keyboard, encoder, trigger, trimmers.
///
/// Every reading is in hardware polarity. Button rows and octave buttons are
/// active-low; keyboard octaves report one set bit per held key.
pub trait InputPorts {
    /// Raw reading of button row `row` (0..6) of `group`, active-low.
    fn button_row(&self, group: ButtonGroup, row: usize) -> u8;

    /// Held keys of keyboard octave `octave` (0..4), bit `n` = key `n`.
    fn keyboard_octave(&self, octave: usize) -> u16;

    /// Octave "0" (bit 0) and "+1" (bit 1) buttons, active-low.
    fn octave_buttons(&self) -> u8;

    /// Encoder position, 0..240.
    fn encoder_position(&self) -> u8;

    /// External trigger input; bit 0 is the gate.
    fn trigger_in(&self) -> u8;

    /// Trimmer position, 0..=100.
    fn trimmer(&self, trimmer: Trimmer) -> u8;
}

/// Front-panel indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    /// Octave LED 0 ("0") or 1 ("+1").
    OctaveLed(u8),
    /// LED blinking with the LFO.
    ModRateLed,
    /// Program number display digit.
    ProgramDigit(u8),
    /// Parameter edit display digit.
    EditDigit(u8),
    /// Edit mode LED.
    EditLed,
    /// Keyboard tracking amount (0 off, 1 half, 2 full).
    KeyboardTracking,
    /// Oscillator waveform select, indexed from 0.
    OscWaveform(u8),
    /// Oscillator sync.
    Sync,
    /// LFO routed to the filter.
    LfoToFilter,
    /// LFO routed to the oscillators.
    LfoToOsc,
    /// LFO shape (0 triangle, 1 square).
    LfoShape,
    /// Trigger output.
    TriggerOut,
}

/// Sink for indicator state. Values are raw: 0/1 for LEDs and flags,
/// segment patterns for digits.
pub trait Indicators {
    /// Update one indicator.
    fn set_indicator(&mut self, indicator: Indicator, value: u8);
}

/// Virtual-time scheduler shared with the CPU and solver.
pub trait Scheduler {
    /// Current virtual time.
    fn now(&self) -> Duration;

    /// Queue `event` at the current virtual time, after anything already
    /// queued for that instant.
    fn synchronize(&mut self, event: MachineEvent);

    /// Queue `event` at absolute virtual time `at`.
    fn schedule_at(&mut self, at: Duration, event: MachineEvent);

    /// Drop every queued [`MachineEvent::LfoTick`], whatever its generation.
    fn cancel_lfo_ticks(&mut self);

    /// Pop the next event due at or before `deadline`, advancing virtual time
    /// to its timestamp.
    fn next_due(&mut self, deadline: Duration) -> Option<MachineEvent>;
}

/// Everything a [`SourceMachine`](crate::SourceMachine) needs from its
/// environment.
pub trait Host: CpuControl + CircuitSolver + InputPorts + Indicators + Scheduler {}

impl<T> Host for T where T: CpuControl + CircuitSolver + InputPorts + Indicators + Scheduler {}
