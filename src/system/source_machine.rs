//! The control board as a whole.
//!
//! [`SourceMachine`] owns every hardware block and a host implementing the
//! collaborator traits. The CPU core drives it through [`MemoryBus`]; the
//! circuit solver and the input layer drive it through the notification
//! methods below; deferred work comes back through [`SourceMachine::dispatch`].

use super::config::SourceConfig;
use super::savestate::SaveState;
use crate::analog::ota_control_current;
use crate::bus::{cv_offset, decode_read, decode_write, MemoryBus, ReadPort, WritePort, UNMAPPED_VALUE};
use crate::devices::contour::{contour_peaked, SLOPE_PROBE};
use crate::devices::cv::{CvEffect, CV_WRITE_WAIT_CYCLES};
use crate::devices::display::{edit_digits, program_digits};
use crate::devices::keyboard::{comparator, key_voltage, resolve_pressed_key, scan_octaves};
use crate::devices::lfo::LfoSchedule;
use crate::devices::output_latch::{latch_a_outputs, latch_b_outputs};
use crate::devices::{
    ButtonGroup, ButtonMatrix, Contour, ContourKind, CvChannel, CvStore, Device, Direction,
    Encoder, FirmwareRom, Lfo, Nvram, OctaveLatch, OctaveSelect,
};
use crate::scheduler::MachineEvent;
use crate::services::{AnalogInput, AnalogOutput, Host, Indicator, Trimmer};
use crate::SourceError;
use std::time::Duration;
use tracing::{debug, trace};

/// Moog Source control board.
///
/// # Examples
///
/// ```rust
/// use moog_source::{AnalogOutput, BenchHost, MemoryBus, SourceMachine};
/// use std::time::Duration;
///
/// let mut machine = SourceMachine::new(BenchHost::new());
/// machine.reset();
///
/// // Hold the bottom key and let the firmware-side comparator see it.
/// machine.host_mut().panel_mut().press_key(0);
/// machine.io_write(0x14, 0x00); // KEYBOARD APPROX = 0V
/// assert_eq!(machine.read(0x6000) & 0x01, 1);
/// machine.io_write(0x14, 0xFF); // KEYBOARD APPROX = 10V
/// assert_eq!(machine.read(0x6000) & 0x01, 0);
///
/// // The solver reports an LFO control voltage; the LFO starts ticking.
/// machine.on_analog_output_changed(AnalogOutput::LfoCv, -14.0);
/// machine.run_until(Duration::from_secs(1));
/// assert!(machine.lfo().timer().is_armed());
/// ```
pub struct SourceMachine<H: Host> {
    host: H,
    config: SourceConfig,
    firmware: FirmwareRom,
    nvram: Nvram,
    cv: CvStore,
    contours: [Contour; 2],
    lfo: Lfo,
    buttons: ButtonMatrix,
    octave: OctaveLatch,
    encoder: Encoder,
}

impl<H: Host> SourceMachine<H> {
    /// Stock machine around `host`.
    pub fn new(host: H) -> Self {
        Self::with_config(host, SourceConfig::default())
    }

    /// Machine with an explicit configuration.
    pub fn with_config(host: H, config: SourceConfig) -> Self {
        Self {
            host,
            config,
            firmware: FirmwareRom::new(),
            nvram: Nvram::new(),
            cv: CvStore::new(),
            contours: [
                Contour::new(ContourKind::Filter),
                Contour::new(ContourKind::Loudness),
            ],
            lfo: Lfo::new(),
            buttons: ButtonMatrix::new(),
            octave: OctaveLatch::new(),
            encoder: Encoder::new(),
        }
    }

    /// The host.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable host, for driving inputs.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Tear down the machine and return the host.
    pub fn into_host(self) -> H {
        self.host
    }

    /// Machine configuration.
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Install a firmware image.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::FirmwareSize`] unless `image` is exactly 4KB.
    pub fn load_firmware(&mut self, image: &[u8]) -> Result<(), SourceError> {
        self.firmware.load(image)?;
        debug!(
            target: "moog_source",
            "Loaded {} ({})",
            self.config.firmware.rom_name(),
            self.config.firmware.description()
        );
        Ok(())
    }

    /// Restore persisted NVRAM contents.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::NvramSize`] unless `image` is exactly 1KB.
    pub fn load_nvram(&mut self, image: &[u8]) -> Result<(), SourceError> {
        self.nvram.load(image)
    }

    /// Firmware ROM.
    pub fn firmware(&self) -> &FirmwareRom {
        &self.firmware
    }

    /// Battery-backed RAM, for persisting.
    pub fn nvram(&self) -> &Nvram {
        &self.nvram
    }

    /// CV table.
    pub fn cv(&self) -> &CvStore {
        &self.cv
    }

    /// Driver state of one contour.
    pub fn contour(&self, kind: ContourKind) -> &Contour {
        &self.contours[kind.index()]
    }

    /// LFO driver state.
    pub fn lfo(&self) -> &Lfo {
        &self.lfo
    }

    /// Button row latch.
    pub fn buttons(&self) -> &ButtonMatrix {
        &self.buttons
    }

    /// Octave select latch.
    pub fn octave(&self) -> &OctaveLatch {
        &self.octave
    }

    /// Encoder latch.
    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    /// Power-on/reset sequence: show the selected octave, bring both contours
    /// and the LFO in line with their control currents, and push the trimmer
    /// positions to the solver.
    pub fn reset(&mut self) {
        debug!(target: "moog_source", "Machine reset");
        self.update_octave_leds();
        self.update_contour(ContourKind::Filter);
        self.update_contour(ContourKind::Loudness);
        self.update_lfo_timer();
        for trimmer in Trimmer::ALL {
            self.push_trimmer(trimmer);
        }
    }

    // ---- Bus handlers ----

    /// DAC write on I/O port `port`.
    ///
    /// Every write stalls the CPU for the DAC and sample-and-hold settling
    /// time, whether or not a channel is behind the port.
    pub fn cv_write(&mut self, port: u16, data: u8) {
        if !self.host.side_effects_disabled() {
            self.host.adjust_cycle_budget(-CV_WRITE_WAIT_CYCLES);
        }

        let Some(change) = self.cv.write(cv_offset(port), data) else {
            return;
        };
        match change.effect {
            CvEffect::LfoRate => self.host.set_analog_input(AnalogInput::LfoRate, change.volts),
            CvEffect::ContourRate(kind) => self
                .host
                .set_analog_input(AnalogInput::ContourRate(kind), change.volts),
            CvEffect::ContourLevel(kind) => {
                self.host.synchronize(MachineEvent::UpdateContour(kind))
            }
            CvEffect::None => {}
        }
    }

    /// Keyboard status port (0x6000).
    ///
    /// | Bit | Source                                  |
    /// |-----|-----------------------------------------|
    /// | D0  | keyboard comparator                     |
    /// | D1  | filter contour peaked (active low)      |
    /// | D2  | loudness contour peaked (active low)    |
    /// | D3  | octave "+1" selected                    |
    /// | D4  | cassette in (not modeled, reads 1)      |
    /// | D5  | LFO square wave, inverted               |
    /// | D6  | trigger input                           |
    /// | D7  | not connected, reads 1                  |
    pub fn keyboard_status(&self) -> u8 {
        let d0 = u8::from(comparator(
            self.keyboard_voltage(),
            self.cv.voltage(CvChannel::KeyboardApprox),
        ));
        let d1 = u8::from(!self.contour_peaked(ContourKind::Filter));
        let d2 = u8::from(!self.contour_peaked(ContourKind::Loudness));
        let d3 = u8::from(self.octave.is_high());
        let d4 = 1;
        let d5 = u8::from(!self.lfo.state());
        let d6 = self.host.trigger_in() & 0x01;
        let d7 = 1;

        (d7 << 7) | (d6 << 6) | (d5 << 5) | (d4 << 4) | (d3 << 3) | (d2 << 2) | (d1 << 1) | d0
    }

    /// Button matrix column group read.
    pub fn buttons_read(&self, group: ButtonGroup) -> u8 {
        self.buttons.read(group, &self.host)
    }

    /// Encoder direction read; acknowledges the interrupt unless the CPU is
    /// being probed.
    pub fn encoder_read(&mut self) -> u8 {
        let acknowledge = !self.host.side_effects_disabled();
        let value = self.encoder.read(acknowledge);
        if acknowledge {
            self.host.set_irq_line(false);
        }
        value
    }

    fn edit_latch_write(&mut self, data: u8) {
        let digits = edit_digits(data);
        self.host.set_indicator(Indicator::EditDigit(0), digits[0]);
        self.host.set_indicator(Indicator::EditDigit(1), digits[1]);
    }

    fn program_latch_write(&mut self, data: u8) {
        let digits = program_digits(data);
        self.host.set_indicator(Indicator::ProgramDigit(0), digits[0]);
        self.host.set_indicator(Indicator::ProgramDigit(1), digits[1]);
    }

    fn output_latch_a_write(&mut self, data: u8) {
        for (indicator, value) in latch_a_outputs(data) {
            self.host.set_indicator(indicator, value);
        }
    }

    fn output_latch_b_write(&mut self, data: u8) {
        for (indicator, value) in latch_b_outputs(data) {
            self.host.set_indicator(indicator, value);
        }
    }

    // ---- Analog ----

    /// Solver notification: an exponential converter output moved.
    pub fn on_analog_output_changed(&mut self, output: AnalogOutput, volts: f32) {
        let current = ota_control_current(volts);
        match output {
            AnalogOutput::ContourCv(kind) => self.on_contour_current_changed(kind, current),
            AnalogOutput::LfoCv => self.on_lfo_current_changed(current),
        }
    }

    /// New Iabc for a contour OTA. The recompute runs synchronized.
    pub fn on_contour_current_changed(&mut self, kind: ContourKind, amps: f32) {
        self.contours[kind.index()].set_control_current(amps);
        self.host.synchronize(MachineEvent::UpdateContour(kind));
        debug!(
            target: "moog_source::contour",
            "{} contour CC: {} uA, rate CV: {}, range trimmer: {}",
            kind.name(),
            amps * 1e6,
            self.cv.voltage(kind.rate_channel()),
            self.host.trimmer(match kind {
                ContourKind::Filter => Trimmer::FilterContourRange,
                ContourKind::Loudness => Trimmer::LoudnessContourRange,
            })
        );
    }

    /// New Iabc for the LFO OTA. The recompute runs synchronized.
    pub fn on_lfo_current_changed(&mut self, amps: f32) {
        self.lfo.set_control_current(amps);
        self.host.synchronize(MachineEvent::UpdateLfoTimer);
        debug!(
            target: "moog_source::lfo",
            "LFO CC: {} uA, rate CV: {}, range trimmer: {}",
            amps * 1e6,
            self.cv.voltage(CvChannel::ModRate),
            self.host.trimmer(Trimmer::LfoRange)
        );
    }

    /// Whether a contour's peak detector has tripped.
    pub fn contour_peaked(&self, kind: ContourKind) -> bool {
        let now = self.host.now();
        let now_v = self.host.contour_voltage(kind, now);
        let future_v = self.host.contour_voltage(kind, now + SLOPE_PROBE);
        contour_peaked(now_v, future_v)
    }

    /// Lowest key currently held.
    pub fn pressed_key(&self) -> Option<u8> {
        resolve_pressed_key(scan_octaves(&self.host))
    }

    /// Voltage the keyboard ladder presents to the comparator.
    pub fn keyboard_voltage(&self) -> f32 {
        key_voltage(self.pressed_key())
    }

    fn update_contour(&mut self, kind: ContourKind) {
        let level_cv = self.cv.voltage(kind.level_channel());
        if let Some(update) = self.contours[kind.index()].recompute(level_cv) {
            self.host.set_contour_resistance(kind, update.effective_r);
            self.host.set_contour_target(kind, update.target_v);
        }
    }

    fn update_lfo_timer(&mut self) {
        let now = self.host.now();
        self.host.cancel_lfo_ticks();
        if let LfoSchedule::Armed {
            first_tick,
            generation,
            ..
        } = self.lfo.recompute(now)
        {
            self.host
                .schedule_at(first_tick, MachineEvent::LfoTick { generation });
        }
    }

    fn lfo_tick(&mut self, generation: u64) {
        let now = self.host.now();
        if let Some(next) = self.lfo.tick(generation, now) {
            self.host
                .set_indicator(Indicator::ModRateLed, self.lfo.mod_rate_led());
            self.host
                .schedule_at(next, MachineEvent::LfoTick { generation });
        }
    }

    // ---- Front panel ----

    /// The octave buttons changed. Reads their new state from the host.
    pub fn octave_buttons_changed(&mut self) -> OctaveSelect {
        let raw = self.host.octave_buttons();
        let state = self.octave.buttons_changed(raw);
        self.update_octave_leds();
        state
    }

    /// The encoder moved away from `old`. Reads the new position from the
    /// host, latches the direction and raises the interrupt.
    pub fn encoder_moved(&mut self, old: u8) -> Direction {
        let new = self.host.encoder_position();
        let direction = self.encoder.moved(old, new);
        self.host.set_irq_line(true);
        direction
    }

    /// A calibration trimmer moved.
    pub fn trimmer_changed(&mut self, trimmer: Trimmer) {
        self.push_trimmer(trimmer);
    }

    fn push_trimmer(&mut self, trimmer: Trimmer) {
        let position = self.host.trimmer(trimmer);
        self.host
            .set_analog_input(trimmer.analog_input(), f32::from(position));
    }

    fn update_octave_leds(&mut self) {
        let leds = self.octave.leds();
        self.host.set_indicator(Indicator::OctaveLed(0), leds[0]);
        self.host.set_indicator(Indicator::OctaveLed(1), leds[1]);
    }

    // ---- Event loop ----

    /// Run one piece of deferred work.
    pub fn dispatch(&mut self, event: MachineEvent) {
        trace!(target: "moog_source", "Dispatch {:?} at {:?}", event, self.host.now());
        match event {
            MachineEvent::UpdateContour(kind) => self.update_contour(kind),
            MachineEvent::UpdateLfoTimer => self.update_lfo_timer(),
            MachineEvent::LfoTick { generation } => self.lfo_tick(generation),
        }
    }

    /// Dispatch every event due up to `deadline`, advancing virtual time.
    /// Returns the number of events run.
    pub fn run_until(&mut self, deadline: Duration) -> usize {
        let mut count = 0;
        while let Some(event) = self.host.next_due(deadline) {
            self.dispatch(event);
            count += 1;
        }
        count
    }

    /// Dispatch everything due at the current virtual time.
    pub fn run_pending(&mut self) -> usize {
        let now = self.host.now();
        self.run_until(now)
    }

    // ---- Save states ----

    /// Capture the machine's internal state.
    pub fn save_state(&self) -> SaveState {
        SaveState {
            octave_hi: self.octave.is_high(),
            encoder_incr: self.encoder.direction() == Direction::Increment,
            encoder_irq: self.encoder.irq_pending(),
            lfo_state: self.lfo.state(),
            button_row_latch: self.buttons.row_latch(),
            lfo_cc: self.lfo.control_current(),
            contour_cc: [
                self.contours[0].control_current(),
                self.contours[1].control_current(),
            ],
            cv: self.cv.snapshot(),
            nvram: self.nvram.contents().to_vec(),
        }
    }

    /// Restore a captured state.
    ///
    /// Indicators and the interrupt line are re-projected at once. Both
    /// contours and the LFO are re-derived through the scheduler. The LFO
    /// timer is stopped first, so the LFO starts over as it does from rest
    /// no matter what the machine was doing before.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::NvramSize`] if the state's NVRAM image has the
    /// wrong size; the machine is left untouched.
    pub fn load_state(&mut self, state: &SaveState) -> Result<(), SourceError> {
        self.nvram.load(&state.nvram)?;

        self.octave.set_state(if state.octave_hi {
            OctaveSelect::High
        } else {
            OctaveSelect::Low
        });
        let direction = if state.encoder_incr {
            Direction::Increment
        } else {
            Direction::Decrement
        };
        self.encoder.restore(direction, state.encoder_irq);
        self.lfo.set_state(state.lfo_state);
        self.lfo.set_control_current(state.lfo_cc);
        self.buttons.set_row_latch(state.button_row_latch);
        for (contour, &cc) in self.contours.iter_mut().zip(state.contour_cc.iter()) {
            contour.set_control_current(cc);
        }
        self.cv.restore(state.cv);
        self.lfo.stop_timer();
        self.host.cancel_lfo_ticks();

        self.update_octave_leds();
        self.host
            .set_indicator(Indicator::ModRateLed, self.lfo.mod_rate_led());
        self.host.set_irq_line(self.encoder.irq_pending());
        for kind in ContourKind::ALL {
            self.host.synchronize(MachineEvent::UpdateContour(kind));
        }
        self.host.synchronize(MachineEvent::UpdateLfoTimer);
        debug!(target: "moog_source", "State restored");
        Ok(())
    }
}

impl<H: Host> MemoryBus for SourceMachine<H> {
    fn read(&mut self, addr: u16) -> u8 {
        match decode_read(addr) {
            Some((ReadPort::Firmware, offset)) => self.firmware.read(offset),
            Some((ReadPort::Nvram, offset)) => self.nvram.read(offset),
            Some((ReadPort::KeyboardStatus, _)) => self.keyboard_status(),
            Some((ReadPort::ButtonsA, _)) => self.buttons_read(ButtonGroup::A),
            Some((ReadPort::ButtonsB, _)) => self.buttons_read(ButtonGroup::B),
            Some((ReadPort::Encoder, _)) => self.encoder_read(),
            None => UNMAPPED_VALUE,
        }
    }

    fn write(&mut self, addr: u16, value: u8) {
        match decode_write(addr) {
            Some((WritePort::EditLatch, _)) => self.edit_latch_write(value),
            Some((WritePort::Nvram, offset)) => self.nvram.write(offset, value),
            Some((WritePort::OutputLatchA, _)) => self.output_latch_a_write(value),
            Some((WritePort::OutputLatchB, _)) => self.output_latch_b_write(value),
            Some((WritePort::Cassette, _)) => {
                trace!(target: "moog_source", "Cassette write {:02X} ignored", value)
            }
            Some((WritePort::ButtonRowLatch, _)) => self.buttons.latch_rows(value),
            Some((WritePort::ProgramLatch, _)) => self.program_latch_write(value),
            None => {}
        }
    }

    fn io_write(&mut self, port: u16, value: u8) {
        self.cv_write(port, value);
    }

    fn irq_active(&self) -> bool {
        self.encoder.irq_pending()
    }
}

impl<H: Host + std::fmt::Debug> std::fmt::Debug for SourceMachine<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("SourceMachine")
            .field("host", &self.host)
            .field("cv", &self.cv)
            .field("contours", &self.contours)
            .field("lfo", &self.lfo)
            .field("buttons", &self.buttons)
            .field("octave", &self.octave)
            .field("encoder", &self.encoder)
            .finish()
    }
}
