//! Recording host for tests, demos and fuzzing.
//!
//! [`BenchHost`] implements every collaborator trait with the simplest model
//! that still exercises the core: an [`EventQueue`] for virtual time,
//! [`PanelInputs`] for the front panel, one [`RcEnvelope`] per contour for the
//! solver side, and logs of everything the core asked for.
//!
//! The exponential converters are not modeled. Solver notifications are
//! delivered by calling
//! [`SourceMachine::on_analog_output_changed`](crate::SourceMachine::on_analog_output_changed)
//! directly.

use super::config::SourceConfig;
use super::panel_inputs::PanelInputs;
use crate::analog::RcEnvelope;
use crate::devices::contour::contour_c;
use crate::devices::{ButtonGroup, ContourKind};
use crate::scheduler::{EventQueue, MachineEvent};
use crate::services::{
    AnalogInput, CircuitSolver, CpuControl, Indicator, Indicators, InputPorts, Scheduler, Trimmer,
};
use std::collections::HashMap;
use std::time::Duration;

/// Host that records every interaction with the core.
#[derive(Debug)]
pub struct BenchHost {
    queue: EventQueue,
    panel: PanelInputs,
    contours: [RcEnvelope; 2],
    probing: bool,
    cycle_adjustments: Vec<i32>,
    irq_line: bool,
    irq_history: Vec<bool>,
    analog_inputs: Vec<(AnalogInput, f32)>,
    resistances: Vec<(ContourKind, f32)>,
    targets: Vec<(ContourKind, f32)>,
    indicators: HashMap<Indicator, u8>,
    synchronized: Vec<MachineEvent>,
}

impl Default for BenchHost {
    fn default() -> Self {
        Self::new()
    }
}

impl BenchHost {
    /// Host for the stock machine.
    pub fn new() -> Self {
        Self::from_config(&SourceConfig::default())
    }

    /// Host with the trimmer positions of `config`.
    pub fn from_config(config: &SourceConfig) -> Self {
        Self {
            queue: EventQueue::new(),
            panel: PanelInputs::with_calibration(config.calibration),
            contours: [RcEnvelope::new(contour_c()), RcEnvelope::new(contour_c())],
            probing: false,
            cycle_adjustments: Vec::new(),
            irq_line: false,
            irq_history: Vec::new(),
            analog_inputs: Vec::new(),
            resistances: Vec::new(),
            targets: Vec::new(),
            indicators: HashMap::new(),
            synchronized: Vec::new(),
        }
    }

    /// Front-panel inputs.
    pub fn panel(&self) -> &PanelInputs {
        &self.panel
    }

    /// Mutable front-panel inputs.
    pub fn panel_mut(&mut self) -> &mut PanelInputs {
        &mut self.panel
    }

    /// Event queue.
    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// Mutable event queue.
    pub fn queue_mut(&mut self) -> &mut EventQueue {
        &mut self.queue
    }

    /// RC model of a contour.
    pub fn contour(&self, kind: ContourKind) -> &RcEnvelope {
        &self.contours[kind.index()]
    }

    /// Mutable RC model of a contour.
    pub fn contour_mut(&mut self, kind: ContourKind) -> &mut RcEnvelope {
        &mut self.contours[kind.index()]
    }

    /// Enter or leave debugger probe mode.
    pub fn set_probing(&mut self, probing: bool) {
        self.probing = probing;
    }

    /// Every cycle budget adjustment, in order.
    pub fn cycle_adjustments(&self) -> &[i32] {
        &self.cycle_adjustments
    }

    /// Sum of all cycle budget adjustments.
    pub fn total_cycle_adjustment(&self) -> i64 {
        self.cycle_adjustments.iter().map(|&d| i64::from(d)).sum()
    }

    /// Current interrupt line level.
    pub fn irq_line(&self) -> bool {
        self.irq_line
    }

    /// Every interrupt line update, in order.
    pub fn irq_history(&self) -> &[bool] {
        &self.irq_history
    }

    /// Every solver input update, in order.
    pub fn analog_inputs(&self) -> &[(AnalogInput, f32)] {
        &self.analog_inputs
    }

    /// Solver input updates for one input, in order.
    pub fn analog_input_history(&self, input: AnalogInput) -> Vec<f32> {
        self.analog_inputs
            .iter()
            .filter(|(i, _)| *i == input)
            .map(|&(_, v)| v)
            .collect()
    }

    /// Every contour resistance update, in order.
    pub fn resistances(&self) -> &[(ContourKind, f32)] {
        &self.resistances
    }

    /// Every contour target update, in order.
    pub fn targets(&self) -> &[(ContourKind, f32)] {
        &self.targets
    }

    /// Last value sent to an indicator.
    pub fn indicator(&self, indicator: Indicator) -> Option<u8> {
        self.indicators.get(&indicator).copied()
    }

    /// Every event passed to `synchronize`, in order.
    pub fn synchronized(&self) -> &[MachineEvent] {
        &self.synchronized
    }

    /// Forget all recorded interactions. Indicator and line states are kept.
    pub fn clear_logs(&mut self) {
        self.cycle_adjustments.clear();
        self.irq_history.clear();
        self.analog_inputs.clear();
        self.resistances.clear();
        self.targets.clear();
        self.synchronized.clear();
    }
}

impl CpuControl for BenchHost {
    fn adjust_cycle_budget(&mut self, delta: i32) {
        self.cycle_adjustments.push(delta);
    }

    fn set_irq_line(&mut self, asserted: bool) {
        self.irq_line = asserted;
        self.irq_history.push(asserted);
    }

    fn side_effects_disabled(&self) -> bool {
        self.probing
    }
}

impl CircuitSolver for BenchHost {
    fn set_analog_input(&mut self, input: AnalogInput, volts: f32) {
        self.analog_inputs.push((input, volts));
    }

    fn set_contour_resistance(&mut self, contour: ContourKind, ohms: f32) {
        let now = self.queue.now();
        self.contours[contour.index()].set_r(now, ohms);
        self.resistances.push((contour, ohms));
    }

    fn set_contour_target(&mut self, contour: ContourKind, volts: f32) {
        let now = self.queue.now();
        self.contours[contour.index()].set_target_v(now, volts);
        self.targets.push((contour, volts));
    }

    fn contour_voltage(&self, contour: ContourKind, at: Duration) -> f32 {
        self.contours[contour.index()].voltage(at)
    }
}

impl InputPorts for BenchHost {
    fn button_row(&self, group: ButtonGroup, row: usize) -> u8 {
        self.panel.button_row(group, row)
    }

    fn keyboard_octave(&self, octave: usize) -> u16 {
        self.panel.keyboard_octave(octave)
    }

    fn octave_buttons(&self) -> u8 {
        self.panel.octave_buttons()
    }

    fn encoder_position(&self) -> u8 {
        self.panel.encoder_position()
    }

    fn trigger_in(&self) -> u8 {
        self.panel.trigger_in()
    }

    fn trimmer(&self, trimmer: Trimmer) -> u8 {
        self.panel.trimmer(trimmer)
    }
}

impl Indicators for BenchHost {
    fn set_indicator(&mut self, indicator: Indicator, value: u8) {
        self.indicators.insert(indicator, value);
    }
}

impl Scheduler for BenchHost {
    fn now(&self) -> Duration {
        self.queue.now()
    }

    fn synchronize(&mut self, event: MachineEvent) {
        self.synchronized.push(event);
        self.queue.synchronize(event);
    }

    fn schedule_at(&mut self, at: Duration, event: MachineEvent) {
        self.queue.schedule_at(at, event);
    }

    fn cancel_lfo_ticks(&mut self) {
        self.queue.cancel_lfo_ticks();
    }

    fn next_due(&mut self, deadline: Duration) -> Option<MachineEvent> {
        self.queue.next_due(deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_cpu_control() {
        let mut host = BenchHost::new();
        host.adjust_cycle_budget(-32);
        host.adjust_cycle_budget(-32);
        host.set_irq_line(true);

        assert_eq!(host.cycle_adjustments(), &[-32, -32]);
        assert_eq!(host.total_cycle_adjustment(), -64);
        assert!(host.irq_line());
        assert_eq!(host.irq_history(), &[true]);
    }

    #[test]
    fn test_solver_drives_rc_model() {
        let mut host = BenchHost::new();
        host.set_contour_resistance(ContourKind::Loudness, 10_000.0);
        host.set_contour_target(ContourKind::Loudness, 10.0);

        let later = Duration::from_millis(10);
        assert!(host.contour_voltage(ContourKind::Loudness, later) > 9.9);
        assert_eq!(host.contour_voltage(ContourKind::Filter, later), 0.0);
    }

    #[test]
    fn test_probe_mode() {
        let mut host = BenchHost::new();
        assert!(!host.side_effects_disabled());
        host.set_probing(true);
        assert!(host.side_effects_disabled());
    }
}
