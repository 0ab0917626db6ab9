//! Integration tests for DAC writes through the I/O space.
//!
//! These tests verify wait-state insertion, channel decoding, redundant
//! write suppression and the forwarding of rate CVs to the circuit solver.

use moog_source::{
    AnalogInput, AnalogOutput, BenchHost, ContourKind, CvChannel, MachineEvent, MemoryBus,
    SourceMachine,
};

fn setup_machine() -> SourceMachine<BenchHost> {
    let mut machine = SourceMachine::new(BenchHost::new());
    machine.reset();
    machine.host_mut().clear_logs();
    machine
}

#[test]
fn test_every_write_charges_32_wait_cycles() {
    let mut machine = setup_machine();

    machine.io_write(0x00, 0x10);
    machine.io_write(0x00, 0x10); // redundant
    machine.io_write(0x1F, 0x10); // no channel behind offset 31

    assert_eq!(machine.host().cycle_adjustments(), &[-32, -32, -32]);
}

#[test]
fn test_probe_writes_charge_nothing_but_update_table() {
    let mut machine = setup_machine();
    machine.host_mut().set_probing(true);

    machine.io_write(CvChannel::Glide as u16, 0x80);

    assert!(machine.host().cycle_adjustments().is_empty());
    assert_eq!(machine.cv().raw(CvChannel::Glide), 0x80);
}

#[test]
fn test_port_mirroring() {
    let mut machine = setup_machine();

    // 0x33, 0x53, ..., 0xF3 all select offset 0x13 (MOD RATE).
    machine.io_write(0xF3, 0xFF);
    assert_eq!(machine.cv().voltage(CvChannel::ModRate), 10.0);

    // High address byte is ignored too.
    machine.io_write(0x5A33, 0x00);
    assert_eq!(machine.cv().voltage(CvChannel::ModRate), 0.0);
}

#[test]
fn test_redundant_writes_do_not_reach_solver() {
    let mut machine = setup_machine();

    for _ in 0..5 {
        machine.io_write(CvChannel::FilterContourRate as u16, 0x40);
    }

    assert_eq!(
        machine
            .host()
            .analog_input_history(AnalogInput::ContourRate(ContourKind::Filter))
            .len(),
        1
    );
    assert_eq!(machine.host().cycle_adjustments().len(), 5);
}

#[test]
fn test_rate_channels_forward_to_solver() {
    let mut machine = setup_machine();

    machine.io_write(CvChannel::FilterContourRate as u16, 0xFF);
    machine.io_write(CvChannel::LoudnessContourRate as u16, 0x66);
    machine.io_write(CvChannel::ModRate as u16, 0x33);

    assert_eq!(
        machine.host().analog_inputs(),
        &[
            (AnalogInput::ContourRate(ContourKind::Filter), 10.0),
            (AnalogInput::ContourRate(ContourKind::Loudness), 4.0),
            (AnalogInput::LfoRate, 2.0),
        ]
    );
    // Rate writes do not schedule anything themselves.
    assert!(machine.host().synchronized().is_empty());
}

#[test]
fn test_level_channels_schedule_contour_update() {
    let mut machine = setup_machine();

    machine.io_write(CvChannel::FilterContourLevel as u16, 0x10);
    machine.io_write(CvChannel::LoudnessContourLevel as u16, 0x20);
    machine.io_write(CvChannel::LoudnessContourLevel as u16, 0x20);

    assert_eq!(
        machine.host().synchronized(),
        &[
            MachineEvent::UpdateContour(ContourKind::Filter),
            MachineEvent::UpdateContour(ContourKind::Loudness),
        ]
    );
    assert!(machine.host().analog_inputs().is_empty());
}

#[test]
fn test_plain_channels_have_no_side_effects() {
    let mut machine = setup_machine();

    for channel in [
        CvChannel::CutoffCoarse,
        CvChannel::Oct1,
        CvChannel::Noise,
        CvChannel::KeyboardApprox,
        CvChannel::KeyboardCv,
    ] {
        machine.io_write(channel as u16, 0x99);
        assert_eq!(machine.cv().raw(channel), 0x99);
    }

    assert!(machine.host().analog_inputs().is_empty());
    assert!(machine.host().synchronized().is_empty());
}

#[test]
fn test_mod_rate_end_to_end() {
    let mut machine = setup_machine();

    machine.io_write(CvChannel::ModRate as u16, 0x33);
    // The solver answers with a new exponential converter output.
    machine.on_analog_output_changed(AnalogOutput::LfoCv, -14.0);

    machine.io_write(CvChannel::ModRate as u16, 0);
    machine.on_analog_output_changed(AnalogOutput::LfoCv, -14.2);

    machine.io_write(CvChannel::ModRate as u16, 255);
    machine.on_analog_output_changed(AnalogOutput::LfoCv, -13.0);

    assert_eq!(
        machine.host().analog_input_history(AnalogInput::LfoRate),
        vec![2.0, 0.0, 10.0]
    );
    let recomputes = machine
        .host()
        .synchronized()
        .iter()
        .filter(|&&e| e == MachineEvent::UpdateLfoTimer)
        .count();
    assert_eq!(recomputes, 3);
}

#[test]
fn test_zero_write_after_reset_is_redundant() {
    let mut machine = setup_machine();

    // Every sample-and-hold starts at 0V.
    machine.io_write(CvChannel::ModRate as u16, 0);
    machine.io_write(CvChannel::FilterContourRate as u16, 0);
    machine.io_write(CvChannel::LoudnessContourLevel as u16, 0);

    assert!(machine.host().analog_inputs().is_empty());
    assert!(machine.host().synchronized().is_empty());
    assert_eq!(machine.host().cycle_adjustments(), &[-32, -32, -32]);
}
