//! Integration tests for the LFO timer driver: rate changes, phase
//! continuity, stopping, and the MOD RATE LED / status bit it drives.

use moog_source::devices::lfo::{lfo_c, v_peak_triangle};
use moog_source::{
    AnalogOutput, BenchHost, Indicator, MachineEvent, MemoryBus, Scheduler, SourceMachine,
};
use std::time::Duration;

const LFO_STATUS_BIT: u8 = 0x20;

fn setup_machine() -> SourceMachine<BenchHost> {
    let mut machine = SourceMachine::new(BenchHost::new());
    machine.reset();
    machine.host_mut().clear_logs();
    machine
}

/// Iabc giving a half-period of `seconds`.
fn current_for_half_period(seconds: f64) -> f32 {
    (2.0 * f64::from(v_peak_triangle()) * f64::from(lfo_c()) / seconds) as f32
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn test_square_wave_toggles_every_half_period() {
    let mut machine = setup_machine();
    machine.on_lfo_current_changed(current_for_half_period(0.010));

    // Edges at 0, 10, 20, ... ms.
    machine.run_until(ms(5));
    assert!(machine.lfo().state());
    machine.run_until(ms(15));
    assert!(!machine.lfo().state());
    machine.run_until(ms(25));
    assert!(machine.lfo().state());

    // Status bit D5 and the LED are both the inverted square wave.
    assert_eq!(machine.read(0x6000) & LFO_STATUS_BIT, 0);
    assert_eq!(machine.host().indicator(Indicator::ModRateLed), Some(0));
    machine.run_until(ms(35));
    assert_eq!(machine.read(0x6000) & LFO_STATUS_BIT, LFO_STATUS_BIT);
    assert_eq!(machine.host().indicator(Indicator::ModRateLed), Some(1));
}

#[test]
fn test_tick_count_matches_frequency() {
    let mut machine = setup_machine();
    machine.on_lfo_current_changed(current_for_half_period(0.010));

    // Edges at 0, 10, ..., 990ms: 100 ticks plus the recompute itself.
    let events = machine.run_until(ms(995));
    assert_eq!(events, 101);
}

#[test]
fn test_rate_change_preserves_phase() {
    let mut machine = setup_machine();
    machine.on_lfo_current_changed(current_for_half_period(0.100));
    machine.run_pending();
    assert!(machine.lfo().state());

    // 40ms into a 100ms half-cycle, the rate doubles.
    machine.run_until(ms(40));
    machine.on_lfo_current_changed(current_for_half_period(0.050));
    machine.run_pending();

    // 60% of the half-cycle remains: 30ms of the new 50ms half-period.
    machine.run_until(ms(69));
    assert!(machine.lfo().state());
    machine.run_until(ms(71));
    assert!(!machine.lfo().state());

    // Then every 50ms.
    machine.run_until(ms(119));
    assert!(!machine.lfo().state());
    machine.run_until(ms(121));
    assert!(machine.lfo().state());
}

#[test]
fn test_old_timer_firings_are_discarded() {
    let mut machine = setup_machine();
    machine.on_lfo_current_changed(current_for_half_period(0.100));
    machine.run_pending();

    // Re-arm several times before the first pending tick is due.
    for step in 1..=5 {
        machine.run_until(ms(step));
        machine.on_lfo_current_changed(current_for_half_period(0.100 + step as f64 * 0.001));
        machine.run_pending();
    }

    // Only the surviving timer's tick is left in the queue.
    assert_eq!(machine.host().queue().len(), 1);

    // It fires near 105ms, then every 105ms: exactly one edge before 200ms.
    let before = machine.lfo().state();
    machine.run_until(ms(200));
    assert_eq!(machine.lfo().state(), !before);
}

#[test]
fn test_non_positive_current_stops_oscillation() {
    let mut machine = setup_machine();
    machine.on_lfo_current_changed(current_for_half_period(0.010));
    machine.run_until(ms(15));
    let frozen = machine.lfo().state();

    machine.on_analog_output_changed(AnalogOutput::LfoCv, -15.0);
    machine.run_pending();
    assert!(!machine.lfo().timer().is_armed());

    machine.run_until(ms(500));
    assert_eq!(machine.lfo().state(), frozen);
    assert!(machine.host().queue().is_empty());
}

#[test]
fn test_restart_after_stop_begins_new_half_cycle() {
    let mut machine = setup_machine();
    machine.on_lfo_current_changed(0.0);
    machine.run_pending();
    assert!(!machine.lfo().timer().is_armed());

    machine.run_until(ms(10));
    machine.on_lfo_current_changed(current_for_half_period(0.020));
    machine.run_pending();

    // A stopped timer has no phase to keep: the first edge is immediate.
    assert!(machine.lfo().state());
    assert_eq!(machine.host().now(), ms(10));
}

#[test]
fn test_recompute_is_synchronized() {
    let mut machine = setup_machine();
    machine.on_lfo_current_changed(current_for_half_period(0.010));

    assert_eq!(
        machine.host().synchronized(),
        &[MachineEvent::UpdateLfoTimer]
    );
    assert!(!machine.lfo().timer().is_armed());
}
