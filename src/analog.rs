//! Analog component helpers.
//!
//! Component values in this crate are plain `f32` SI units (ohms, farads,
//! volts, amperes). The helpers here keep schematic annotations readable
//! (`res_k(18.2)` rather than `18_200.0`) and hold the few formulas shared by
//! more than one driver.
//!
//! [`RcEnvelope`] is the reference model of the RC "contour" the envelope
//! drivers program. The driver itself only pushes an effective resistance and
//! a target voltage; a host's circuit solver can embed this model to answer
//! voltage queries, including projections into the future.

use std::time::Duration;

/// Resistance in ohms.
#[inline]
pub fn res_r(ohms: f32) -> f32 {
    ohms
}

/// Resistance in kilohms.
#[inline]
pub fn res_k(kilohms: f32) -> f32 {
    kilohms * 1e3
}

/// Resistance in megohms.
#[inline]
pub fn res_m(megohms: f32) -> f32 {
    megohms * 1e6
}

/// Capacitance in microfarads.
#[inline]
pub fn cap_u(microfarads: f32) -> f32 {
    microfarads * 1e-6
}

/// Output ratio of a resistive divider: `r1` on top, `r2` to ground.
///
/// ```rust
/// use moog_source::analog::voltage_divider;
///
/// assert_eq!(voltage_divider(1000.0, 1000.0), 0.5);
/// ```
#[inline]
pub fn voltage_divider(r1: f32, r2: f32) -> f32 {
    r2 / (r1 + r2)
}

/// Bias voltage at the Iabc pin of a CA3080: one diode drop above -15V.
pub const CA3080_VABC: f32 = -15.0 + 0.7;

/// Resistor converting the exponential converter's output voltage into Iabc
/// (R198/R186 for the contours, R227 for the LFO, all 10K).
pub const IABC_RESISTOR: f32 = 10_000.0;

/// Converts a voltage reported by the circuit solver into the control
/// current (Iabc) flowing into a CA3080.
///
/// The exponential converters feeding the contour and LFO OTAs are simulated
/// by the solver, which reports the voltage at their output. The current is
/// whatever that voltage pushes through the 10K resistor into the OTA's bias
/// pin.
#[inline]
pub fn ota_control_current(volts: f32) -> f32 {
    (volts - CA3080_VABC) / IABC_RESISTOR
}

/// Single-pole RC envelope: a capacitor charged toward a target voltage
/// through a resistance.
///
/// The voltage follows `v(t) = target + (v0 - target) * e^(-(t - t0) / RC)`.
/// Changing the resistance or the target re-anchors the curve at the
/// present voltage, so the output stays continuous.
///
/// # Examples
///
/// ```rust
/// use moog_source::RcEnvelope;
/// use std::time::Duration;
///
/// let mut eg = RcEnvelope::new(0.047e-6);
/// eg.set_r(Duration::ZERO, 10_000.0);
/// eg.set_target_v(Duration::ZERO, 10.0);
///
/// // After five time constants the capacitor is within 1% of the target.
/// let five_tau = Duration::from_secs_f64(5.0 * 10_000.0 * 0.047e-6);
/// assert!(eg.voltage(five_tau) > 9.9);
/// ```
#[derive(Debug, Clone)]
pub struct RcEnvelope {
    c: f32,
    r: f32,
    target_v: f32,
    anchor_v: f32,
    anchor_time: Duration,
}

impl RcEnvelope {
    /// Create a discharged envelope with the given capacitance.
    ///
    /// The resistance starts out infinite, so the voltage holds at 0V until
    /// a resistance is programmed.
    pub fn new(c: f32) -> Self {
        Self {
            c,
            r: f32::INFINITY,
            target_v: 0.0,
            anchor_v: 0.0,
            anchor_time: Duration::ZERO,
        }
    }

    /// Capacitance in farads.
    pub fn c(&self) -> f32 {
        self.c
    }

    /// Present charge resistance in ohms.
    pub fn r(&self) -> f32 {
        self.r
    }

    /// Voltage the capacitor is charging toward.
    pub fn target_v(&self) -> f32 {
        self.target_v
    }

    /// RC time constant in seconds.
    pub fn time_constant(&self) -> f32 {
        self.r * self.c
    }

    /// Voltage across the capacitor at time `at`.
    ///
    /// Times before the last change return the voltage at that change; the
    /// model does not keep history.
    pub fn voltage(&self, at: Duration) -> f32 {
        let Some(elapsed) = at.checked_sub(self.anchor_time) else {
            return self.anchor_v;
        };
        let tau = f64::from(self.r) * f64::from(self.c);
        if !tau.is_finite() || tau <= 0.0 {
            return self.anchor_v;
        }
        let decay = (-elapsed.as_secs_f64() / tau).exp();
        let target = f64::from(self.target_v);
        (target + (f64::from(self.anchor_v) - target) * decay) as f32
    }

    /// Program a new charge resistance from time `now` on.
    pub fn set_r(&mut self, now: Duration, r: f32) {
        self.reanchor(now);
        self.r = r;
    }

    /// Program a new target voltage from time `now` on.
    pub fn set_target_v(&mut self, now: Duration, target_v: f32) {
        self.reanchor(now);
        self.target_v = target_v;
    }

    /// Force the capacitor voltage at time `now`.
    pub fn set_instant_v(&mut self, now: Duration, v: f32) {
        self.anchor_v = v;
        self.anchor_time = now;
    }

    fn reanchor(&mut self, now: Duration) {
        if now > self.anchor_time {
            self.anchor_v = self.voltage(now);
            self.anchor_time = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_helpers() {
        assert_eq!(res_r(150.0), 150.0);
        assert_eq!(res_k(10.0), 10_000.0);
        assert_eq!(res_m(4.7), 4_700_000.0);
        assert!((cap_u(0.33) - 0.33e-6).abs() < 1e-12);
    }

    #[test]
    fn test_voltage_divider() {
        assert_eq!(voltage_divider(0.0, 100.0), 1.0);
        assert!((voltage_divider(100_000.0, 12_000.0) - 0.107_142_86).abs() < 1e-6);
    }

    #[test]
    fn test_ota_control_current() {
        // At the bias voltage no current flows.
        assert_eq!(ota_control_current(CA3080_VABC), 0.0);
        // 1V above the bias point pushes 100uA.
        assert!((ota_control_current(CA3080_VABC + 1.0) - 100e-6).abs() < 1e-9);
        // Below the bias point the current goes negative.
        assert!(ota_control_current(-15.0) < 0.0);
    }

    #[test]
    fn test_envelope_holds_without_resistance() {
        let mut eg = RcEnvelope::new(1e-6);
        eg.set_target_v(Duration::ZERO, 10.0);
        assert_eq!(eg.voltage(Duration::from_secs(1)), 0.0);
    }

    #[test]
    fn test_envelope_charges_toward_target() {
        let mut eg = RcEnvelope::new(1e-6);
        eg.set_r(Duration::ZERO, 1000.0); // tau = 1ms
        eg.set_target_v(Duration::ZERO, 10.0);

        let one_tau = eg.voltage(Duration::from_millis(1));
        assert!((one_tau - 10.0 * (1.0 - (-1.0f32).exp())).abs() < 1e-3);
        assert!(eg.voltage(Duration::from_millis(2)) > one_tau);
    }

    #[test]
    fn test_envelope_reanchors_on_change() {
        let mut eg = RcEnvelope::new(1e-6);
        eg.set_r(Duration::ZERO, 1000.0);
        eg.set_target_v(Duration::ZERO, 10.0);

        let t = Duration::from_millis(1);
        let before = eg.voltage(t);
        eg.set_target_v(t, 0.0);

        // Continuous at the change, then discharging.
        assert!((eg.voltage(t) - before).abs() < 1e-6);
        assert!(eg.voltage(Duration::from_millis(2)) < before);
    }

    #[test]
    fn test_envelope_ignores_past_queries() {
        let mut eg = RcEnvelope::new(1e-6);
        eg.set_instant_v(Duration::from_millis(5), 3.0);
        assert_eq!(eg.voltage(Duration::from_millis(1)), 3.0);
    }
}
