//! Envelope generator ("contour") driver.
//!
//! Each contour is a CA3080 OTA wired as a current-controlled resistor that
//! charges a 0.047uF capacitor (C57 filter, C56 loudness) toward the level
//! set by the firmware. The charge rate follows the OTA's Iabc, produced by
//! an exponential converter the circuit solver simulates.
//!
//! The driver turns the control current and the level CV into the two
//! numbers the solver's RC model needs: an effective resistance and a target
//! voltage. It also models the LM393 peak detector the firmware polls to end
//! the attack phase.

use crate::analog::{cap_u, res_k, res_m, res_r, voltage_divider};
use crate::devices::CvChannel;
use std::time::Duration;
use tracing::debug;

/// Contour capacitor (C57 filter, C56 loudness).
pub fn contour_c() -> f32 {
    cap_u(0.047)
}

/// Resistive divider at the OTA's non-inverting input (R196/R197 filter,
/// R183/R184 loudness).
pub fn ota_divider_plus() -> f32 {
    voltage_divider(res_k(18.2), res_r(100.0))
}

/// Resistive divider at the OTA's inverting input (R195/R194 filter,
/// R187/R182 loudness).
pub fn ota_divider_minus() -> f32 {
    voltage_divider(res_k(20.0), res_r(100.0))
}

/// Ideal CA3080 transconductance per amp of Iabc at room temperature.
pub const OTA_GM_PER_AMP: f32 = 19.2;

/// Comparator threshold while the contour is rising (R191/R192 filter,
/// R189/R188 loudness, 5V pull-up).
pub fn rising_threshold() -> f32 {
    5.0 * voltage_divider(res_k(10.0), res_m(4.7)) + 5.0
}

/// Comparator threshold while the contour is falling.
pub fn falling_threshold() -> f32 {
    10.0 * voltage_divider(res_k(10.0), res_m(4.7))
}

/// How far ahead the peak detector looks to tell a rising contour from a
/// falling one inside the hysteresis band.
pub const SLOPE_PROBE: Duration = Duration::from_millis(1);

/// The two envelope generators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContourKind {
    /// Filter contour (U41B peak detector).
    Filter,
    /// Loudness contour (U41A peak detector).
    Loudness,
}

impl ContourKind {
    /// Both contours.
    pub const ALL: [ContourKind; 2] = [ContourKind::Filter, ContourKind::Loudness];

    /// Position in per-contour tables.
    pub fn index(self) -> usize {
        match self {
            ContourKind::Filter => 0,
            ContourKind::Loudness => 1,
        }
    }

    /// Name used in log messages.
    pub fn name(self) -> &'static str {
        match self {
            ContourKind::Filter => "Filter",
            ContourKind::Loudness => "Loudness",
        }
    }

    /// CV channel driving the charge rate.
    pub fn rate_channel(self) -> CvChannel {
        match self {
            ContourKind::Filter => CvChannel::FilterContourRate,
            ContourKind::Loudness => CvChannel::LoudnessContourRate,
        }
    }

    /// CV channel driving the target level.
    pub fn level_channel(self) -> CvChannel {
        match self {
            ContourKind::Filter => CvChannel::FilterContourLevel,
            ContourKind::Loudness => CvChannel::LoudnessContourLevel,
        }
    }
}

/// Values to push into the solver's RC model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourUpdate {
    /// Effective charge resistance in ohms.
    pub effective_r: f32,
    /// Voltage the capacitor charges toward.
    pub target_v: f32,
}

/// Driver state of one contour.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    kind: ContourKind,
    control_current: f32,
}

impl Contour {
    /// Create an idle contour with no control current.
    pub fn new(kind: ContourKind) -> Self {
        Self {
            kind,
            control_current: 0.0,
        }
    }

    /// Which contour this is.
    pub fn kind(&self) -> ContourKind {
        self.kind
    }

    /// OTA control current (Iabc) in amps.
    pub fn control_current(&self) -> f32 {
        self.control_current
    }

    /// Store a new control current. The caller schedules the recompute.
    pub fn set_control_current(&mut self, amps: f32) {
        self.control_current = amps;
    }

    /// Derive the effective resistance and target voltage for `level_cv`.
    ///
    /// Returns `None`, leaving the solver untouched, when the control current
    /// is not strictly positive; the solver reports such values transiently.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use moog_source::{Contour, ContourKind};
    ///
    /// let mut contour = Contour::new(ContourKind::Filter);
    /// assert_eq!(contour.recompute(5.0), None);
    ///
    /// contour.set_control_current(100e-6);
    /// let update = contour.recompute(10.0).unwrap();
    /// assert!(update.target_v > 10.0 && update.target_v < 11.0);
    /// ```
    pub fn recompute(&self, level_cv: f32) -> Option<ContourUpdate> {
        if self.control_current.is_nan() || self.control_current <= 0.0 {
            debug!(
                target: "moog_source::contour",
                "{} EG received a non-positive control current. Skipping update.",
                self.kind.name()
            );
            return None;
        }

        let g = OTA_GM_PER_AMP * self.control_current;
        let effective_r = 1.0 / (g * ota_divider_minus());
        let target_v = level_cv * ota_divider_plus() / ota_divider_minus();

        debug!(
            target: "moog_source::contour",
            "{} EG update - Level CV: {}, target_v: {}, R: {}, tau: {}",
            self.kind.name(),
            level_cv,
            target_v,
            effective_r,
            effective_r * contour_c()
        );

        Some(ContourUpdate {
            effective_r,
            target_v,
        })
    }
}

/// LM393 peak detector decision for a contour at `now_v`, given the
/// projected voltage one [`SLOPE_PROBE`] later.
///
/// Above the rising threshold the contour has peaked; below the falling
/// threshold it has not. Inside the hysteresis band (about 10mV wide) the
/// active threshold depends on the comparator's history, which is inferred
/// from the slope: a falling contour must have crossed the rising threshold
/// already.
pub fn contour_peaked(now_v: f32, future_v: f32) -> bool {
    if now_v > rising_threshold() {
        true
    } else if now_v < falling_threshold() {
        false
    } else {
        future_v < now_v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds() {
        let rising = rising_threshold();
        let falling = falling_threshold();
        assert!(rising > falling);
        assert!((rising - 9.98937).abs() < 1e-3);
        assert!((falling - 9.97877).abs() < 1e-3);
    }

    #[test]
    fn test_channels() {
        assert_eq!(
            ContourKind::Filter.rate_channel(),
            CvChannel::FilterContourRate
        );
        assert_eq!(
            ContourKind::Loudness.level_channel(),
            CvChannel::LoudnessContourLevel
        );
        assert_eq!(ContourKind::Loudness.index(), 1);
    }

    #[test]
    fn test_recompute_skips_non_positive_current() {
        let mut contour = Contour::new(ContourKind::Loudness);
        assert_eq!(contour.recompute(10.0), None);

        contour.set_control_current(-1e-6);
        assert_eq!(contour.recompute(10.0), None);

        contour.set_control_current(f32::NAN);
        assert_eq!(contour.recompute(10.0), None);
    }

    #[test]
    fn test_recompute_values() {
        let mut contour = Contour::new(ContourKind::Filter);
        contour.set_control_current(1e-3);
        let update = contour.recompute(10.0).unwrap();

        let minus = 100.0 / (20_000.0 + 100.0);
        let plus = 100.0 / (18_200.0 + 100.0);
        let expected_r = 1.0 / (19.2 * 1e-3 * minus);
        assert!((update.effective_r - expected_r).abs() / expected_r < 1e-5);
        assert!((update.target_v - 10.0 * plus / minus).abs() < 1e-4);
    }

    #[test]
    fn test_more_current_charges_faster() {
        let mut slow = Contour::new(ContourKind::Filter);
        slow.set_control_current(10e-6);
        let mut fast = Contour::new(ContourKind::Filter);
        fast.set_control_current(100e-6);

        let slow_r = slow.recompute(5.0).unwrap().effective_r;
        let fast_r = fast.recompute(5.0).unwrap().effective_r;
        assert!(fast_r < slow_r);
    }

    #[test]
    fn test_peak_detector_bands() {
        assert!(contour_peaked(10.5, 10.0));
        assert!(contour_peaked(10.5, 11.0));
        assert!(!contour_peaked(5.0, 6.0));
        assert!(!contour_peaked(5.0, 4.0));
    }

    #[test]
    fn test_peak_detector_hysteresis_uses_slope() {
        let mid = (rising_threshold() + falling_threshold()) / 2.0;
        assert!(contour_peaked(mid, mid - 0.001));
        assert!(!contour_peaked(mid, mid + 0.001));
    }
}
