//! Machine configuration.

use crate::services::Trimmer;
use std::time::Duration;

/// Crystal on the control board.
pub const XTAL_HZ: u32 = 4_000_000;

/// Firmware releases the machine can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FirmwareRevision {
    /// Revision 3.3, the last factory release.
    #[default]
    Rev3_3,
}

impl FirmwareRevision {
    /// ROM image file name.
    pub fn rom_name(&self) -> &'static str {
        match self {
            FirmwareRevision::Rev3_3 => "3p3.u23",
        }
    }

    /// Human-readable name.
    pub fn description(&self) -> &'static str {
        match self {
            FirmwareRevision::Rev3_3 => "Firmware rev 3.3",
        }
    }
}

/// Trimmer positions on the 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    /// Filter contour range trimmer (R201).
    pub filter_contour_range: u8,
    /// Loudness contour range trimmer (R179).
    pub loudness_contour_range: u8,
    /// LFO range trimmer (R223).
    pub lfo_range: u8,
}

impl Calibration {
    /// Position of one trimmer.
    pub fn get(&self, trimmer: Trimmer) -> u8 {
        match trimmer {
            Trimmer::FilterContourRange => self.filter_contour_range,
            Trimmer::LoudnessContourRange => self.loudness_contour_range,
            Trimmer::LfoRange => self.lfo_range,
        }
    }

    /// Move one trimmer, clamped to 100.
    pub fn set(&mut self, trimmer: Trimmer, position: u8) {
        let position = position.min(100);
        match trimmer {
            Trimmer::FilterContourRange => self.filter_contour_range = position,
            Trimmer::LoudnessContourRange => self.loudness_contour_range = position,
            Trimmer::LfoRange => self.lfo_range = position,
        }
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            filter_contour_range: 50,
            loudness_contour_range: 50,
            lfo_range: 0,
        }
    }
}

/// Static configuration of a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceConfig {
    /// Firmware the ROM socket is expected to hold.
    pub firmware: FirmwareRevision,
    /// Factory trimmer positions.
    pub calibration: Calibration,
}

impl SourceConfig {
    /// Z80 clock: the crystal divided by two.
    pub fn clock_hz(&self) -> u32 {
        XTAL_HZ / 2
    }

    /// Wall time taken by `cycles` CPU cycles.
    pub fn cycles_to_duration(&self, cycles: u64) -> Duration {
        let clock = u64::from(self.clock_hz());
        let nanos = u128::from(cycles % clock) * 1_000_000_000 / u128::from(clock);
        Duration::new(cycles / clock, nanos as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SourceConfig::default();
        assert_eq!(config.clock_hz(), 2_000_000);
        assert_eq!(config.firmware.rom_name(), "3p3.u23");
        assert_eq!(config.calibration.get(Trimmer::FilterContourRange), 50);
        assert_eq!(config.calibration.get(Trimmer::LoudnessContourRange), 50);
        assert_eq!(config.calibration.get(Trimmer::LfoRange), 0);
    }

    #[test]
    fn test_cycles_to_duration() {
        let config = SourceConfig::default();
        assert_eq!(config.cycles_to_duration(32), Duration::from_nanos(16_000));
        assert_eq!(config.cycles_to_duration(2_000_000), Duration::from_secs(1));
        assert_eq!(
            config.cycles_to_duration(u64::MAX),
            Duration::new(u64::MAX / 2_000_000, 775_807_500)
        );
    }

    #[test]
    fn test_calibration_clamped() {
        let mut calibration = Calibration::default();
        calibration.set(Trimmer::LfoRange, 250);
        assert_eq!(calibration.lfo_range, 100);
    }
}
