//! Control voltage DAC and sample-and-hold channels.
//!
//! CVs are generated by an AM6012 12-bit DAC with only its 8 MSBs wired to
//! the data bus, so a raw byte maps linearly onto 0-10V. The DAC output is
//! routed to one of 24 sample-and-hold capacitors through three CD4051B
//! multiplexers: A0-A2 pick the multiplexer input, A3-A4 pick the
//! multiplexer through a 74LS155 whose fourth output is unconnected.
//!
//! Every I/O write stalls the CPU: 8 cycles for the DAC to settle with no
//! multiplexer selected, then 24 more while the selected capacitor charges.

use crate::devices::ContourKind;
use tracing::{debug, trace};

/// Number of sample-and-hold channels.
pub const CV_CHANNEL_COUNT: usize = 24;

/// Full-scale DAC output.
pub const MAX_CV: f32 = 10.0;

/// Cycles the DAC settles before a multiplexer is enabled.
pub const DAC_SETTLE_CYCLES: i32 = 8;

/// Cycles the selected sample-and-hold capacitor is given to charge.
pub const SAMPLE_HOLD_CYCLES: i32 = 24;

/// Wait states inserted on every I/O write.
pub const CV_WRITE_WAIT_CYCLES: i32 = DAC_SETTLE_CYCLES + SAMPLE_HOLD_CYCLES;

/// Sample-and-hold channels, in multiplexer order.
///
/// Names follow the CV labels on the synthesizer board schematic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CvChannel {
    // U2
    /// Filter cutoff, coarse.
    CutoffCoarse = 0,
    /// Oscillator 2 auto-tune.
    AutoTune2,
    /// Oscillator 2 interval, coarse.
    IntCoarse,
    /// Filter cutoff, fine.
    CutoffFine,
    /// Oscillator 1 pulse width.
    Pw1,
    /// Oscillator 2 pulse width.
    Pw2,
    /// Oscillator 2 interval, fine.
    IntFine,
    /// Oscillator 2 octave.
    Oct2,

    // U4
    /// Filter contour sustain/peak level.
    FilterContourLevel,
    /// Oscillator 1 octave.
    Oct1,
    /// Glide rate.
    Glide,
    /// Loudness contour sustain/peak level.
    LoudnessContourLevel,
    /// Oscillator 2 mixer level.
    Osc2,
    /// Noise mixer level.
    Noise,
    /// Sampled (C22, U10A) but not used.
    Unused,
    /// Oscillator 1 mixer level.
    Osc1,

    // U5
    /// Filter emphasis (resonance).
    Emphasis,
    /// U5 Y1 is not connected.
    NotConnected,
    /// Filter contour amount.
    Amt,
    /// LFO rate.
    ModRate,
    /// Successive-approximation reference for the keyboard comparator.
    KeyboardApprox,
    /// Keyboard pitch.
    KeyboardCv,
    /// Filter contour attack/decay rate.
    FilterContourRate,
    /// Loudness contour attack/decay rate.
    LoudnessContourRate,
}

/// What a changed channel drives besides its sample-and-hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CvEffect {
    /// Forward to the LFO rate input of the solver.
    LfoRate,
    /// Forward to a contour rate input of the solver.
    ContourRate(ContourKind),
    /// Recompute a contour's target voltage.
    ContourLevel(ContourKind),
    /// Purely analog; nothing for the core to do.
    None,
}

impl CvChannel {
    /// All channels, in DAC offset order.
    pub const ALL: [CvChannel; CV_CHANNEL_COUNT] = [
        CvChannel::CutoffCoarse,
        CvChannel::AutoTune2,
        CvChannel::IntCoarse,
        CvChannel::CutoffFine,
        CvChannel::Pw1,
        CvChannel::Pw2,
        CvChannel::IntFine,
        CvChannel::Oct2,
        CvChannel::FilterContourLevel,
        CvChannel::Oct1,
        CvChannel::Glide,
        CvChannel::LoudnessContourLevel,
        CvChannel::Osc2,
        CvChannel::Noise,
        CvChannel::Unused,
        CvChannel::Osc1,
        CvChannel::Emphasis,
        CvChannel::NotConnected,
        CvChannel::Amt,
        CvChannel::ModRate,
        CvChannel::KeyboardApprox,
        CvChannel::KeyboardCv,
        CvChannel::FilterContourRate,
        CvChannel::LoudnessContourRate,
    ];

    /// Channel selected by DAC offset `offset`, if one is wired.
    pub fn from_offset(offset: u8) -> Option<CvChannel> {
        Self::ALL.get(offset as usize).copied()
    }

    /// DAC offset of the channel.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Side effect of a change on this channel.
    pub fn effect(self) -> CvEffect {
        match self {
            CvChannel::ModRate => CvEffect::LfoRate,
            CvChannel::FilterContourRate => CvEffect::ContourRate(ContourKind::Filter),
            CvChannel::LoudnessContourRate => CvEffect::ContourRate(ContourKind::Loudness),
            CvChannel::FilterContourLevel => CvEffect::ContourLevel(ContourKind::Filter),
            CvChannel::LoudnessContourLevel => CvEffect::ContourLevel(ContourKind::Loudness),
            _ => CvEffect::None,
        }
    }
}

/// DAC output voltage for a raw data byte.
///
/// ```rust
/// use moog_source::devices::cv::dac_voltage;
///
/// assert_eq!(dac_voltage(0), 0.0);
/// assert_eq!(dac_voltage(255), 10.0);
/// ```
pub fn dac_voltage(raw: u8) -> f32 {
    MAX_CV * raw as f32 / 255.0
}

/// A CV change the caller has to act on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CvWrite {
    /// Channel written.
    pub channel: CvChannel,
    /// New channel voltage.
    pub volts: f32,
    /// Side effect to dispatch.
    pub effect: CvEffect,
}

/// Table of last-written sample-and-hold values.
///
/// Every channel holds 0V at power-on, so writing 0 to a fresh channel is
/// already redundant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CvStore {
    raw: [u8; CV_CHANNEL_COUNT],
}

impl CvStore {
    /// Create the power-on table, every channel at 0V.
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch `raw` into the channel at DAC offset `offset`.
    ///
    /// Returns the change to dispatch, or `None` when the offset has no
    /// channel or the channel already holds that voltage.
    pub fn write(&mut self, offset: u8, raw: u8) -> Option<CvWrite> {
        let channel = CvChannel::from_offset(offset)?;
        let volts = dac_voltage(raw);
        let slot = &mut self.raw[channel.index()];
        if dac_voltage(*slot) == volts {
            return None;
        }
        *slot = raw;

        if channel == CvChannel::KeyboardApprox {
            trace!(target: "moog_source::cv", "CV {}: 0x{:02x}, {}", offset, raw, volts);
        } else {
            debug!(target: "moog_source::cv", "CV {}: 0x{:02x}, {}", offset, raw, volts);
        }

        Some(CvWrite {
            channel,
            volts,
            effect: channel.effect(),
        })
    }

    /// Current voltage of `channel`.
    pub fn voltage(&self, channel: CvChannel) -> f32 {
        dac_voltage(self.raw[channel.index()])
    }

    /// Last raw byte latched into `channel`.
    pub fn raw(&self, channel: CvChannel) -> u8 {
        self.raw[channel.index()]
    }

    /// Copy of the whole table, for save states.
    pub fn snapshot(&self) -> [u8; CV_CHANNEL_COUNT] {
        self.raw
    }

    /// Replace the whole table without dispatching side effects.
    pub fn restore(&mut self, raw: [u8; CV_CHANNEL_COUNT]) {
        self.raw = raw;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_offsets() {
        assert_eq!(CvChannel::from_offset(0), Some(CvChannel::CutoffCoarse));
        assert_eq!(CvChannel::from_offset(19), Some(CvChannel::ModRate));
        assert_eq!(CvChannel::from_offset(20), Some(CvChannel::KeyboardApprox));
        assert_eq!(
            CvChannel::from_offset(23),
            Some(CvChannel::LoudnessContourRate)
        );
        assert_eq!(CvChannel::from_offset(24), None);
        assert_eq!(CvChannel::from_offset(31), None);

        for (i, channel) in CvChannel::ALL.iter().enumerate() {
            assert_eq!(channel.index(), i);
        }
    }

    #[test]
    fn test_channel_effects() {
        assert_eq!(CvChannel::ModRate.effect(), CvEffect::LfoRate);
        assert_eq!(
            CvChannel::FilterContourRate.effect(),
            CvEffect::ContourRate(ContourKind::Filter)
        );
        assert_eq!(
            CvChannel::LoudnessContourLevel.effect(),
            CvEffect::ContourLevel(ContourKind::Loudness)
        );
        assert_eq!(CvChannel::Glide.effect(), CvEffect::None);
    }

    #[test]
    fn test_wait_cycles() {
        assert_eq!(CV_WRITE_WAIT_CYCLES, 32);
    }

    #[test]
    fn test_dac_voltage() {
        assert_eq!(dac_voltage(0), 0.0);
        assert_eq!(dac_voltage(255), 10.0);
        assert!((dac_voltage(128) - 5.0196).abs() < 1e-3);
    }

    #[test]
    fn test_power_on_channels_read_zero() {
        let store = CvStore::new();
        for channel in CvChannel::ALL {
            assert_eq!(store.voltage(channel), 0.0);
            assert_eq!(store.raw(channel), 0);
        }
    }

    #[test]
    fn test_write_reports_change_once() {
        let mut store = CvStore::new();
        let change = store.write(19, 0x80).unwrap();
        assert_eq!(change.channel, CvChannel::ModRate);
        assert_eq!(change.effect, CvEffect::LfoRate);
        assert_eq!(change.volts, dac_voltage(0x80));

        assert_eq!(store.write(19, 0x80), None);
        assert_eq!(store.voltage(CvChannel::ModRate), dac_voltage(0x80));
    }

    #[test]
    fn test_zero_write_after_power_on_is_redundant() {
        let mut store = CvStore::new();
        assert_eq!(store.write(CvChannel::ModRate as u8, 0), None);

        store.write(CvChannel::ModRate as u8, 0x40).unwrap();
        let change = store.write(CvChannel::ModRate as u8, 0).unwrap();
        assert_eq!(change.volts, 0.0);
        assert_eq!(store.write(CvChannel::ModRate as u8, 0), None);
    }

    #[test]
    fn test_out_of_range_write_ignored() {
        let mut store = CvStore::new();
        assert_eq!(store.write(24, 0xFF), None);
        assert_eq!(store.write(31, 0xFF), None);
        assert_eq!(store, CvStore::new());
    }

    #[test]
    fn test_snapshot_restore() {
        let mut store = CvStore::new();
        store.write(0, 10);
        store.write(23, 200);

        let mut copy = CvStore::new();
        copy.restore(store.snapshot());
        assert_eq!(copy, store);
        assert_eq!(copy.raw(CvChannel::LoudnessContourRate), 200);
    }
}
