//! Output latches A and B (74LS378, board 3).
//!
//! Both are 6-bit latches; D6 and D7 are dropped. Latch A selects keyboard
//! tracking and oscillator waveforms through analog switches; latch B drives
//! sync, the edit LED, the trigger output and the LFO routing.

use crate::services::Indicator;

/// Filter keyboard tracking amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyboardTracking {
    /// Keyboard CV not mixed in.
    Off = 0,
    /// Mixed in through 242K (R142 + R143).
    Half = 1,
    /// Mixed in through 121K (R142).
    Full = 2,
}

impl KeyboardTracking {
    /// Decode D0-D1 of latch A. Both switches on is still full tracking.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            1 => KeyboardTracking::Half,
            2 | 3 => KeyboardTracking::Full,
            _ => KeyboardTracking::Off,
        }
    }
}

/// Oscillator waveform select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OscWaveform {
    /// Sawtooth.
    Sawtooth = 0,
    /// Triangle.
    Triangle = 1,
    /// Square/pulse.
    Pulse = 2,
    /// Triangle and pulse mixed; the firmware does not seem to use it.
    TrianglePulse = 3,
}

impl OscWaveform {
    /// Decode a 2-bit waveform field.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => OscWaveform::Sawtooth,
            1 => OscWaveform::Triangle,
            2 => OscWaveform::Pulse,
            _ => OscWaveform::TrianglePulse,
        }
    }
}

/// Indicator updates for a write to latch A.
pub fn latch_a_outputs(data: u8) -> [(Indicator, u8); 3] {
    [
        (
            Indicator::KeyboardTracking,
            KeyboardTracking::from_bits(data) as u8,
        ),
        (
            Indicator::OscWaveform(1),
            OscWaveform::from_bits(data >> 2) as u8,
        ),
        (
            Indicator::OscWaveform(0),
            OscWaveform::from_bits(data >> 4) as u8,
        ),
    ]
}

/// Indicator updates for a write to latch B.
///
/// Trigger out and both LFO routes are inverted on their way out.
pub fn latch_b_outputs(data: u8) -> [(Indicator, u8); 6] {
    let bit = |n: u8| (data >> n) & 1;
    [
        (Indicator::Sync, bit(0)),
        (Indicator::EditLed, bit(1)),
        (Indicator::TriggerOut, bit(2) ^ 1),
        (Indicator::LfoToFilter, bit(3) ^ 1),
        (Indicator::LfoToOsc, bit(4) ^ 1),
        (Indicator::LfoShape, bit(5)),
    ]
}
