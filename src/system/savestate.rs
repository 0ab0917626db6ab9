//! Save state serialization.
//!
//! A save state holds the control board's internal latches and driver state.
//! It does not include the firmware image (loaded separately) or anything
//! owned by the host: virtual time, the solver's capacitor voltages and
//! pending events. The LFO timer position is not stored either; on restore
//! the LFO starts a fresh half-cycle.
//!
//! ## Binary Format
//!
//! All multi-byte values are little-endian.
//! - 4 bytes: Magic number "MSRC"
//! - 4 bytes: Version (u32)
//! - 1 byte: Flags (D0 octave hi, D1 encoder incr, D2 encoder IRQ, D3 LFO state)
//! - 1 byte: Button row latch
//! - 4 bytes: LFO control current (f32)
//! - 8 bytes: Filter and loudness control currents (f32 each)
//! - 24 bytes: Raw byte of each CV channel
//! - 2 bytes: NVRAM length (u16), then the NVRAM bytes
//!
//! ## Usage
//!
//! ```rust
//! use moog_source::{BenchHost, SaveState, SourceMachine};
//!
//! let mut machine = SourceMachine::new(BenchHost::new());
//! let bytes = machine.save_state().serialize();
//!
//! let state = SaveState::deserialize(&bytes).unwrap();
//! machine.load_state(&state).unwrap();
//! ```

use crate::devices::cv::CV_CHANNEL_COUNT;
use crate::SourceError;

/// Current save state format version.
pub const SAVESTATE_VERSION: u32 = 1;

/// Magic number for save states ("MSRC" in ASCII).
pub const SAVESTATE_MAGIC: [u8; 4] = [b'M', b'S', b'R', b'C'];

/// Size of the header (magic + version).
const HEADER_SIZE: usize = 4 + 4;

const FLAG_OCTAVE_HI: u8 = 0x01;
const FLAG_ENCODER_INCR: u8 = 0x02;
const FLAG_ENCODER_IRQ: u8 = 0x04;
const FLAG_LFO_STATE: u8 = 0x08;

/// Captured control board state.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveState {
    /// Octave latch set ("+1" selected).
    pub octave_hi: bool,
    /// Last encoder movement was an increment.
    pub encoder_incr: bool,
    /// Encoder interrupt pending.
    pub encoder_irq: bool,
    /// LFO square-wave output.
    pub lfo_state: bool,
    /// Button matrix row latch.
    pub button_row_latch: u8,
    /// LFO control current in amps.
    pub lfo_cc: f32,
    /// Filter and loudness control currents in amps.
    pub contour_cc: [f32; 2],
    /// Last raw byte per CV channel.
    pub cv: [u8; CV_CHANNEL_COUNT],
    /// NVRAM contents.
    pub nvram: Vec<u8>,
}

impl SaveState {
    /// Serialize to the binary format.
    pub fn serialize(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.serialized_size());

        data.extend_from_slice(&SAVESTATE_MAGIC);
        data.extend_from_slice(&SAVESTATE_VERSION.to_le_bytes());

        let mut flags = 0;
        if self.octave_hi {
            flags |= FLAG_OCTAVE_HI;
        }
        if self.encoder_incr {
            flags |= FLAG_ENCODER_INCR;
        }
        if self.encoder_irq {
            flags |= FLAG_ENCODER_IRQ;
        }
        if self.lfo_state {
            flags |= FLAG_LFO_STATE;
        }
        data.push(flags);
        data.push(self.button_row_latch);

        data.extend_from_slice(&self.lfo_cc.to_le_bytes());
        for cc in self.contour_cc {
            data.extend_from_slice(&cc.to_le_bytes());
        }

        data.extend_from_slice(&self.cv);

        // NVRAM is 1KB; anything past 64KB cannot be a valid image anyway.
        let nvram_len = self.nvram.len().min(u16::MAX as usize);
        data.extend_from_slice(&(nvram_len as u16).to_le_bytes());
        data.extend_from_slice(&self.nvram[..nvram_len]);

        data
    }

    /// Deserialize from the binary format.
    ///
    /// # Errors
    ///
    /// - [`SourceError::Truncated`] if the data ends early
    /// - [`SourceError::BadMagic`] if the magic number does not match
    /// - [`SourceError::UnsupportedVersion`] for other format versions
    pub fn deserialize(data: &[u8]) -> Result<Self, SourceError> {
        let mut reader = Reader { data, pos: 0 };

        if data.len() < HEADER_SIZE {
            return Err(SourceError::Truncated("header"));
        }
        if reader.bytes::<4>("header")? != SAVESTATE_MAGIC {
            return Err(SourceError::BadMagic);
        }
        let version = u32::from_le_bytes(reader.bytes::<4>("header")?);
        if version != SAVESTATE_VERSION {
            return Err(SourceError::UnsupportedVersion(version));
        }

        let flags = reader.u8("flags")?;
        let button_row_latch = reader.u8("button latch")?;
        let lfo_cc = f32::from_le_bytes(reader.bytes::<4>("control currents")?);
        let contour_cc = [
            f32::from_le_bytes(reader.bytes::<4>("control currents")?),
            f32::from_le_bytes(reader.bytes::<4>("control currents")?),
        ];

        let cv = reader.bytes::<CV_CHANNEL_COUNT>("CV table")?;

        let nvram_len = u16::from_le_bytes(reader.bytes::<2>("NVRAM")?) as usize;
        let nvram = reader.slice(nvram_len, "NVRAM")?.to_vec();

        Ok(Self {
            octave_hi: flags & FLAG_OCTAVE_HI != 0,
            encoder_incr: flags & FLAG_ENCODER_INCR != 0,
            encoder_irq: flags & FLAG_ENCODER_IRQ != 0,
            lfo_state: flags & FLAG_LFO_STATE != 0,
            button_row_latch,
            lfo_cc,
            contour_cc,
            cv,
            nvram,
        })
    }

    /// Size of the serialized state in bytes.
    pub fn serialized_size(&self) -> usize {
        HEADER_SIZE + 2 + 4 + 8 + CV_CHANNEL_COUNT + 2 + self.nvram.len().min(u16::MAX as usize)
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn slice(&mut self, len: usize, section: &'static str) -> Result<&'a [u8], SourceError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(SourceError::Truncated(section))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn bytes<const N: usize>(&mut self, section: &'static str) -> Result<[u8; N], SourceError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.slice(N, section)?);
        Ok(out)
    }

    fn u8(&mut self, section: &'static str) -> Result<u8, SourceError> {
        Ok(self.bytes::<1>(section)?[0])
    }
}
