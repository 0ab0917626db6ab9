//! Hardware blocks of the control board.
//!
//! Each block is a plain state machine that knows nothing about the bus or
//! the host. [`SourceMachine`](crate::SourceMachine) decodes bus accesses,
//! hands them to the right block and forwards the results to the host.
//!
//! # Architecture
//!
//! - **Memory devices**: firmware ROM and NVRAM, addressed by offset through
//!   the [`Device`] trait
//! - **CV store**: DAC channel table and channel side effects
//! - **Analog drivers**: the two contours and the LFO timer
//! - **Front panel**: keyboard ladder, button matrix, octave latch, encoder,
//!   display and output latches

pub mod buttons;
pub mod contour;
pub mod cv;
pub mod display;
pub mod encoder;
pub mod keyboard;
pub mod lfo;
pub mod nvram;
pub mod output_latch;
pub mod rom;

pub use buttons::{ButtonGroup, ButtonMatrix, OctaveLatch, OctaveSelect};
pub use contour::{Contour, ContourKind, ContourUpdate};
pub use cv::{CvChannel, CvEffect, CvStore, CvWrite};
pub use encoder::{Direction, Encoder};
pub use lfo::{Lfo, LfoSchedule, PeriodicTimer};
pub use nvram::Nvram;
pub use output_latch::{KeyboardTracking, OscWaveform};
pub use rom::FirmwareRom;

/// Memory-mapped storage addressed by offset.
///
/// The bus decoder strips mirror bits and the region base before calling
/// these methods, so `offset` is always in `0..size()`.
///
/// # Examples
///
/// ```rust
/// use moog_source::{Device, Nvram};
///
/// let mut nvram = Nvram::new();
/// nvram.write(0x10, 0x42);
/// assert_eq!(nvram.read(0x10), 0x42);
/// assert_eq!(nvram.size(), 1024);
/// ```
pub trait Device {
    /// Read byte at `offset`.
    fn read(&self, offset: u16) -> u8;

    /// Write byte at `offset`. Read-only devices ignore writes.
    fn write(&mut self, offset: u16, value: u8);

    /// Size of the device's address space in bytes.
    fn size(&self) -> u16;
}
