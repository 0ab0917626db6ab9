//! Firmware ROM.
//!
//! The control board carries a single 2732 EPROM in socket U23 holding the
//! 4KB Z80 firmware. Revision 3.3 ("3p3.u23") is the last factory release.

use super::Device;
use crate::SourceError;

/// Size of the firmware EPROM.
pub const FIRMWARE_SIZE: usize = 0x1000;

/// Firmware EPROM (U23).
///
/// Starts out erased (all 0xFF) until an image is loaded. Writes are ignored.
///
/// # Examples
///
/// ```rust
/// use moog_source::{Device, FirmwareRom};
///
/// let mut rom = FirmwareRom::new();
/// assert_eq!(rom.read(0), 0xFF);
///
/// let mut image = vec![0u8; 0x1000];
/// image[0] = 0xF3; // di
/// rom.load(&image).unwrap();
/// assert_eq!(rom.read(0), 0xF3);
///
/// // Wrong-sized images are rejected.
/// assert!(rom.load(&[0u8; 16]).is_err());
/// ```
#[derive(Clone)]
pub struct FirmwareRom {
    data: Box<[u8; FIRMWARE_SIZE]>,
}

impl FirmwareRom {
    /// Create an erased ROM.
    pub fn new() -> Self {
        Self {
            data: Box::new([0xFF; FIRMWARE_SIZE]),
        }
    }

    /// Replace the ROM contents with `image`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::FirmwareSize`] unless `image` is exactly 4KB.
    pub fn load(&mut self, image: &[u8]) -> Result<(), SourceError> {
        if image.len() != FIRMWARE_SIZE {
            return Err(SourceError::FirmwareSize {
                expected: FIRMWARE_SIZE,
                actual: image.len(),
            });
        }
        self.data.copy_from_slice(image);
        Ok(())
    }

    /// Raw ROM contents.
    pub fn contents(&self) -> &[u8] {
        &self.data[..]
    }
}

impl Default for FirmwareRom {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FirmwareRom {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("FirmwareRom")
            .field("size", &FIRMWARE_SIZE)
            .finish()
    }
}

impl Device for FirmwareRom {
    fn read(&self, offset: u16) -> u8 {
        self.data[offset as usize % FIRMWARE_SIZE]
    }

    fn write(&mut self, _offset: u16, _value: u8) {
        // EPROM: writes never reach the chip
    }

    fn size(&self) -> u16 {
        FIRMWARE_SIZE as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rom_erased() {
        let rom = FirmwareRom::new();
        assert_eq!(rom.size(), 0x1000);
        assert_eq!(rom.read(0), 0xFF);
        assert_eq!(rom.read(0x0FFF), 0xFF);
    }

    #[test]
    fn test_rom_load() {
        let image: Vec<u8> = (0..FIRMWARE_SIZE).map(|i| i as u8).collect();
        let mut rom = FirmwareRom::new();
        rom.load(&image).unwrap();

        assert_eq!(rom.read(0x0001), 0x01);
        assert_eq!(rom.read(0x0FFF), 0xFF);
        assert_eq!(rom.contents(), &image[..]);
    }

    #[test]
    fn test_rom_load_wrong_size() {
        let mut rom = FirmwareRom::new();
        let err = rom.load(&[0u8; 0x800]).unwrap_err();
        assert_eq!(
            err,
            SourceError::FirmwareSize {
                expected: 0x1000,
                actual: 0x800
            }
        );
        // Failed load leaves the ROM untouched.
        assert_eq!(rom.read(0), 0xFF);
    }

    #[test]
    fn test_rom_write_ignored() {
        let mut rom = FirmwareRom::new();
        rom.write(0x10, 0x00);
        assert_eq!(rom.read(0x10), 0xFF);
    }
}
