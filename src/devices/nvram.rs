//! Battery-backed program memory.
//!
//! 1KB of CMOS RAM kept alive by a battery; the firmware stores the 16 user
//! programs and its calibration data here. The contents are opaque to the
//! core: hosts persist them through [`Nvram::contents`] and [`Nvram::load`].

use super::Device;
use crate::SourceError;

/// Size of the battery-backed RAM.
pub const NVRAM_SIZE: usize = 0x400;

/// Battery-backed RAM window at 0x2000.
#[derive(Clone, PartialEq, Eq)]
pub struct Nvram {
    data: Vec<u8>,
}

impl Nvram {
    /// Create cleared NVRAM.
    pub fn new() -> Self {
        Self {
            data: vec![0; NVRAM_SIZE],
        }
    }

    /// Restore previously saved contents.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::NvramSize`] unless `image` is exactly 1KB.
    pub fn load(&mut self, image: &[u8]) -> Result<(), SourceError> {
        if image.len() != NVRAM_SIZE {
            return Err(SourceError::NvramSize {
                expected: NVRAM_SIZE,
                actual: image.len(),
            });
        }
        self.data.copy_from_slice(image);
        Ok(())
    }

    /// Current contents, for persisting.
    pub fn contents(&self) -> &[u8] {
        &self.data
    }
}

impl Default for Nvram {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Nvram {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Nvram").field("size", &self.data.len()).finish()
    }
}

impl Device for Nvram {
    fn read(&self, offset: u16) -> u8 {
        self.data[offset as usize % NVRAM_SIZE]
    }

    fn write(&mut self, offset: u16, value: u8) {
        self.data[offset as usize % NVRAM_SIZE] = value;
    }

    fn size(&self) -> u16 {
        NVRAM_SIZE as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nvram_read_write() {
        let mut nvram = Nvram::new();
        assert_eq!(nvram.read(0), 0);

        nvram.write(0, 0x12);
        nvram.write(0x3FF, 0x34);
        assert_eq!(nvram.read(0), 0x12);
        assert_eq!(nvram.read(0x3FF), 0x34);
    }

    #[test]
    fn test_nvram_load_and_export() {
        let image: Vec<u8> = (0..NVRAM_SIZE).map(|i| (i * 7) as u8).collect();
        let mut nvram = Nvram::new();
        nvram.load(&image).unwrap();
        assert_eq!(nvram.contents(), &image[..]);
    }

    #[test]
    fn test_nvram_load_wrong_size() {
        let mut nvram = Nvram::new();
        assert_eq!(
            nvram.load(&[1, 2, 3]),
            Err(SourceError::NvramSize {
                expected: NVRAM_SIZE,
                actual: 3
            })
        );
    }
}
