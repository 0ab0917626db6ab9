//! # Bus Decoding
//!
//! The `MemoryBus` trait the CPU core drives, plus the static address decode
//! tables of the control board.
//!
//! ## Design Principles
//!
//! The decode follows the board's address decoders:
//! - No bus errors: reads and writes always succeed
//! - Unmapped reads float high (0xFF), unmapped writes are dropped
//! - Decoders ignore address lines, so every region is mirrored: an address
//!   belongs to a region when `addr & !mirror` lies in `[start, end]`
//! - The I/O space only decodes the low 8 address bits; ports 0x00-0x1F,
//!   mirrored over bits 5-7, select a DAC channel by their low 5 bits
//!
//! ## Memory Map
//!
//! | Range           | Mirror | Read           | Write            |
//! |-----------------|--------|----------------|------------------|
//! | 0x0000-0x0FFF   | 0x1000 | firmware ROM   |                  |
//! | 0x0000          | 0x1FFF |                | edit latch       |
//! | 0x2000-0x23FF   | 0x1C00 | NVRAM          | NVRAM            |
//! | 0x4000          | 0x1FE7 |                | output latch A   |
//! | 0x4008          | 0x1FE7 |                | output latch B   |
//! | 0x6000          | 0x1FFF | keyboard status| cassette         |
//! | 0x8000          | 0x1FFF | buttons A      | button row latch |
//! | 0xA000          | 0x1FFF | buttons B      |                  |
//! | 0xC000          | 0x1FFF |                | program latch    |
//! | 0xE000          | 0x1FFF | encoder        |                  |

/// Bus trait the CPU core reads and writes through.
///
/// Reads take `&mut self`: several ports on this board have read side
/// effects (reading the encoder acknowledges its interrupt).
///
/// # Examples
///
/// ```
/// use moog_source::MemoryBus;
///
/// struct OpenBus;
///
/// impl MemoryBus for OpenBus {
///     fn read(&mut self, _addr: u16) -> u8 {
///         0xFF
///     }
///
///     fn write(&mut self, _addr: u16, _value: u8) {}
/// }
///
/// let mut bus = OpenBus;
/// assert_eq!(bus.read(0x1234), 0xFF);
/// assert_eq!(bus.io_read(0x10), 0xFF);
/// assert!(!bus.irq_active());
/// ```
pub trait MemoryBus {
    /// Read a byte from memory space.
    fn read(&mut self, addr: u16) -> u8;

    /// Write a byte to memory space.
    fn write(&mut self, addr: u16, value: u8);

    /// Read a byte from I/O space. Nothing on this board answers I/O reads.
    fn io_read(&mut self, _port: u16) -> u8 {
        UNMAPPED_VALUE
    }

    /// Write a byte to I/O space.
    fn io_write(&mut self, _port: u16, _value: u8) {}

    /// Whether any device is asserting the interrupt line.
    fn irq_active(&self) -> bool {
        false
    }
}

/// Value read from addresses no device answers.
pub const UNMAPPED_VALUE: u8 = 0xFF;

/// Memory-space read ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadPort {
    /// 4KB firmware ROM.
    Firmware,
    /// 1KB battery-backed RAM.
    Nvram,
    /// Keyboard comparator, contour peak detectors and misc status bits.
    KeyboardStatus,
    /// Button matrix, column group A.
    ButtonsA,
    /// Button matrix, column group B.
    ButtonsB,
    /// Rotary encoder direction.
    Encoder,
}

/// Memory-space write ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WritePort {
    /// Two-digit parameter display.
    EditLatch,
    /// 1KB battery-backed RAM.
    Nvram,
    /// Keyboard tracking and oscillator waveforms.
    OutputLatchA,
    /// Sync, edit LED, trigger out and LFO routing.
    OutputLatchB,
    /// Cassette interface output.
    Cassette,
    /// Button matrix row select.
    ButtonRowLatch,
    /// Program number display.
    ProgramLatch,
}

/// One mirrored address range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region<P> {
    /// First decoded address.
    pub start: u16,
    /// Last decoded address (inclusive).
    pub end: u16,
    /// Address lines the decoder ignores.
    pub mirror: u16,
    /// Port selected by the range.
    pub port: P,
}

impl<P: Copy> Region<P> {
    const fn new(start: u16, end: u16, mirror: u16, port: P) -> Self {
        Self {
            start,
            end,
            mirror,
            port,
        }
    }

    /// Offset of `addr` within the region, if the region decodes it.
    pub fn decode(&self, addr: u16) -> Option<u16> {
        let base = addr & !self.mirror;
        if base >= self.start && base <= self.end {
            Some(base - self.start)
        } else {
            None
        }
    }
}

/// Memory-space read decoders.
pub const READ_MAP: [Region<ReadPort>; 6] = [
    Region::new(0x0000, 0x0FFF, 0x1000, ReadPort::Firmware),
    Region::new(0x2000, 0x23FF, 0x1C00, ReadPort::Nvram),
    Region::new(0x6000, 0x6000, 0x1FFF, ReadPort::KeyboardStatus),
    Region::new(0x8000, 0x8000, 0x1FFF, ReadPort::ButtonsA),
    Region::new(0xA000, 0xA000, 0x1FFF, ReadPort::ButtonsB),
    Region::new(0xE000, 0xE000, 0x1FFF, ReadPort::Encoder),
];

/// Memory-space write decoders.
pub const WRITE_MAP: [Region<WritePort>; 7] = [
    Region::new(0x0000, 0x0000, 0x1FFF, WritePort::EditLatch),
    Region::new(0x2000, 0x23FF, 0x1C00, WritePort::Nvram),
    Region::new(0x4000, 0x4000, 0x1FE7, WritePort::OutputLatchA),
    Region::new(0x4008, 0x4008, 0x1FE7, WritePort::OutputLatchB),
    Region::new(0x6000, 0x6000, 0x1FFF, WritePort::Cassette),
    Region::new(0x8000, 0x8000, 0x1FFF, WritePort::ButtonRowLatch),
    Region::new(0xC000, 0xC000, 0x1FFF, WritePort::ProgramLatch),
];

/// Address lines the I/O decoder looks at.
pub const IO_ADDRESS_MASK: u16 = 0x00FF;

/// Address lines the DAC channel decoder ignores.
pub const CV_PORT_MIRROR: u16 = 0x00E0;

/// Find the read port and offset for a memory address.
pub fn decode_read(addr: u16) -> Option<(ReadPort, u16)> {
    READ_MAP
        .iter()
        .find_map(|region| region.decode(addr).map(|offset| (region.port, offset)))
}

/// Find the write port and offset for a memory address.
pub fn decode_write(addr: u16) -> Option<(WritePort, u16)> {
    WRITE_MAP
        .iter()
        .find_map(|region| region.decode(addr).map(|offset| (region.port, offset)))
}

/// DAC channel offset (0..32) selected by an I/O port address.
///
/// Offsets 24 and up decode but have no channel behind them.
pub fn cv_offset(port: u16) -> u8 {
    ((port & IO_ADDRESS_MASK) & !CV_PORT_MIRROR) as u8
}
