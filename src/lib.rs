//! # Moog Source Control Core
//!
//! Emulation of the digital control board of the Moog Source, a
//! microprocessor-controlled analog monosynth, and of every analog behavior
//! its firmware can observe.
//!
//! The firmware running on the Z80 scans a membrane button matrix, finds the
//! pressed key through a successive-approximation comparator, writes control
//! voltages (CVs) through a DAC into sample-and-hold channels, and drives two
//! OTA-based envelope generators ("contours") and a triangle-core LFO. This
//! crate models that boundary: CPU bus accesses come in, analog quantities
//! (resistances, target voltages, timer periods) go out to a circuit solver,
//! and comparator decisions derived from the analog state come back as bits
//! on the data bus.
//!
//! ## Quick Start
//!
//! ```rust
//! use moog_source::{BenchHost, CvChannel, MemoryBus, SourceMachine};
//!
//! let mut machine = SourceMachine::new(BenchHost::new());
//! machine.reset();
//!
//! // Z80 `OUT (0x13), A` with A = 0xFF: MOD RATE CV to 10V.
//! machine.io_write(0x13, 0xFF);
//! assert_eq!(machine.cv().voltage(CvChannel::ModRate), 10.0);
//!
//! // Every DAC write stalls the CPU for 32 cycles.
//! assert_eq!(machine.host().cycle_adjustments(), &[-32]);
//! ```
//!
//! ## Architecture
//!
//! - **Composition**: [`SourceMachine`] owns every hardware block plus a host
//!   implementing the collaborator traits in [`services`] (CPU control,
//!   circuit solver, input ports, indicators, scheduler)
//! - **Virtual time**: analog updates run through the scheduler's
//!   `synchronize`, so they are totally ordered with solver notifications
//! - **No bus errors**: reads and writes always succeed; out-of-range values
//!   are masked exactly as the hardware decoders mask them
//!
//! ## Modules
//!
//! - `analog` - Component-value helpers and the reference RC contour model
//! - `bus` - `MemoryBus` trait and the address decode tables
//! - `devices` - One module per hardware block (CV DAC, contours, LFO, ...)
//! - `scheduler` - Virtual-time event queue
//! - `services` - Collaborator traits the core is driven through
//! - `system` - Machine composition, configuration and save states

pub mod analog;
pub mod bus;
pub mod devices;
pub mod scheduler;
pub mod services;
pub mod system;

// Re-export public API
pub use analog::RcEnvelope;
pub use bus::{MemoryBus, ReadPort, WritePort};
pub use devices::{
    ButtonGroup, ButtonMatrix, Contour, ContourKind, CvChannel, CvStore, Device, Direction,
    Encoder, FirmwareRom, Lfo, Nvram, OctaveLatch, OctaveSelect,
};
pub use scheduler::{EventQueue, MachineEvent};
pub use services::{
    AnalogInput, AnalogOutput, CircuitSolver, CpuControl, Host, Indicator, Indicators,
    InputPorts, Scheduler, Trimmer,
};
pub use system::{BenchHost, Calibration, PanelInputs, SaveState, SourceConfig, SourceMachine};

/// Errors raised while setting up or restoring a machine.
///
/// Bus traffic never fails; these only come out of loading firmware, loading
/// NVRAM contents, and decoding save states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Firmware image does not match the 4KB ROM socket.
    FirmwareSize {
        /// Required image size in bytes
        expected: usize,
        /// Size of the supplied image
        actual: usize,
    },

    /// NVRAM image does not match the battery-backed RAM size.
    NvramSize {
        /// Required image size in bytes
        expected: usize,
        /// Size of the supplied image
        actual: usize,
    },

    /// Save state does not start with the expected magic number.
    BadMagic,

    /// Save state was written by an incompatible format version.
    UnsupportedVersion(u32),

    /// Save state ended before the named section was complete.
    Truncated(&'static str),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SourceError::FirmwareSize { expected, actual } => {
                write!(
                    f,
                    "Firmware ROM must be {} bytes, got {}",
                    expected, actual
                )
            }
            SourceError::NvramSize { expected, actual } => {
                write!(f, "NVRAM image must be {} bytes, got {}", expected, actual)
            }
            SourceError::BadMagic => write!(f, "Invalid save state magic number"),
            SourceError::UnsupportedVersion(version) => {
                write!(f, "Unsupported save state version {}", version)
            }
            SourceError::Truncated(section) => {
                write!(f, "Save state truncated at {}", section)
            }
        }
    }
}

impl std::error::Error for SourceError {}
