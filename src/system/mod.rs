//! Machine composition, configuration and save states.
//!
//! This module provides the top-level [`SourceMachine`] that routes bus
//! traffic to the hardware blocks and keeps the analog drivers in step with
//! the host's scheduler, plus [`BenchHost`], a recording host for tests and
//! demos.

mod bench_host;
mod config;
mod panel_inputs;
mod savestate;
mod source_machine;

pub use bench_host::BenchHost;
pub use config::{Calibration, FirmwareRevision, SourceConfig, XTAL_HZ};
pub use panel_inputs::PanelInputs;
pub use savestate::{SaveState, SAVESTATE_MAGIC, SAVESTATE_VERSION};
pub use source_machine::SourceMachine;
