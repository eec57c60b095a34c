//! Trigger port abstraction
//!
//! A trigger port is the channel through which event codes reach the recording
//! hardware. Four variants exist, selected once at experiment setup:
//!
//! - [`NullPort`] - no hardware, used for dry runs and testing
//! - [`ParallelPort`] - an LPT data register (raw byte writes)
//! - [`DaqPort`] - an 8-line digital output group on an NI-DAQmx card (raw byte writes)
//! - [`SerialPort`] - a serial trigger box (one character per code)
//!
//! All variants implement the [`TriggerOutput`] capability and are held in the
//! [`Port`] tagged union, so dispatch is exhaustive and a port can never silently
//! change mode after construction.
//!
//! Hardware variants own a backend that does the actual I/O. Backends can be
//! injected (see [`mock`]) to drive the trigger protocol without hardware.

pub mod daq;
pub mod init;
pub mod mock;
pub mod null;
pub mod parallel;
pub mod serial;

pub use daq::DaqPort;
pub use init::{initialize, open_port, PortSettings};
pub use mock::{MockSink, WriteLog};
pub use null::NullPort;
pub use parallel::{ParallelAddress, ParallelPort};
pub use serial::SerialPort;

use crate::error::{AppResult, StimError};
use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An event marker value, 0-255.
///
/// Zero is reserved as the idle level of the port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerCode(u8);

impl TriggerCode {
    /// Idle level; no trigger on the port.
    pub const IDLE: TriggerCode = TriggerCode(0);
    /// All lines high, used by the baseline reset.
    pub const MAX: TriggerCode = TriggerCode(u8::MAX);

    /// Wrap a raw byte.
    pub const fn new(value: u8) -> Self {
        TriggerCode(value)
    }

    /// Raw byte value.
    pub const fn value(self) -> u8 {
        self.0
    }

    /// True for the reserved idle value.
    pub const fn is_idle(self) -> bool {
        self.0 == 0
    }
}

impl From<u8> for TriggerCode {
    fn from(value: u8) -> Self {
        TriggerCode(value)
    }
}

impl TryFrom<i64> for TriggerCode {
    type Error = StimError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map(TriggerCode)
            .map_err(|_| StimError::CodeOutOfRange(value))
    }
}

impl fmt::Display for TriggerCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which kind of port a session uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortMode {
    /// No hardware (selector 0)
    None,
    /// LPT data register (selector 1)
    Parallel,
    /// NI-DAQmx digital lines (selector 2)
    Daq,
    /// Serial trigger box (selector 3)
    Serial,
}

impl PortMode {
    /// Numeric selector used by experiment scripts.
    pub fn selector(self) -> i64 {
        match self {
            PortMode::None => 0,
            PortMode::Parallel => 1,
            PortMode::Daq => 2,
            PortMode::Serial => 3,
        }
    }
}

impl TryFrom<i64> for PortMode {
    type Error = StimError;

    fn try_from(selector: i64) -> Result<Self, Self::Error> {
        match selector {
            0 => Ok(PortMode::None),
            1 => Ok(PortMode::Parallel),
            2 => Ok(PortMode::Daq),
            3 => Ok(PortMode::Serial),
            other => Err(StimError::UnsupportedMode(other)),
        }
    }
}

impl fmt::Display for PortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortMode::None => write!(f, "none"),
            PortMode::Parallel => write!(f, "parallel"),
            PortMode::Daq => write!(f, "daq"),
            PortMode::Serial => write!(f, "serial"),
        }
    }
}

/// Low-level byte writer behind a register-style port.
///
/// Implementations must perform a single immediate write and never block for
/// longer than the OS call itself.
pub trait ByteSink: Send {
    /// Put `value` on the output lines.
    fn put(&mut self, value: u8) -> std::io::Result<()>;
}

/// Capability shared by every port variant.
#[enum_dispatch]
pub trait TriggerOutput {
    /// The mode this port was constructed for.
    fn mode(&self) -> PortMode;

    /// Human-readable identification used in logs and errors.
    fn describe(&self) -> String;

    /// Assert `code` on the port immediately.
    fn write(&mut self, code: TriggerCode) -> AppResult<()>;
}

/// A trigger port, one of the four supported variants.
#[enum_dispatch(TriggerOutput)]
pub enum Port {
    /// No hardware
    Null(NullPort),
    /// LPT data register
    Parallel(ParallelPort),
    /// NI-DAQmx digital output lines
    Daq(DaqPort),
    /// Serial trigger box
    Serial(SerialPort),
}

impl Port {
    /// The no-op sentinel port.
    pub fn null() -> Self {
        Port::Null(NullPort::new())
    }

    /// True when no real hardware is behind this port.
    pub fn is_null(&self) -> bool {
        matches!(self, Port::Null(_))
    }
}

impl Default for Port {
    fn default() -> Self {
        Port::null()
    }
}

impl fmt::Debug for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Port").field(&self.describe()).finish()
    }
}

pub(crate) fn write_error(port: &impl TriggerOutput, source: std::io::Error) -> StimError {
    StimError::Write {
        port: port.describe(),
        source,
    }
}
