//! Port construction for an experiment session
//!
//! `open_port` turns a mode selector plus mode-specific parameters into exactly
//! one [`Port`] variant, then runs a baseline reset so the hardware starts from
//! a known state. The rules:
//!
//! | selector | result |
//! |---|---|
//! | 0 | null port, no reset |
//! | 1 | parallel port at `address`, or `0x378` when absent |
//! | 2 | NI-DAQmx lines, library located through `library_path` |
//! | 3 | serial port at `address`; null port when absent |
//! | other | null port with a diagnostic |
//!
//! Anything that fails while opening real hardware is a
//! `StimError::Initialization`; the null port is only ever returned when the
//! caller asked for it or gave no usable selector.

use super::{DaqPort, ParallelAddress, ParallelPort, Port, PortMode, SerialPort, TriggerOutput};
use crate::error::{AppResult, StimError};
use crate::trigger::reset;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use super::daq::DEFAULT_DAQ_LINES;
use super::serial::DEFAULT_BAUD_RATE;

/// Hold time of the baseline reset when none is configured.
pub const DEFAULT_RESET_HOLD: Duration = Duration::from_secs(1);

/// Everything needed to open a trigger port.
#[derive(Debug, Clone, PartialEq)]
pub struct PortSettings {
    /// Mode selector: 0 none, 1 parallel, 2 daq, 3 serial
    pub mode: i64,
    /// LPT register/device (mode 1) or serial device (mode 3)
    pub address: Option<String>,
    /// NI-DAQmx library file or directory (mode 2)
    pub library_path: Option<PathBuf>,
    /// NI-DAQmx line group (mode 2)
    pub daq_lines: String,
    /// Serial baud rate (mode 3)
    pub baud_rate: u32,
    /// How long the reset holds all lines high
    pub reset_hold: Duration,
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            mode: 0,
            address: None,
            library_path: None,
            daq_lines: DEFAULT_DAQ_LINES.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            reset_hold: DEFAULT_RESET_HOLD,
        }
    }
}

impl PortSettings {
    /// Settings for `mode` with every other value at its default.
    pub fn for_mode(mode: i64) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

/// Open the port described by `settings` and reset it.
///
/// # Errors
///
/// Returns `StimError::Initialization` if real hardware was requested and could
/// not be opened, and `StimError::Write` if the baseline reset fails.
pub fn open_port(settings: &PortSettings) -> AppResult<Port> {
    let mode = match PortMode::try_from(settings.mode) {
        Ok(mode) => mode,
        Err(err @ StimError::UnsupportedMode(_)) => {
            warn!("{}; no port initiated", err);
            return Ok(Port::null());
        }
        Err(err) => return Err(err),
    };

    let port = match mode {
        PortMode::None => {
            warn!("No port initiated (mode 0)");
            return Ok(Port::null());
        }
        PortMode::Parallel => {
            let address = match settings.address.as_deref() {
                Some(address) => address.parse::<ParallelAddress>()?,
                None => ParallelAddress::default(),
            };
            Port::from(ParallelPort::open(address)?)
        }
        PortMode::Daq => Port::from(DaqPort::open(
            settings.library_path.as_deref(),
            &settings.daq_lines,
        )?),
        PortMode::Serial => match settings.address.as_deref() {
            Some(device) if !device.trim().is_empty() => {
                Port::from(SerialPort::open(device.trim(), settings.baud_rate)?)
            }
            _ => {
                warn!("No serial address given; no port initiated");
                return Ok(Port::null());
            }
        },
    };

    initialize(port, settings.reset_hold)
}

/// Run the baseline reset on a freshly constructed port and hand it back.
///
/// # Errors
///
/// Returns `StimError::Write` if the port rejects either reset write.
pub fn initialize(mut port: Port, hold: Duration) -> AppResult<Port> {
    reset(&mut port, hold)?;
    info!(port = %port.describe(), "Trigger port ready");
    Ok(port)
}
