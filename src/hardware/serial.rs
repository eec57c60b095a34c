//! Serial trigger box output
//!
//! Serial trigger boxes read a character stream rather than exposing a
//! register, so each code goes out as the single character `char::from(code)`.
//! That character is encoded as one Latin-1 byte, which makes the byte on the
//! wire identical to what a register port would show for the same code.

use super::{write_error, PortMode, TriggerCode, TriggerOutput};
use crate::error::{AppResult, StimError};
use std::io::Write;
#[cfg(feature = "instrument_serial")]
use std::time::Duration;
use tracing::debug;

/// Baud rate used when none is configured.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// The character a serial trigger box expects for `code`.
pub fn encode(code: TriggerCode) -> char {
    char::from(code.value())
}

/// Serial-port trigger output.
pub struct SerialPort {
    device: String,
    stream: Box<dyn Write + Send>,
}

impl SerialPort {
    /// Open the serial device at `device` (e.g. `/dev/ttyUSB0`, `COM6`).
    ///
    /// # Errors
    ///
    /// Returns `StimError::Initialization` if the device does not exist, is busy,
    /// or serial support was not compiled in.
    #[cfg(feature = "instrument_serial")]
    pub fn open(device: &str, baud_rate: u32) -> AppResult<Self> {
        let port = serialport::new(device, baud_rate)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(|err| {
                StimError::init(
                    PortMode::Serial,
                    format!("failed to open serial port '{}' at {} baud: {}", device, baud_rate, err),
                )
            })?;
        debug!(device, baud_rate, "Serial trigger port opened");
        Ok(Self {
            device: device.to_string(),
            stream: Box::new(port),
        })
    }

    /// Open the serial device at `device` (e.g. `/dev/ttyUSB0`, `COM6`).
    ///
    /// # Errors
    ///
    /// Always fails: serial support was not compiled in.
    #[cfg(not(feature = "instrument_serial"))]
    pub fn open(device: &str, baud_rate: u32) -> AppResult<Self> {
        debug!(device, baud_rate, "Serial trigger port requested without serial support");
        Err(StimError::init(
            PortMode::Serial,
            "serial support not enabled. Rebuild with --features instrument_serial",
        ))
    }

    /// Build a port over an existing byte stream.
    pub fn with_stream(device: impl Into<String>, stream: impl Write + Send + 'static) -> Self {
        Self {
            device: device.into(),
            stream: Box::new(stream),
        }
    }

    /// Device path or name.
    pub fn device(&self) -> &str {
        &self.device
    }
}

impl TriggerOutput for SerialPort {
    fn mode(&self) -> PortMode {
        PortMode::Serial
    }

    fn describe(&self) -> String {
        format!("serial port {}", self.device)
    }

    fn write(&mut self, code: TriggerCode) -> AppResult<()> {
        // Latin-1: every char below U+0100 is exactly one byte.
        let byte = encode(code) as u8;
        self.stream
            .write_all(&[byte])
            .map_err(|err| write_error(&*self, err))
    }
}
