//! LPT (parallel port) trigger output
//!
//! Two ways of reaching the data register are supported:
//!
//! - `ParallelAddress::Register(0x378)` writes the byte straight into the I/O
//!   register through `/dev/port` (needs root or `CAP_SYS_RAWIO`).
//! - `ParallelAddress::Device("/dev/parport0")` goes through the Linux `ppdev`
//!   driver, which claims the port for this process and releases it on drop.
//!
//! Either way, a write puts the raw byte on data pins D0-D7.

use super::{write_error, ByteSink, PortMode, TriggerCode, TriggerOutput};
use crate::error::{AppResult, StimError};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

/// Base address of the first on-board LPT port (888 decimal).
pub const DEFAULT_LPT_ADDRESS: u16 = 0x378;

/// Where the LPT data register lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParallelAddress {
    /// I/O register address, e.g. `0x378`
    Register(u16),
    /// ppdev character device, e.g. `/dev/parport0`
    Device(PathBuf),
}

impl Default for ParallelAddress {
    fn default() -> Self {
        ParallelAddress::Register(DEFAULT_LPT_ADDRESS)
    }
}

impl fmt::Display for ParallelAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParallelAddress::Register(address) => write!(f, "{:#x}", address),
            ParallelAddress::Device(path) => write!(f, "{}", path.display()),
        }
    }
}

impl FromStr for ParallelAddress {
    type Err = StimError;

    /// Accepts `0x378`, `888` or a device path such as `/dev/parport0`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || StimError::init(PortMode::Parallel, format!("invalid LPT address '{}'", s));

        if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            return u16::from_str_radix(hex, 16)
                .map(ParallelAddress::Register)
                .map_err(|_| invalid());
        }
        if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
            return s
                .parse::<u16>()
                .map(ParallelAddress::Register)
                .map_err(|_| invalid());
        }
        if s.contains('/') {
            return Ok(ParallelAddress::Device(PathBuf::from(s)));
        }
        Err(invalid())
    }
}

/// Parallel-port trigger output.
pub struct ParallelPort {
    address: ParallelAddress,
    sink: Box<dyn ByteSink>,
}

impl ParallelPort {
    /// Open the LPT port at `address`.
    ///
    /// # Errors
    ///
    /// Returns `StimError::Initialization` if the register or device cannot be
    /// opened (missing permissions, no such device, unsupported platform).
    pub fn open(address: ParallelAddress) -> AppResult<Self> {
        let sink: Box<dyn ByteSink> = match &address {
            ParallelAddress::Register(register) => Box::new(backend::RegisterFile::open(*register)?),
            ParallelAddress::Device(path) => Box::new(backend::Ppdev::open(path)?),
        };
        debug!(address = %address, "Parallel port opened");
        Ok(Self { address, sink })
    }

    /// Build a port over an existing backend.
    pub fn with_sink(address: ParallelAddress, sink: impl ByteSink + 'static) -> Self {
        Self {
            address,
            sink: Box::new(sink),
        }
    }

    /// Address of the data register.
    pub fn address(&self) -> &ParallelAddress {
        &self.address
    }
}

impl TriggerOutput for ParallelPort {
    fn mode(&self) -> PortMode {
        PortMode::Parallel
    }

    fn describe(&self) -> String {
        format!("parallel port {}", self.address)
    }

    fn write(&mut self, code: TriggerCode) -> AppResult<()> {
        self.sink
            .put(code.value())
            .map_err(|err| write_error(&*self, err))
    }
}

#[cfg(target_os = "linux")]
mod backend {
    use super::super::ByteSink;
    use crate::error::{AppResult, StimError};
    use crate::hardware::PortMode;
    use std::fs::{File, OpenOptions};
    use std::io;
    use std::os::unix::fs::FileExt;
    use std::os::unix::io::AsRawFd;
    use std::path::Path;

    // <linux/ppdev.h>
    const PPCLAIM: u64 = 0x708b;
    const PPRELEASE: u64 = 0x708c;
    const PPWDATA: u64 = 0x4001_7086;

    /// Direct register access through `/dev/port`.
    pub struct RegisterFile {
        file: File,
        register: u16,
    }

    impl RegisterFile {
        pub fn open(register: u16) -> AppResult<Self> {
            let file = OpenOptions::new()
                .write(true)
                .open("/dev/port")
                .map_err(|err| {
                    StimError::init(
                        PortMode::Parallel,
                        format!("cannot open /dev/port for register {:#x}: {}", register, err),
                    )
                })?;
            Ok(Self { file, register })
        }
    }

    impl ByteSink for RegisterFile {
        fn put(&mut self, value: u8) -> io::Result<()> {
            self.file.write_all_at(&[value], u64::from(self.register))
        }
    }

    /// Claimed ppdev device.
    pub struct Ppdev {
        file: File,
    }

    impl Ppdev {
        pub fn open(path: &Path) -> AppResult<Self> {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .open(path)
                .map_err(|err| {
                    StimError::init(
                        PortMode::Parallel,
                        format!("cannot open {}: {}", path.display(), err),
                    )
                })?;

            // SAFETY: the descriptor is valid for the lifetime of `file` and
            // PPCLAIM takes no argument.
            #[allow(unsafe_code)]
            let rc = unsafe { libc::ioctl(file.as_raw_fd(), PPCLAIM as _) };
            if rc != 0 {
                return Err(StimError::init(
                    PortMode::Parallel,
                    format!("cannot claim {}: {}", path.display(), io::Error::last_os_error()),
                ));
            }
            Ok(Self { file })
        }
    }

    impl ByteSink for Ppdev {
        fn put(&mut self, value: u8) -> io::Result<()> {
            // SAFETY: PPWDATA reads one byte through the pointer, which outlives the call.
            #[allow(unsafe_code)]
            let rc = unsafe { libc::ioctl(self.file.as_raw_fd(), PPWDATA as _, &value as *const u8) };
            if rc != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        }
    }

    impl Drop for Ppdev {
        fn drop(&mut self) {
            // SAFETY: releasing a port claimed in `open`; failure leaves nothing to clean up.
            #[allow(unsafe_code)]
            unsafe {
                libc::ioctl(self.file.as_raw_fd(), PPRELEASE as _);
            }
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod backend {
    use super::super::ByteSink;
    use crate::error::{AppResult, StimError};
    use crate::hardware::PortMode;
    use std::io;
    use std::path::Path;

    pub struct RegisterFile;

    impl RegisterFile {
        pub fn open(register: u16) -> AppResult<Self> {
            Err(StimError::init(
                PortMode::Parallel,
                format!("register access at {:#x} is only supported on Linux", register),
            ))
        }
    }

    impl ByteSink for RegisterFile {
        fn put(&mut self, _value: u8) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::Unsupported))
        }
    }

    pub struct Ppdev;

    impl Ppdev {
        pub fn open(path: &Path) -> AppResult<Self> {
            Err(StimError::init(
                PortMode::Parallel,
                format!("ppdev device {} is only supported on Linux", path.display()),
            ))
        }
    }

    impl ByteSink for Ppdev {
        fn put(&mut self, _value: u8) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::Unsupported))
        }
    }
}
