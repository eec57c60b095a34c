//! NI-DAQmx digital output trigger port
//!
//! Codes are written as one sample to a digital output task that spans eight
//! lines as a single channel (`Dev1/port0/line0:7` by default), so bit N of the
//! code drives line N.
//!
//! The NI-DAQmx C library is loaded at run time. Experiment machines rarely
//! have it on the default loader path, so a `library_path` can point at either
//! the library file itself or the directory that holds it.

use super::{write_error, ByteSink, PortMode, TriggerCode, TriggerOutput};
use crate::error::{AppResult, StimError};
use std::ffi::OsString;
use std::path::Path;
use tracing::debug;

/// Default line group: lines 0-7 of port 0 on the first device.
pub const DEFAULT_DAQ_LINES: &str = "Dev1/port0/line0:7";

/// Platform file name of the NI-DAQmx C library.
#[cfg(target_os = "windows")]
pub const DEFAULT_DAQMX_LIBRARY: &str = "nicaiu.dll";
/// Platform file name of the NI-DAQmx C library.
#[cfg(target_os = "macos")]
pub const DEFAULT_DAQMX_LIBRARY: &str = "libnidaqmx.dylib";
/// Platform file name of the NI-DAQmx C library.
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const DEFAULT_DAQMX_LIBRARY: &str = "libnidaqmx.so";

/// Work out which library file to load.
///
/// An explicit path must exist; without one the default file name is handed
/// to the system loader.
pub fn resolve_library(library_path: Option<&Path>) -> AppResult<OsString> {
    let Some(path) = library_path else {
        return Ok(OsString::from(DEFAULT_DAQMX_LIBRARY));
    };

    let candidate = if path.is_dir() {
        path.join(DEFAULT_DAQMX_LIBRARY)
    } else {
        path.to_path_buf()
    };

    if !candidate.is_file() {
        return Err(StimError::init(
            PortMode::Daq,
            format!("NI-DAQmx library not found at {}", candidate.display()),
        ));
    }
    Ok(candidate.into_os_string())
}

/// Digital-output trigger port.
pub struct DaqPort {
    lines: String,
    sink: Box<dyn ByteSink>,
}

impl DaqPort {
    /// Load NI-DAQmx and start a digital output task on `lines`.
    ///
    /// # Errors
    ///
    /// Returns `StimError::Initialization` if the library cannot be found or
    /// loaded, or if the driver refuses to create the task (unknown device,
    /// device reserved by another task).
    pub fn open(library_path: Option<&Path>, lines: &str) -> AppResult<Self> {
        let library = resolve_library(library_path)?;
        let task = daqmx::Task::start(&library, lines)?;
        debug!(lines, library = ?library, "NI-DAQmx digital output task started");
        Ok(Self {
            lines: lines.to_string(),
            sink: Box::new(task),
        })
    }

    /// Build a port over an existing backend.
    pub fn with_sink(lines: impl Into<String>, sink: impl ByteSink + 'static) -> Self {
        Self {
            lines: lines.into(),
            sink: Box::new(sink),
        }
    }

    /// Physical lines driven by this port.
    pub fn lines(&self) -> &str {
        &self.lines
    }
}

impl TriggerOutput for DaqPort {
    fn mode(&self) -> PortMode {
        PortMode::Daq
    }

    fn describe(&self) -> String {
        format!("daq lines {}", self.lines)
    }

    fn write(&mut self, code: TriggerCode) -> AppResult<()> {
        self.sink
            .put(code.value())
            .map_err(|err| write_error(&*self, err))
    }
}

#[allow(unsafe_code)]
mod daqmx {
    use super::ByteSink;
    use crate::error::{AppResult, StimError};
    use crate::hardware::PortMode;
    use libloading::Library;
    use std::ffi::{c_char, c_void, CString, OsStr};
    use std::io;
    use tracing::warn;

    type TaskHandle = *mut c_void;

    const DAQMX_VAL_CHAN_FOR_ALL_LINES: i32 = 1;
    const DAQMX_VAL_GROUP_BY_CHANNEL: u32 = 0;
    const WRITE_TIMEOUT_S: f64 = 1.0;

    type CreateTaskFn = unsafe extern "C" fn(*const c_char, *mut TaskHandle) -> i32;
    type CreateDoChanFn = unsafe extern "C" fn(TaskHandle, *const c_char, *const c_char, i32) -> i32;
    type TaskFn = unsafe extern "C" fn(TaskHandle) -> i32;
    type WriteDigitalU8Fn =
        unsafe extern "C" fn(TaskHandle, i32, u32, f64, u32, *const u8, *mut i32, *mut u32) -> i32;
    type ErrorInfoFn = unsafe extern "C" fn(*mut c_char, u32) -> i32;

    /// A running DAQmx task. Stopped and cleared on drop.
    pub struct Task {
        handle: TaskHandle,
        write: WriteDigitalU8Fn,
        stop: TaskFn,
        clear: TaskFn,
        error_info: ErrorInfoFn,
        // Keeps the function pointers above valid; dropped last.
        _library: Library,
    }

    // SAFETY: the task handle is only ever used through `&mut self` by the
    // single owner; DAQmx task handles may be used from any thread.
    unsafe impl Send for Task {}

    fn init_error(reason: impl Into<String>) -> StimError {
        StimError::init(PortMode::Daq, reason)
    }

    impl Task {
        pub fn start(library: &OsStr, lines: &str) -> AppResult<Self> {
            // SAFETY: loading the vendor library runs its initialisers; NI-DAQmx has
            // no initialisation-order requirements.
            let library = unsafe { Library::new(library) }.map_err(|err| {
                init_error(format!("cannot load NI-DAQmx library {:?}: {}", library, err))
            })?;

            // SAFETY: the signatures match the NI-DAQmx C API declarations.
            let (create_task, create_do_chan, start, write, stop, clear, error_info) = unsafe {
                (
                    symbol::<CreateTaskFn>(&library, b"DAQmxCreateTask\0")?,
                    symbol::<CreateDoChanFn>(&library, b"DAQmxCreateDOChan\0")?,
                    symbol::<TaskFn>(&library, b"DAQmxStartTask\0")?,
                    symbol::<WriteDigitalU8Fn>(&library, b"DAQmxWriteDigitalU8\0")?,
                    symbol::<TaskFn>(&library, b"DAQmxStopTask\0")?,
                    symbol::<TaskFn>(&library, b"DAQmxClearTask\0")?,
                    symbol::<ErrorInfoFn>(&library, b"DAQmxGetExtendedErrorInfo\0")?,
                )
            };

            let lines_c = CString::new(lines)
                .map_err(|_| init_error(format!("invalid line specification '{}'", lines)))?;
            let empty = CString::default();

            let mut handle: TaskHandle = std::ptr::null_mut();
            // SAFETY: `handle` is a valid out-pointer; strings are NUL-terminated and
            // outlive the calls.
            unsafe {
                check(create_task(empty.as_ptr(), &mut handle), error_info)
                    .map_err(|msg| init_error(format!("DAQmxCreateTask failed: {}", msg)))?;
                let task = Self {
                    handle,
                    write,
                    stop,
                    clear,
                    error_info,
                    _library: library,
                };
                check(
                    create_do_chan(handle, lines_c.as_ptr(), empty.as_ptr(), DAQMX_VAL_CHAN_FOR_ALL_LINES),
                    error_info,
                )
                .map_err(|msg| init_error(format!("cannot add lines '{}': {}", lines, msg)))?;
                check(start(handle), error_info)
                    .map_err(|msg| init_error(format!("DAQmxStartTask failed: {}", msg)))?;
                Ok(task)
            }
        }
    }

    unsafe fn symbol<T: Copy>(library: &Library, name: &[u8]) -> AppResult<T> {
        library
            .get::<T>(name)
            .map(|sym| *sym)
            .map_err(|err| init_error(format!("NI-DAQmx symbol missing: {}", err)))
    }

    /// Map a DAQmx status code to the driver's extended message. Warnings
    /// (positive codes) are passed.
    unsafe fn check(status: i32, error_info: ErrorInfoFn) -> Result<(), String> {
        if status >= 0 {
            return Ok(());
        }
        let mut buf = vec![0 as c_char; 2048];
        error_info(buf.as_mut_ptr(), buf.len() as u32);
        let bytes: Vec<u8> = buf.iter().take_while(|&&c| c != 0).map(|&c| c as u8).collect();
        Err(format!("status {}: {}", status, String::from_utf8_lossy(&bytes)))
    }

    impl ByteSink for Task {
        fn put(&mut self, value: u8) -> io::Result<()> {
            let data = [value];
            let mut written: i32 = 0;
            // SAFETY: one sample for one channel is read from `data`; `written` is a
            // valid out-pointer and the reserved argument may be null.
            unsafe {
                check(
                    (self.write)(
                        self.handle,
                        1,
                        1,
                        WRITE_TIMEOUT_S,
                        DAQMX_VAL_GROUP_BY_CHANNEL,
                        data.as_ptr(),
                        &mut written,
                        std::ptr::null_mut(),
                    ),
                    self.error_info,
                )
            }
            .map_err(io::Error::other)
        }
    }

    impl Drop for Task {
        fn drop(&mut self) {
            // SAFETY: the handle came from DAQmxCreateTask and is cleared exactly once.
            unsafe {
                if let Err(msg) = check((self.stop)(self.handle), self.error_info) {
                    warn!("DAQmxStopTask failed: {}", msg);
                }
                if let Err(msg) = check((self.clear)(self.handle), self.error_info) {
                    warn!("DAQmxClearTask failed: {}", msg);
                }
            }
        }
    }
}
