//! Custom error types for the crate.
//!
//! This module defines the primary error type, `StimError`. Using the `thiserror`
//! crate, it provides a centralized and consistent way to handle everything that
//! can go wrong, from opening a trigger port to reading a trial table.
//!
//! ## Error Hierarchy
//!
//! `StimError` is an enum that consolidates various error sources:
//!
//! - **`Initialization`**: A trigger port could not be constructed or opened (missing
//!   driver library, busy device, malformed address). Fatal to an experiment session;
//!   callers never get a port object that pretends to work.
//! - **`UnsupportedMode`**: A mode selector outside 0-3. Port initialization turns this
//!   into a diagnostic and a null port, so test runs keep working.
//! - **`CodeOutOfRange`**: A trigger value that does not fit on an 8-line port.
//! - **`Write`**: A hardware write failed during reset or firing. These are never
//!   swallowed since a lost write corrupts event alignment in the recording.
//! - **`Config`** / **`Configuration`**: Figment extraction failures and semantic
//!   validation failures of the configuration respectively.
//! - **`Io`**, **`TrialTable`**, **`Stimulus`**: file-system, CSV and preloading errors.
//!
//! Cosmetic conditions (missing clock on a fire event, ambiguous image match) are
//! not represented here at all: they are logged with `tracing` and presentation
//! proceeds.

use crate::hardware::PortMode;
use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type AppResult<T> = std::result::Result<T, StimError>;

#[derive(Error, Debug)]
pub enum StimError {
    #[error("Trigger port initialization failed ({mode}): {reason}")]
    Initialization { mode: PortMode, reason: String },

    #[error("Unsupported trigger mode {0}; expected 0 (none), 1 (parallel), 2 (daq) or 3 (serial)")]
    UnsupportedMode(i64),

    #[error("Trigger code {0} is outside 0-255")]
    CodeOutOfRange(i64),

    #[error("Trigger write failed on {port}: {source}")]
    Write {
        port: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Trial table error: {0}")]
    TrialTable(#[from] csv::Error),

    #[error("Stimulus error: {0}")]
    Stimulus(String),
}

impl StimError {
    pub(crate) fn init(mode: PortMode, reason: impl Into<String>) -> Self {
        StimError::Initialization {
            mode,
            reason: reason.into(),
        }
    }

    /// True for errors raised while constructing a port.
    pub fn is_initialization(&self) -> bool {
        matches!(self, StimError::Initialization { .. })
    }
}

impl From<figment::Error> for StimError {
    fn from(err: figment::Error) -> Self {
        StimError::Config(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StimError::init(PortMode::Daq, "library not found");
        assert_eq!(
            err.to_string(),
            "Trigger port initialization failed (daq): library not found"
        );
        assert!(err.is_initialization());
    }

    #[test]
    fn test_write_error_keeps_source() {
        use std::error::Error as _;

        let err = StimError::Write {
            port: "serial /dev/ttyUSB0".into(),
            source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "unplugged"),
        };
        assert!(err.to_string().contains("serial /dev/ttyUSB0"));
        assert!(err.source().is_some());
        assert!(!err.is_initialization());
    }
}
