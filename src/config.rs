//! Configuration using Figment
//!
//! Settings are loaded from:
//! 1. `config/stim_trigger.toml` (or a path given to [`StimConfig::load_from`])
//! 2. Environment variables prefixed with `STIM_TRIGGER_`
//!
//! Every section has defaults, so a missing file yields a configuration that
//! runs without trigger hardware.
//!
//! # Environment Variable Overrides
//!
//! Nested keys are separated by a double underscore:
//!
//! ```text
//! STIM_TRIGGER_TRIGGER__MODE=3
//! STIM_TRIGGER_TRIGGER__ADDRESS=/dev/ttyUSB0
//! STIM_TRIGGER_LOGGING__LEVEL=debug
//! ```
//!
//! # Example
//!
//! ```toml
//! [trigger]
//! mode = 1
//! address = "0x378"
//! reset_hold_ms = 1000
//!
//! [logging]
//! level = "info"
//!
//! [stimuli]
//! base_dir = "/data/exp01"
//! file_type = "png"
//!
//! [modulation]
//! frequency = 4.0
//! amplitude = 0.5
//! frame_rate = 60.0
//! offset = 0.5
//! ```

use crate::error::{AppResult, StimError};
use crate::hardware::daq::DEFAULT_DAQ_LINES;
use crate::hardware::init::DEFAULT_RESET_HOLD;
use crate::hardware::serial::DEFAULT_BAUD_RATE;
use crate::hardware::PortSettings;
use crate::modulation::SinusoidParams;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/stim_trigger.toml";

/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "STIM_TRIGGER_";

const MAX_RESET_HOLD_MS: u64 = 10_000;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StimConfig {
    /// Trigger port settings
    pub trigger: TriggerSettings,
    /// Logging settings
    pub logging: LoggingSettings,
    /// Stimulus file settings
    pub stimuli: StimulusSettings,
    /// Default sinusoid for modulated stimuli
    pub modulation: SinusoidParams,
}

/// Trigger port configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerSettings {
    /// 0 none, 1 parallel, 2 daq, 3 serial
    pub mode: i64,
    /// LPT address (e.g. "0x378", "/dev/parport0") or serial device
    pub address: Option<String>,
    /// NI-DAQmx library file or the directory holding it
    pub library_path: Option<PathBuf>,
    /// NI-DAQmx line group
    pub daq_lines: String,
    /// Serial baud rate
    pub baud_rate: u32,
    /// Reset hold time in milliseconds
    pub reset_hold_ms: u64,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            mode: 0,
            address: None,
            library_path: None,
            daq_lines: DEFAULT_DAQ_LINES.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            reset_hold_ms: DEFAULT_RESET_HOLD.as_millis() as u64,
        }
    }
}

impl TriggerSettings {
    /// Settings for [`open_port`](crate::hardware::open_port).
    pub fn port_settings(&self) -> PortSettings {
        PortSettings {
            mode: self.mode,
            address: self.address.clone(),
            library_path: self.library_path.clone(),
            daq_lines: self.daq_lines.clone(),
            baud_rate: self.baud_rate,
            reset_hold: self.reset_hold(),
        }
    }

    /// Reset hold time.
    pub fn reset_hold(&self) -> Duration {
        Duration::from_millis(self.reset_hold_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Stimulus file configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StimulusSettings {
    /// Directory stimulus folders and trial tables are resolved against
    pub base_dir: PathBuf,
    /// Image file extension
    pub file_type: String,
}

impl Default for StimulusSettings {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            file_type: "png".to_string(),
        }
    }
}

impl StimConfig {
    /// Load from [`DEFAULT_CONFIG_PATH`] and the environment.
    ///
    /// # Errors
    ///
    /// Returns `StimError::Config` if extraction fails and
    /// `StimError::Configuration` if validation fails.
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from a specific file and the environment.
    ///
    /// Environment variables take precedence over the file. A missing file is
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns `StimError::Config` if the file is malformed or a value has the
    /// wrong type, and `StimError::Configuration` if validation fails.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config: Self = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    ///
    /// Checks:
    /// - Log level is valid (trace, debug, info, warn, error)
    /// - Baud rate is positive
    /// - Reset hold is at most 10 s
    /// - Modulation parameters are usable
    ///
    /// An unknown trigger mode is accepted here; opening the port degrades it
    /// to the null port.
    ///
    /// # Errors
    ///
    /// Returns `StimError::Configuration` describing the first failure.
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(StimError::Configuration(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }

        if self.trigger.baud_rate == 0 {
            return Err(StimError::Configuration(
                "Invalid baud_rate 0. Must be positive".to_string(),
            ));
        }

        if self.trigger.reset_hold_ms > MAX_RESET_HOLD_MS {
            return Err(StimError::Configuration(format!(
                "Invalid reset_hold_ms {}. Must be at most {}",
                self.trigger.reset_hold_ms, MAX_RESET_HOLD_MS
            )));
        }

        self.modulation.validate()
    }
}
