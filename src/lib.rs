//! Core library for stimulus presentation with EEG event triggers.
//!
//! This library contains the trigger port abstraction and the frame-synchronous
//! trigger protocol used to mark stimulus onsets in an EEG recording, plus the
//! stimulus helpers an experiment script needs around it: image preloading,
//! trial tables, and sinusoidal modulation. It is used by experiment
//! programs and by the `trigger_check` diagnostic binary.

pub mod config;
pub mod error;
pub mod hardware;
pub mod logging;
pub mod modulation;
pub mod stimuli;
pub mod trigger;

pub use error::{AppResult, StimError};
