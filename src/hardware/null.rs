//! Port used when no trigger hardware is attached.

use super::{PortMode, TriggerCode, TriggerOutput};
use crate::error::AppResult;
use tracing::trace;

/// No-op port for dry runs.
///
/// Writes succeed without touching any device; each one is still traced so a
/// dry run shows what would have been sent.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPort;

impl NullPort {
    /// Create the null port.
    pub fn new() -> Self {
        NullPort
    }
}

impl TriggerOutput for NullPort {
    fn mode(&self) -> PortMode {
        PortMode::None
    }

    fn describe(&self) -> String {
        "null port".to_string()
    }

    fn write(&mut self, code: TriggerCode) -> AppResult<()> {
        trace!(code = code.value(), "null port write");
        Ok(())
    }
}
