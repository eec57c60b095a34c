//! Mock trigger backends
//!
//! Record every byte a port puts on its lines, so the trigger protocol can be
//! checked without an LPT register, DAQ card or serial box attached.
//!
//! # Example
//!
//! ```rust
//! use stim_trigger::hardware::{MockSink, ParallelAddress, ParallelPort, Port, WriteLog};
//!
//! let log = WriteLog::new();
//! let port = Port::from(ParallelPort::with_sink(
//!     ParallelAddress::default(),
//!     MockSink::new(log.clone()),
//! ));
//! assert!(log.is_empty());
//! # drop(port);
//! ```

use super::ByteSink;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;

/// Shared record of bytes written to a mock backend.
///
/// Cloning yields another handle onto the same record.
#[derive(Debug, Clone, Default)]
pub struct WriteLog {
    values: Arc<Mutex<Vec<u8>>>,
}

impl WriteLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All values written so far, oldest first.
    pub fn values(&self) -> Vec<u8> {
        self.values.lock().clone()
    }

    /// The value currently on the lines, if anything was written.
    pub fn last(&self) -> Option<u8> {
        self.values.lock().last().copied()
    }

    /// Number of writes recorded.
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    /// True when nothing was written.
    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }

    /// Forget recorded writes.
    pub fn clear(&self) {
        self.values.lock().clear();
    }

    fn push(&self, bytes: &[u8]) {
        self.values.lock().extend_from_slice(bytes);
    }
}

/// In-memory backend usable as a register sink or a serial stream.
#[derive(Debug, Clone)]
pub struct MockSink {
    log: WriteLog,
    fail: bool,
}

impl MockSink {
    /// Sink recording into `log`.
    pub fn new(log: WriteLog) -> Self {
        Self { log, fail: false }
    }

    /// Sink whose every write fails, as an unplugged device would.
    pub fn failing(log: WriteLog) -> Self {
        Self { log, fail: true }
    }

    fn check(&self) -> io::Result<()> {
        if self.fail {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock device unplugged"))
        } else {
            Ok(())
        }
    }
}

impl ByteSink for MockSink {
    fn put(&mut self, value: u8) -> io::Result<()> {
        self.check()?;
        self.log.push(&[value]);
        Ok(())
    }
}

impl io::Write for MockSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check()?;
        self.log.push(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_log_is_shared_between_clones() {
        let log = WriteLog::new();
        let mut sink = MockSink::new(log.clone());
        sink.put(3).unwrap();
        sink.write_all(&[4, 5]).unwrap();
        assert_eq!(log.values(), vec![3, 4, 5]);
        assert_eq!(log.last(), Some(5));
        assert_eq!(log.len(), 3);
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_failing_sink_records_nothing() {
        let log = WriteLog::new();
        let mut sink = MockSink::failing(log.clone());
        assert!(sink.put(1).is_err());
        assert!(sink.write(&[1]).is_err());
        assert!(log.is_empty());
    }
}
