//! A trigger port bound to an experiment session.
use super::{fire_stamped, reset, Clock, ResetOutcome};
use crate::error::AppResult;
use crate::hardware::{open_port, Port, PortMode, PortSettings, TriggerCode, TriggerOutput};
use std::time::Duration;
use tracing::debug;

/// What the port carries after the latest `fire` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelState {
    /// Port at 0
    Idle,
    /// Port asserting this code for the current frame
    Firing(TriggerCode),
}

/// Statistics about sent triggers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChannelStats {
    /// Codes sent so far
    pub count: u64,
    /// Last code sent
    pub last_code: Option<TriggerCode>,
    /// Clock time of the last code, when a clock is attached
    pub last_trigger_time: Option<f64>,
}

/// Owns one trigger port for the whole session.
///
/// The port mode is fixed at construction. Dropping the channel releases the
/// OS handle; [`TriggerChannel::close`] additionally leaves the hardware at 0
/// through a final reset.
pub struct TriggerChannel {
    port: Port,
    clock: Option<Box<dyn Clock>>,
    state: ChannelState,
    stats: ChannelStats,
}

impl TriggerChannel {
    /// Wrap an already opened port.
    pub fn new(port: Port) -> Self {
        Self {
            port,
            clock: None,
            state: ChannelState::Idle,
            stats: ChannelStats::default(),
        }
    }

    /// Open and reset a port, then wrap it.
    ///
    /// # Errors
    ///
    /// See [`open_port`].
    pub fn open(settings: &PortSettings) -> AppResult<Self> {
        open_port(settings).map(Self::new)
    }

    /// Attach a clock used to timestamp sent codes in the log.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Per-frame step; see [`fire`](super::fire).
    ///
    /// # Errors
    ///
    /// Returns `StimError::Write` if the port rejects a write.
    pub fn fire(&mut self, code: TriggerCode, armed: bool) -> AppResult<bool> {
        let result = fire_stamped(code, armed, &mut self.port, self.clock.as_deref());

        // The clear happened (or the port is broken); either way nothing is held.
        self.state = ChannelState::Idle;
        let (still_armed, time) = result?;

        if armed {
            self.state = ChannelState::Firing(code);
            self.stats.count += 1;
            self.stats.last_code = Some(code);
            self.stats.last_trigger_time = time;
        }
        Ok(still_armed)
    }

    /// Blocking baseline cycle; see [`reset`](super::reset).
    ///
    /// # Errors
    ///
    /// Returns `StimError::Write` if either write fails.
    pub fn reset(&mut self, hold: Duration) -> AppResult<ResetOutcome> {
        let outcome = reset(&mut self.port, hold)?;
        self.state = ChannelState::Idle;
        Ok(outcome)
    }

    /// Teardown: final reset, then release the port.
    ///
    /// # Errors
    ///
    /// Returns `StimError::Write` if the reset fails; the port is released
    /// either way.
    pub fn close(mut self, hold: Duration) -> AppResult<ChannelStats> {
        let outcome = self.reset(hold);
        debug!(port = %self.port.describe(), sent = self.stats.count, "Trigger channel closed");
        outcome.map(|_| self.stats)
    }

    /// Current protocol state.
    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Mode of the owned port.
    pub fn mode(&self) -> PortMode {
        self.port.mode()
    }

    /// The owned port.
    pub fn port(&self) -> &Port {
        &self.port
    }

    /// Sent-code statistics.
    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    /// Number of codes sent.
    pub fn fired_count(&self) -> u64 {
        self.stats.count
    }
}

impl std::fmt::Debug for TriggerChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerChannel")
            .field("port", &self.port)
            .field("state", &self.state)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{DaqPort, MockSink, WriteLog};
    use std::cell::Cell;
    use std::rc::Rc;

    fn daq_channel(log: &WriteLog) -> TriggerChannel {
        TriggerChannel::new(Port::from(DaqPort::with_sink(
            "Dev1/port0/line0:7",
            MockSink::new(log.clone()),
        )))
    }

    #[test]
    fn test_state_follows_protocol() {
        let log = WriteLog::new();
        let mut channel = daq_channel(&log);
        assert_eq!(channel.state(), ChannelState::Idle);

        assert!(!channel.fire(TriggerCode::new(5), true).unwrap());
        assert_eq!(channel.state(), ChannelState::Firing(TriggerCode::new(5)));

        assert!(!channel.fire(TriggerCode::new(5), false).unwrap());
        assert_eq!(channel.state(), ChannelState::Idle);
        assert_eq!(log.values(), vec![0, 5, 0]);
    }

    #[test]
    fn test_stats_record_clock_time() {
        let log = WriteLog::new();
        let mut channel = daq_channel(&log).with_clock(|| 1.5);
        channel.fire(TriggerCode::new(9), true).unwrap();
        channel.fire(TriggerCode::new(9), false).unwrap();
        channel.fire(TriggerCode::new(10), true).unwrap();

        let stats = channel.stats();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.last_code, Some(TriggerCode::new(10)));
        assert_eq!(stats.last_trigger_time, Some(1.5));
    }

    #[test]
    fn test_stats_time_matches_logged_read() {
        let reads = Rc::new(Cell::new(0.0));
        let counter = Rc::clone(&reads);
        let log = WriteLog::new();
        let mut channel = daq_channel(&log).with_clock(move || {
            counter.set(counter.get() + 1.0);
            counter.get()
        });

        channel.fire(TriggerCode::new(4), false).unwrap();
        assert_eq!(reads.get(), 0.0);

        channel.fire(TriggerCode::new(4), true).unwrap();
        assert_eq!(reads.get(), 1.0);
        assert_eq!(channel.stats().last_trigger_time, Some(1.0));
    }

    #[test]
    fn test_stats_without_clock_have_no_time() {
        let log = WriteLog::new();
        let mut channel = daq_channel(&log);
        channel.fire(TriggerCode::new(3), true).unwrap();
        assert_eq!(channel.fired_count(), 1);
        assert_eq!(channel.stats().last_trigger_time, None);
    }

    #[test]
    fn test_close_leaves_port_at_zero() {
        let log = WriteLog::new();
        let mut channel = daq_channel(&log);
        channel.fire(TriggerCode::new(77), true).unwrap();
        let stats = channel.close(Duration::from_millis(1)).unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(log.values(), vec![0, 77, 255, 0]);
    }

    #[test]
    fn test_null_channel_mode() {
        let channel = TriggerChannel::new(Port::null());
        assert_eq!(channel.mode(), PortMode::None);
        assert!(channel.port().is_null());
    }
}
