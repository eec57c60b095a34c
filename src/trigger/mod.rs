//! Frame-synchronous trigger protocol
//!
//! Two operations drive a trigger port:
//!
//! - [`reset`] - the blocking baseline cycle (all lines high, hold, all lines low)
//!   used at setup and teardown to check connectivity.
//! - [`fire`] - the per-frame call made right after each buffer flip.
//!
//! # Per-frame protocol
//!
//! ```text
//!            armed = false                 armed = true
//!   IDLE ----------------> IDLE     IDLE ---------------> FIRING(code)
//!   FIRING --(next call)--> write 0, then the rules above again
//! ```
//!
//! Every `fire` call first writes 0, and only then writes the code if the
//! caller armed one for this frame. A code is therefore on the port for exactly
//! one frame and the port returns to idle even if the caller never re-arms.
//! Swapping the two writes would either lose the code or hold it for two
//! frames.
//!
//! `fire` never sleeps and performs at most two port writes and one log line;
//! `reset` sleeps and must stay out of the frame loop.
//!
//! # Usage
//!
//! ```rust
//! use stim_trigger::hardware::{Port, TriggerCode};
//! use stim_trigger::trigger::fire;
//!
//! let mut port = Port::null();
//! let mut send = false;
//! for frame in 0..3 {
//!     if frame == 1 {
//!         send = true; // stimulus onset on this frame
//!     }
//!     // ... window flip ...
//!     send = fire(TriggerCode::new(7), send, &mut port, None).unwrap();
//! }
//! assert!(!send);
//! ```

pub mod channel;
pub mod clock;

pub use channel::{ChannelState, ChannelStats, TriggerChannel};
pub use clock::{Clock, MonotonicClock};

use crate::error::AppResult;
use crate::hardware::{Port, TriggerCode, TriggerOutput};
use std::time::Duration;
use tracing::info;

/// What a reset call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// The port went to 255, held, and returned to 0.
    Completed,
    /// Null port; nothing was reset.
    Skipped,
}

/// Drive the port to 255, hold for `hold`, then drive it to 0.
///
/// Blocks the calling thread for `hold`. Only call this at setup or teardown,
/// never from the frame loop.
///
/// # Errors
///
/// Returns `StimError::Write` if either write fails.
pub fn reset(port: &mut Port, hold: Duration) -> AppResult<ResetOutcome> {
    if port.is_null() {
        info!("No port was reset");
        return Ok(ResetOutcome::Skipped);
    }

    info!(port = %port.describe(), "Sending max trigger value");
    port.write(TriggerCode::MAX)?;
    std::thread::sleep(hold);
    info!(port = %port.describe(), "Sending zero trigger value");
    port.write(TriggerCode::IDLE)?;
    Ok(ResetOutcome::Completed)
}

/// Per-frame trigger step. Call once per frame, right after the buffer flip.
///
/// Clears the port, then asserts `code` if `armed`. Returns the new value of
/// the caller's armed flag, which is always `false`: a firing consumes the
/// flag, and an unarmed frame leaves it unarmed.
///
/// When a code is sent it is logged together with `clock`'s time; without a
/// clock the log line simply has no timestamp.
///
/// # Errors
///
/// Returns `StimError::Write` if the port rejects a write. Write failures are
/// never swallowed since they corrupt the recorded event timing.
pub fn fire(
    code: TriggerCode,
    armed: bool,
    port: &mut Port,
    clock: Option<&dyn Clock>,
) -> AppResult<bool> {
    fire_stamped(code, armed, port, clock).map(|(still_armed, _)| still_armed)
}

/// [`fire`], also returning the clock time logged for a sent code.
///
/// The clock is read once per sent code so callers can record the same
/// timestamp that went to the log.
pub(crate) fn fire_stamped(
    code: TriggerCode,
    armed: bool,
    port: &mut Port,
    clock: Option<&dyn Clock>,
) -> AppResult<(bool, Option<f64>)> {
    port.write(TriggerCode::IDLE)?;
    if !armed {
        return Ok((false, None));
    }

    port.write(code)?;
    let time = clock.map(|c| c.now());
    log_sent(code, port, time);
    Ok((false, time))
}

fn log_sent(code: TriggerCode, port: &Port, time: Option<f64>) {
    match time {
        Some(time) => info!(
            code = code.value(),
            time,
            mode = %port.mode(),
            "code {} sent", code
        ),
        None => info!(code = code.value(), mode = %port.mode(), "code {} sent", code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{MockSink, ParallelAddress, ParallelPort, WriteLog};
    use std::time::Instant;

    fn parallel(log: &WriteLog) -> Port {
        Port::from(ParallelPort::with_sink(
            ParallelAddress::default(),
            MockSink::new(log.clone()),
        ))
    }

    #[test]
    fn test_fire_clears_then_sets() {
        let log = WriteLog::new();
        let mut port = parallel(&log);

        let armed = fire(TriggerCode::new(7), true, &mut port, None).unwrap();
        assert!(!armed);
        assert_eq!(log.values(), vec![0, 7]);
        assert_eq!(log.last(), Some(7));

        let armed = fire(TriggerCode::new(7), false, &mut port, None).unwrap();
        assert!(!armed);
        assert_eq!(log.values(), vec![0, 7, 0]);
    }

    #[test]
    fn test_unarmed_fire_only_clears() {
        let log = WriteLog::new();
        let mut port = parallel(&log);
        for _ in 0..5 {
            assert!(!fire(TriggerCode::new(99), false, &mut port, None).unwrap());
            assert_eq!(log.last(), Some(0));
        }
        assert_eq!(log.values(), vec![0; 5]);
    }

    #[test]
    fn test_fire_with_clock() {
        let log = WriteLog::new();
        let mut port = parallel(&log);
        let clock = || 3.25;
        assert!(!fire(TriggerCode::new(42), true, &mut port, Some(&clock)).unwrap());
        assert_eq!(log.last(), Some(42));
    }

    #[test]
    fn test_fire_propagates_write_failure() {
        let log = WriteLog::new();
        let mut port = Port::from(ParallelPort::with_sink(
            ParallelAddress::default(),
            MockSink::failing(log),
        ));
        assert!(fire(TriggerCode::new(1), true, &mut port, None).is_err());
    }

    #[test]
    fn test_reset_sequence_and_hold() {
        let log = WriteLog::new();
        let mut port = parallel(&log);
        let hold = Duration::from_millis(20);
        let start = Instant::now();
        assert_eq!(reset(&mut port, hold).unwrap(), ResetOutcome::Completed);
        assert!(start.elapsed() >= hold);
        assert_eq!(log.values(), vec![255, 0]);
    }

    #[test]
    fn test_reset_null_port_is_skipped() {
        let mut port = Port::null();
        assert_eq!(
            reset(&mut port, Duration::from_secs(5)).unwrap(),
            ResetOutcome::Skipped
        );
    }
}
