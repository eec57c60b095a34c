//! Pulse a trigger code through the configured port, frame by frame.
//!
//! Useful for checking the cable between the presentation machine and the
//! EEG amplifier before a session: the recording should show exactly one event
//! with the chosen code.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use stim_trigger::config::{StimConfig, DEFAULT_CONFIG_PATH};
use stim_trigger::error::AppResult;
use stim_trigger::hardware::{TriggerCode, TriggerOutput};
use stim_trigger::logging;
use stim_trigger::trigger::{MonotonicClock, TriggerChannel};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "trigger_check", version, about = "Send a test trigger code")]
struct Args {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Port mode override: 0 none, 1 parallel, 2 daq, 3 serial
    #[arg(long)]
    mode: Option<i64>,

    /// Code to send
    #[arg(long, default_value_t = 1)]
    code: i64,

    /// Number of frames to step through
    #[arg(long, default_value_t = 10)]
    frames: u32,

    /// Simulated refresh rate in Hz
    #[arg(long, default_value_t = 60.0)]
    frame_rate: f64,

    /// Frame on which the code is sent
    #[arg(long, default_value_t = 0)]
    fire_on: u32,
}

/// Step `frames` frames, arming `code` on frame `fire_on`.
///
/// One extra unarmed frame follows the last, so a code sent on the final frame
/// is still held for a full frame and cleared before any teardown reset.
fn step_frames(
    channel: &mut TriggerChannel,
    code: TriggerCode,
    frames: u32,
    fire_on: u32,
    frame: Duration,
) -> AppResult<()> {
    let mut armed = false;
    let mut next_flip = Instant::now();
    for n in 0..=frames {
        if n == fire_on {
            armed = true;
        }
        // Stand-in for the window flip.
        next_flip += frame;
        if let Some(wait) = next_flip.checked_duration_since(Instant::now()) {
            std::thread::sleep(wait);
        }
        armed = channel.fire(code, armed)?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = StimConfig::load_from(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(mode) = args.mode {
        config.trigger.mode = mode;
    }
    logging::init(&config.logging)?;

    let code = TriggerCode::try_from(args.code)?;
    if !(args.frame_rate.is_finite() && args.frame_rate > 0.0) {
        bail!("frame rate must be positive, got {}", args.frame_rate);
    }
    if args.fire_on >= args.frames {
        bail!("--fire-on {} is past the last frame ({})", args.fire_on, args.frames);
    }
    let frame = Duration::from_secs_f64(1.0 / args.frame_rate);

    let mut channel = TriggerChannel::open(&config.trigger.port_settings())
        .context("opening trigger port")?
        .with_clock(MonotonicClock::new());
    info!(port = %channel.port().describe(), %code, "Trigger check started");

    step_frames(&mut channel, code, args.frames, args.fire_on, frame)?;

    let stats = channel.close(config.trigger.reset_hold())?;
    info!(sent = stats.count, "Trigger check finished");
    Ok(())
}
