//! Real-time replay of a recorded session
//!
//! The scheduler walks a [`LogSession`] at 1:1 speed: each tick asks the log
//! for the frames that became due since the previous tick and writes them to a
//! [`FrameSink`].

use crate::clock::{Clock, SystemClock};
use crate::session::{LogSession, Session};
use crate::transport::FrameSink;
use crate::types::Result;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Outcome of one replay pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    /// Number of window polls
    pub ticks: usize,
    pub frames_sent: usize,
    /// The running flag was cleared before the log was exhausted
    pub cancelled: bool,
}

/// Paces a log onto a sink
#[derive(Debug, Clone)]
pub struct ReplayScheduler<C: Clock = SystemClock> {
    clock: C,
    tick: Duration,
}

impl ReplayScheduler<SystemClock> {
    pub fn new(tick: Duration) -> Self {
        Self::with_clock(SystemClock, tick)
    }
}

impl<C: Clock> ReplayScheduler<C> {
    pub fn with_clock(clock: C, tick: Duration) -> Self {
        Self { clock, tick }
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Replay `log` to `sink` until it is exhausted or `running` is cleared.
    ///
    /// `now` is read once per tick and reused as the next tick's cursor, so
    /// consecutive windows tile the timeline without gaps. A failing sink
    /// aborts the pass and its error is returned as is.
    pub fn run<S: FrameSink + ?Sized>(
        &self,
        log: &LogSession,
        sink: &mut S,
        running: &AtomicBool,
    ) -> Result<ReplayReport> {
        let duration = log.duration();
        let start_time = self.clock.now();
        let mut prev_cursor = start_time;
        let mut report = ReplayReport::default();

        log.rearm_replay();
        log::info!(
            "Replaying {} frames over {:.3}s ({}ms tick)",
            log.frames().len(),
            duration,
            self.tick.as_millis()
        );

        loop {
            if !running.load(Ordering::SeqCst) {
                log::info!("Replay cancelled after {} ticks", report.ticks);
                report.cancelled = true;
                break;
            }

            let now = self.clock.now();
            let due = log.frames_in_window_at(start_time, prev_cursor, now);
            report.ticks += 1;

            for frame in due {
                sink.send_frame(frame.identifier(), frame.payload().as_bytes())
                    .map_err(|e| {
                        log::error!(
                            "Replay aborted at {:.6}s: {}",
                            frame.relative_timestamp(),
                            e
                        );
                        e
                    })?;
                report.frames_sent += 1;
                log::debug!(
                    "Sent {:.6}s id=0x{:08X} [{}]",
                    frame.relative_timestamp(),
                    frame.identifier(),
                    frame.payload()
                );
            }

            if now - start_time > duration {
                break;
            }
            prev_cursor = now;
            self.clock.sleep(self.tick);
        }

        log::info!(
            "Replay finished: {} frames in {} ticks",
            report.frames_sent,
            report.ticks
        );
        Ok(report)
    }
}
