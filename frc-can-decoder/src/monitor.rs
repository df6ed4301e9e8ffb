//! Live bus monitoring loop

use crate::clock::Clock;
use crate::payload::Payload;
use crate::session::{Ingest, LiveSession};
use crate::transport::FrameSource;
use crate::types::Result;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

/// What one poll did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PollSummary {
    /// Frames returned by the source
    pub read: usize,
    /// Frames that made it into the session
    pub ingested: usize,
    /// Frames discarded (malformed, or their API ignored)
    pub discarded: usize,
    /// Controllers that went offline in the sweep after the batch
    pub went_offline: usize,
}

/// Feeds a [`LiveSession`] from a [`FrameSource`]
#[derive(Debug)]
pub struct LiveMonitor<S: FrameSource, C: Clock> {
    source: S,
    session: LiveSession<C>,
}

impl<S: FrameSource, C: Clock> LiveMonitor<S, C> {
    pub fn new(source: S, session: LiveSession<C>) -> Self {
        Self { source, session }
    }

    pub fn session(&self) -> &LiveSession<C> {
        &self.session
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Stop monitoring, handing back the ended session
    pub fn finish(mut self) -> LiveSession<C> {
        self.session.end();
        self.session
    }

    /// Read one bounded batch, ingest all of it, then sweep liveness.
    ///
    /// Bad frames are logged and skipped; only a source failure is an error.
    pub fn poll(&mut self) -> Result<PollSummary> {
        let max = self.session.config().max_read_per_poll;
        let batch = self.source.read_available_frames(max)?;
        let mut summary = PollSummary {
            read: batch.len(),
            ..PollSummary::default()
        };

        for received in batch {
            let payload = match Payload::from_bytes(&received.payload) {
                Ok(payload) => payload,
                Err(e) => {
                    log::warn!(
                        "Dropping frame id=0x{:08X} at {:.6}: {}",
                        received.identifier,
                        received.timestamp,
                        e
                    );
                    summary.discarded += 1;
                    continue;
                }
            };

            match self
                .session
                .ingest(received.timestamp, received.identifier, payload)
            {
                Ok(Some(_)) => summary.ingested += 1,
                Ok(None) => summary.discarded += 1,
                // Already logged by the session
                Err(_) => summary.discarded += 1,
            }
        }

        summary.went_offline = self.session.sweep_liveness();
        if summary.read > 0 {
            log::debug!(
                "Poll: read {} ingested {} discarded {}",
                summary.read,
                summary.ingested,
                summary.discarded
            );
        }
        Ok(summary)
    }

    /// Poll once per tick until `running` is cleared.
    ///
    /// Returns the number of polls made.
    pub fn run(&mut self, running: &AtomicBool) -> Result<usize> {
        let tick = self.session.config().tick_interval();
        let mut polls = 0;

        log::info!("Monitoring bus ({}ms tick)", tick.as_millis());
        while running.load(Ordering::SeqCst) {
            self.poll()?;
            polls += 1;
            self.session.clock().sleep(tick);
        }
        log::info!("Monitoring stopped after {} polls", polls);

        Ok(polls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::SessionConfig;
    use crate::identifier;
    use crate::session::{ControllerStatus, Session};
    use crate::transport::{LoopbackBus, ReceivedFrame};
    use crate::types::GlobalAddress;
    use std::time::Duration;

    fn id(device_number: u8, api: u16) -> u32 {
        identifier::encode(GlobalAddress::new(2, 5, device_number).unwrap(), api).unwrap()
    }

    fn monitor(clock: &ManualClock, config: SessionConfig) -> LiveMonitor<LoopbackBus, ManualClock> {
        LiveMonitor::new(
            LoopbackBus::new(),
            LiveSession::with_clock(config, clock.clone()),
        )
    }

    #[test]
    fn test_poll_is_bounded() {
        let clock = ManualClock::new(0.0);
        let mut monitor = monitor(&clock, SessionConfig::new().with_max_read_per_poll(2));
        for i in 0..5 {
            monitor
                .source_mut()
                .push(ReceivedFrame::new(i as f64, id(1, i), &[]));
        }

        let summary = monitor.poll().unwrap();
        assert_eq!(summary.read, 2);
        assert_eq!(summary.ingested, 2);
        assert_eq!(monitor.source_mut().pending(), 3);
        assert_eq!(monitor.session().frames().len(), 2);
    }

    #[test]
    fn test_poll_skips_bad_frames() {
        let clock = ManualClock::new(0.0);
        let mut monitor = monitor(&clock, SessionConfig::new().ignore_api(7));
        let bus = monitor.source_mut();
        bus.push(ReceivedFrame::new(0.0, 0xFFFF_FFFF, &[]));
        bus.push(ReceivedFrame::new(0.1, id(1, 1), &[0; 9]));
        bus.push(ReceivedFrame::new(0.2, id(1, 7), &[]));
        bus.push(ReceivedFrame::new(0.3, id(1, 2), &[1, 2]));

        let summary = monitor.poll().unwrap();
        assert_eq!(summary.read, 4);
        assert_eq!(summary.ingested, 1);
        assert_eq!(summary.discarded, 3);
        assert_eq!(monitor.session().ts_start(), 0.3);
    }

    #[test]
    fn test_poll_sweeps_liveness() {
        let clock = ManualClock::new(10.0);
        let mut monitor = monitor(&clock, SessionConfig::new().with_offline_threshold(1.0));
        monitor.source_mut().push(ReceivedFrame::new(0.0, id(4, 1), &[]));
        monitor.poll().unwrap();

        clock.advance(Duration::from_secs(2));
        let summary = monitor.poll().unwrap();
        assert_eq!(summary.went_offline, 1);

        let addr = GlobalAddress::new(2, 5, 4).unwrap();
        let session = monitor.finish();
        assert!(session.is_ended());
        assert_eq!(
            session.controllers().get(&addr).unwrap().status(),
            Some(ControllerStatus::Offline)
        );
    }

    #[test]
    fn test_run_stops_when_flag_cleared() {
        let clock = ManualClock::new(0.0);
        let mut monitor = monitor(&clock, SessionConfig::new());
        let running = AtomicBool::new(false);
        assert_eq!(monitor.run(&running).unwrap(), 0);
    }
}
