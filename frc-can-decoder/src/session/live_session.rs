//! Live bus session

use super::{ControllerRegistry, FrameStore, Ingest, IngestStats, Session};
use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::payload::Payload;
use crate::types::{DecoderError, Frame, Result, Timestamp};

/// A growing session fed from a live bus.
///
/// Controllers carry liveness; "now" for sightings and sweeps comes from the
/// session's clock, not from frame timestamps.
#[derive(Debug)]
pub struct LiveSession<C: Clock = SystemClock> {
    store: FrameStore,
    clock: C,
    ts_start: Option<Timestamp>,
    ts_end: Option<Timestamp>,
    ended: bool,
}

impl LiveSession<SystemClock> {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> LiveSession<C> {
    pub fn with_clock(config: SessionConfig, clock: C) -> Self {
        Self {
            store: FrameStore::new(config, true),
            clock,
            ts_start: None,
            ts_end: None,
            ended: false,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.store.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Mark controllers unseen for longer than the configured threshold offline
    pub fn sweep_liveness(&mut self) -> usize {
        let now = self.clock.now();
        self.sweep_liveness_at(now)
    }

    pub fn sweep_liveness_at(&mut self, now: Timestamp) -> usize {
        let threshold = self.store.config.offline_threshold_secs;
        self.store.registry.sweep_liveness(now, threshold)
    }

    /// Stop accepting frames; everything ingested so far stays readable
    pub fn end(&mut self) {
        if !self.ended {
            log::info!(
                "Live session ended: {} frames, {} controllers",
                self.store.frames.len(),
                self.store.registry.len()
            );
            self.ended = true;
        }
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl<C: Clock> Ingest for LiveSession<C> {
    fn ingest(
        &mut self,
        timestamp: Timestamp,
        identifier: u32,
        payload: Payload,
    ) -> Result<Option<&Frame>> {
        if self.ended {
            return Err(DecoderError::SessionEnded);
        }

        let now = self.clock.now();
        let idx = match self.store.ingest(timestamp, identifier, payload, now)? {
            Some(idx) => idx,
            None => return Ok(None),
        };

        let ts_start = *self.ts_start.get_or_insert(timestamp);
        self.ts_end = Some(self.ts_end.map_or(timestamp, |end| end.max(timestamp)));

        let frame = &mut self.store.frames[idx];
        frame.set_relative_timestamp(ts_start);
        Ok(Some(&*frame))
    }
}

impl<C: Clock> Session for LiveSession<C> {
    fn frames(&self) -> &[Frame] {
        &self.store.frames
    }

    fn controllers(&self) -> &ControllerRegistry {
        &self.store.registry
    }

    fn ts_start(&self) -> Timestamp {
        self.ts_start.unwrap_or(0.0)
    }

    fn ts_end(&self) -> Timestamp {
        self.ts_end.unwrap_or(0.0)
    }

    fn stats(&self) -> &IngestStats {
        &self.store.stats
    }

    fn is_live(&self) -> bool {
        true
    }
}
