//! Historical (recorded) session

use super::{ControllerRegistry, FrameStore, Ingest, IngestStats, Session};
use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::payload::Payload;
use crate::record::{LogSource, RawRecord};
use crate::types::{DecoderError, Frame, Result, Timestamp};
use std::sync::atomic::{AtomicBool, Ordering};

/// Batch construction of a [`LogSession`].
///
/// Records may arrive in any timestamp order, so relative timestamps are only
/// assigned by [`build`](Self::build) once the true start is known.
#[derive(Debug)]
pub struct LogSessionBuilder {
    store: FrameStore,
    source: LogSource,
    ts_start: Timestamp,
    ts_end: Timestamp,
}

impl LogSessionBuilder {
    pub fn new(config: SessionConfig, source: LogSource) -> Self {
        Self {
            store: FrameStore::new(config, false),
            source,
            ts_start: f64::INFINITY,
            ts_end: 0.0,
        }
    }

    /// Decode one record with the source's rules and ingest it.
    ///
    /// Bad timestamps and identifiers reject the record; a bad payload keeps
    /// the record with an empty payload.
    pub fn push_record(&mut self, record: &RawRecord) -> Result<Option<&Frame>> {
        let timestamp = record.timestamp().map_err(|e| {
            log::warn!("Skipping record: {}", e);
            self.store.stats.malformed_timestamp += 1;
            e
        })?;

        let identifier = match record.identifier() {
            Ok(identifier) => identifier,
            Err(e) => {
                log::warn!("Skipping record at {:.6}: {}", timestamp, e);
                self.store.stats.malformed_identifier += 1;
                return Err(e);
            }
        };

        let payload = record.payload(self.source).unwrap_or_else(|e| {
            log::warn!(
                "Record at {:.6} id=0x{:X}: {}, using an empty payload",
                timestamp,
                identifier,
                e
            );
            self.store.stats.malformed_payload += 1;
            Payload::empty()
        });

        self.ingest(timestamp, identifier, payload)
    }

    /// Convert one capture entry to a record and push it.
    ///
    /// Entries that are not JSON objects are counted and skipped.
    pub fn push_json(&mut self, entry: serde_json::Value) -> Result<Option<&Frame>> {
        let record: RawRecord = serde_json::from_value(entry).map_err(|e| {
            log::warn!("Skipping capture entry: {}", e);
            self.store.stats.malformed_record += 1;
            DecoderError::MalformedCapture(e.to_string())
        })?;
        self.push_record(&record)
    }

    /// Second pass: relative timestamps against the final `ts_start`
    pub fn build(mut self) -> LogSession {
        if self.store.frames.is_empty() {
            log::warn!("Log session has no valid frames");
            self.ts_start = 0.0;
            self.ts_end = 0.0;
        }

        for frame in &mut self.store.frames {
            frame.set_relative_timestamp(self.ts_start);
        }

        log::info!(
            "Loaded {} log: {} frames, {} controllers, {:.3}s",
            self.source,
            self.store.frames.len(),
            self.store.registry.len(),
            self.ts_end - self.ts_start
        );

        LogSession {
            store: self.store,
            source: self.source,
            ts_start: self.ts_start,
            ts_end: self.ts_end,
            replay_seeded: AtomicBool::new(false),
        }
    }
}

impl Ingest for LogSessionBuilder {
    fn ingest(
        &mut self,
        timestamp: Timestamp,
        identifier: u32,
        payload: Payload,
    ) -> Result<Option<&Frame>> {
        let idx = match self.store.ingest(timestamp, identifier, payload, timestamp)? {
            Some(idx) => idx,
            None => return Ok(None),
        };

        self.ts_start = self.ts_start.min(timestamp);
        self.ts_end = self.ts_end.max(timestamp);

        Ok(Some(&self.store.frames[idx]))
    }
}

/// A recorded session, frozen after batch construction
#[derive(Debug)]
pub struct LogSession {
    store: FrameStore,
    source: LogSource,
    ts_start: Timestamp,
    ts_end: Timestamp,
    /// Set once the first poll of a replay pass has returned its seed frame
    replay_seeded: AtomicBool,
}

impl LogSession {
    /// Build a session from records in file order, skipping bad ones
    pub fn from_records<'a, I>(records: I, source: LogSource, config: SessionConfig) -> Self
    where
        I: IntoIterator<Item = &'a RawRecord>,
    {
        let mut builder = LogSessionBuilder::new(config, source);
        for record in records {
            // Already logged and counted by the builder
            let _ = builder.push_record(record);
        }
        builder.build()
    }

    /// Build a session from a JSON array of records.
    ///
    /// Only text that is not a JSON array is an error; bad entries are
    /// skipped one by one.
    pub fn from_json(json: &str, source: LogSource, config: SessionConfig) -> Result<Self> {
        let entries: Vec<serde_json::Value> = serde_json::from_str(json)
            .map_err(|e| DecoderError::MalformedCapture(e.to_string()))?;

        let mut builder = LogSessionBuilder::new(config, source);
        for entry in entries {
            let _ = builder.push_json(entry);
        }
        Ok(builder.build())
    }

    pub fn source(&self) -> LogSource {
        self.source
    }

    /// Recorded duration, `ts_end - ts_start`
    pub fn duration(&self) -> f64 {
        self.ts_end - self.ts_start
    }

    /// The frame with the smallest relative timestamp (first on ties)
    pub fn earliest_frame(&self) -> Option<&Frame> {
        self.store.frames.iter().reduce(|best, frame| {
            if frame.relative_timestamp() < best.relative_timestamp() {
                frame
            } else {
                best
            }
        })
    }

    /// Frames due since the previous poll, against the system clock
    pub fn frames_in_window(&self, start_time: Timestamp, prev_cursor: Timestamp) -> Vec<&Frame> {
        self.frames_in_window_at(start_time, prev_cursor, SystemClock.now())
    }

    /// Frames with `relative_timestamp` in `(prev_cursor - start_time, now - start_time]`.
    ///
    /// The first poll of a replay pass (`prev_cursor == start_time`) returns
    /// only the earliest frame instead. Returned frames are in timestamp order.
    pub fn frames_in_window_at(
        &self,
        start_time: Timestamp,
        prev_cursor: Timestamp,
        now: Timestamp,
    ) -> Vec<&Frame> {
        let start_rel = prev_cursor - start_time;
        let end_rel = now - start_time;

        if start_rel == 0.0 && !self.replay_seeded.swap(true, Ordering::SeqCst) {
            return self.earliest_frame().into_iter().collect();
        }

        let mut due: Vec<&Frame> = self
            .store
            .frames
            .iter()
            .filter(|f| f.relative_timestamp() > start_rel && f.relative_timestamp() <= end_rel)
            .collect();
        due.sort_by(|a, b| a.relative_timestamp().total_cmp(&b.relative_timestamp()));
        due
    }

    /// Allow the next first poll to seed again (start a new replay pass)
    pub fn rearm_replay(&self) {
        self.replay_seeded.store(false, Ordering::SeqCst);
    }
}

impl Session for LogSession {
    fn frames(&self) -> &[Frame] {
        &self.store.frames
    }

    fn controllers(&self) -> &ControllerRegistry {
        &self.store.registry
    }

    fn ts_start(&self) -> Timestamp {
        self.ts_start
    }

    fn ts_end(&self) -> Timestamp {
        self.ts_end
    }

    fn stats(&self) -> &IngestStats {
        &self.store.stats
    }

    fn is_live(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier;
    use crate::record::{FieldRepr, TimestampRepr};
    use crate::types::GlobalAddress;

    fn id(device_number: u8, api: u16) -> u32 {
        identifier::encode(GlobalAddress::new(2, 5, device_number).unwrap(), api).unwrap()
    }

    fn session(timestamps: &[f64]) -> LogSession {
        let records: Vec<RawRecord> = timestamps
            .iter()
            .enumerate()
            .map(|(i, ts)| RawRecord::new(*ts, id(1, i as u16), &[i as u8]))
            .collect();
        LogSession::from_records(&records, LogSource::Live, SessionConfig::new())
    }

    fn rel(frames: &[&Frame]) -> Vec<f64> {
        frames.iter().map(|f| f.relative_timestamp()).collect()
    }

    #[test]
    fn test_window_against_system_clock() {
        let log = session(&[10.0, 10.5, 1000.0]);
        let now = SystemClock.now();

        assert_eq!(rel(&log.frames_in_window(now, now)), vec![0.0]);
        // Pass started two seconds ago: only the frame at 0.5s is due
        assert_eq!(rel(&log.frames_in_window(now - 2.0, now - 2.0)), vec![0.5]);
        assert!(log.frames_in_window(now - 2.0, now - 1.0).is_empty());
    }

    #[test]
    fn test_bounds_from_unsorted_records() {
        let log = session(&[12.0, 10.0, 15.0, 11.0]);
        assert_eq!(log.ts_start(), 10.0);
        assert_eq!(log.ts_end(), 15.0);
        assert_eq!(log.duration(), 5.0);
        let rels: Vec<f64> = log.frames().iter().map(|f| f.relative_timestamp()).collect();
        assert_eq!(rels, vec![2.0, 0.0, 5.0, 1.0]);
        assert_eq!(log.earliest_frame().unwrap().timestamp(), 10.0);
    }

    #[test]
    fn test_window_exactness() {
        let log = session(&[100.0, 101.0, 102.0, 103.0]);
        let t = 5000.0;

        assert_eq!(rel(&log.frames_in_window_at(t, t, t)), vec![0.0]);
        assert_eq!(rel(&log.frames_in_window_at(t, t, t + 1.5)), vec![1.0]);
        assert_eq!(rel(&log.frames_in_window_at(t, t + 1.5, t + 3.0)), vec![2.0, 3.0]);
        assert!(log.frames_in_window_at(t, t + 3.0, t + 10.0).is_empty());
    }

    #[test]
    fn test_window_is_left_exclusive_right_inclusive() {
        let log = session(&[0.0, 1.0, 2.0]);
        log.frames_in_window_at(0.0, 0.0, 0.0);

        assert_eq!(rel(&log.frames_in_window_at(0.0, 0.5, 1.0)), vec![1.0]);
        assert!(log.frames_in_window_at(0.0, 1.0, 1.5).is_empty());
    }

    #[test]
    fn test_rearm_replay_seeds_again() {
        let log = session(&[0.0, 1.0]);
        assert_eq!(log.frames_in_window_at(7.0, 7.0, 7.0).len(), 1);
        assert!(log.frames_in_window_at(7.0, 7.0, 7.0).is_empty());
        log.rearm_replay();
        assert_eq!(log.frames_in_window_at(7.0, 7.0, 7.0).len(), 1);
    }

    #[test]
    fn test_window_returns_timestamp_order() {
        let log = session(&[0.0, 3.0, 2.0, 1.0]);
        log.frames_in_window_at(0.0, 0.0, 0.0);
        assert_eq!(rel(&log.frames_in_window_at(0.0, 0.0, 5.0)), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_bad_records_are_skipped() {
        let records = vec![
            RawRecord::new(1.0, id(1, 1), &[1]),
            RawRecord {
                timestamp: TimestampRepr::Text("later".into()),
                identifier: FieldRepr::Integer(id(1, 2) as u64),
                payload: FieldRepr::Bytes(vec![]),
            },
            RawRecord::new(0.5, 0x3FFF_FFFF, &[]),
            RawRecord {
                timestamp: TimestampRepr::Seconds(3.0),
                identifier: FieldRepr::Integer(id(2, 3) as u64),
                payload: FieldRepr::Text("0X|GG".into()),
            },
        ];
        let log = LogSession::from_records(&records, LogSource::InnoMaker, SessionConfig::new());

        // The out-of-range identifier at 0.5 must not move ts_start
        assert_eq!(log.ts_start(), 1.0);
        assert_eq!(log.ts_end(), 3.0);
        assert_eq!(log.frames().len(), 2);
        assert!(log.frames()[1].payload().is_empty());

        let stats = log.stats();
        assert_eq!(stats.ingested, 2);
        assert_eq!(stats.malformed_timestamp, 1);
        assert_eq!(stats.malformed_identifier, 1);
        assert_eq!(stats.malformed_payload, 1);
    }

    #[test]
    fn test_one_bad_json_record_keeps_the_rest() {
        let json = format!(
            r#"[
                {{ "timestamp": 1.0, "identifier": {a}, "payload": [1, 2] }},
                {{ "timestamp": 2.0, "identifier": {a}, "payload": [1, 300] }},
                {{ "timestamp": 3.0, "identifier": -5, "payload": [3] }},
                {{ "timestamp": null, "identifier": {a}, "payload": [] }},
                42,
                {{ "timestamp": 4.0, "identifier": {a}, "payload": [3] }}
            ]"#,
            a = id(1, 1)
        );
        let log = LogSession::from_json(&json, LogSource::Live, SessionConfig::new()).unwrap();

        assert_eq!(log.frames().len(), 3);
        assert_eq!(log.frames()[0].payload().as_bytes(), &[1, 2]);
        assert!(log.frames()[1].payload().is_empty());
        assert_eq!(log.frames()[2].payload().as_bytes(), &[3]);
        assert_eq!(log.ts_end(), 4.0);

        let stats = log.stats();
        assert_eq!(stats.malformed_payload, 1);
        assert_eq!(stats.malformed_identifier, 1);
        assert_eq!(stats.malformed_timestamp, 1);
        assert_eq!(stats.malformed_record, 1);
    }

    #[test]
    fn test_capture_must_be_an_array() {
        let result = LogSession::from_json("{\"timestamp\": 1}", LogSource::Live, SessionConfig::new());
        assert!(matches!(result, Err(DecoderError::MalformedCapture(_))));
    }

    #[test]
    fn test_ignored_api_does_not_move_bounds() {
        let records = vec![
            RawRecord::new(5.0, id(1, 0x3FF), &[]),
            RawRecord::new(6.0, id(1, 1), &[]),
            RawRecord::new(7.0, id(1, 2), &[]),
        ];
        let config = SessionConfig::new().ignore_api(0x3FF);
        let log = LogSession::from_records(&records, LogSource::Live, config);

        assert_eq!(log.ts_start(), 6.0);
        assert_eq!(log.frames().len(), 2);
        assert_eq!(log.stats().ignored, 1);
        let addr = GlobalAddress::new(2, 5, 1).unwrap();
        assert!(!log.controllers().get(&addr).unwrap().apis_seen().contains(&0x3FF));
    }

    #[test]
    fn test_empty_log() {
        let log = LogSession::from_records(&Vec::<RawRecord>::new(), LogSource::Live, SessionConfig::new());
        assert_eq!(log.ts_start(), 0.0);
        assert_eq!(log.duration(), 0.0);
        assert!(log.frames_in_window_at(0.0, 0.0, 1.0).is_empty());
    }

    #[test]
    fn test_log_controllers_have_no_liveness() {
        let log = session(&[0.0, 1.0]);
        let controller = log.controllers().iter().next().unwrap();
        assert!(controller.liveness().is_none());
        assert_eq!(controller.apis_seen().len(), 2);
        assert!(log.controller_of(&log.frames()[0]).is_some());
    }
}
