//! Sessions: owned frame sequences plus their controller registries
//!
//! Both session kinds share one ingestion pipeline:
//!
//! 1. decode the identifier (out-of-range identifiers are rejected untouched)
//! 2. drop frames whose API is configured as ignored
//! 3. resolve or create the controller and record the sighting
//! 4. append the immutable [`Frame`]
//!
//! [`LiveSession`] stamps controllers with liveness and keeps growing;
//! [`LogSession`] is batch built from records and then frozen.

mod live_session;
mod log_session;
mod registry;

pub use live_session::LiveSession;
pub use log_session::{LogSession, LogSessionBuilder};
pub use registry::{Controller, ControllerRegistry, ControllerStatus, Liveness};

use crate::config::SessionConfig;
use crate::identifier;
use crate::identify;
use crate::library::DeviceLibrary;
use crate::payload::Payload;
use crate::types::{Frame, GlobalAddress, Result, Timestamp};
use serde::Serialize;

/// Read-only surface shared by both session kinds
pub trait Session {
    /// Frames in ingestion order
    fn frames(&self) -> &[Frame];

    fn controllers(&self) -> &ControllerRegistry;

    /// Earliest timestamp (0.0 until a live session sees its first frame)
    fn ts_start(&self) -> Timestamp;

    /// Latest timestamp
    fn ts_end(&self) -> Timestamp;

    /// Per-kind counts of ingested and discarded input
    fn stats(&self) -> &IngestStats;

    fn is_live(&self) -> bool;

    /// Owning controller of a frame
    fn controller_of(&self, frame: &Frame) -> Option<&Controller> {
        self.controllers().get(&frame.address())
    }

    /// Copy of everything a presentation layer shows
    fn snapshot(&self, library: &DeviceLibrary) -> SessionSnapshot {
        SessionSnapshot {
            live: self.is_live(),
            ts_start: self.ts_start(),
            ts_end: self.ts_end(),
            frames: self.frames().to_vec(),
            controllers: self
                .controllers()
                .iter()
                .map(|c| ControllerSummary::new(c, library))
                .collect(),
            stats: *self.stats(),
        }
    }
}

/// Frame ingestion, for sessions that still accept frames
pub trait Ingest {
    /// Decode and append one frame.
    ///
    /// Returns `Ok(None)` when the frame's API is ignored, and an error
    /// (without touching the session) when the identifier is malformed.
    fn ingest(
        &mut self,
        timestamp: Timestamp,
        identifier: u32,
        payload: Payload,
    ) -> Result<Option<&Frame>>;
}

/// Counts of what happened to ingested input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Frames appended to the session
    pub ingested: usize,
    /// Frames dropped because of an ignored API
    pub ignored: usize,
    /// Records rejected for an out-of-range or unparseable identifier
    pub malformed_identifier: usize,
    /// Records kept with an empty payload because theirs did not parse
    pub malformed_payload: usize,
    /// Records rejected for an unparseable timestamp
    pub malformed_timestamp: usize,
    /// Capture entries that were not records at all
    pub malformed_record: usize,
}

/// One row of the controller table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerSummary {
    pub address: GlobalAddress,
    pub device_type: &'static str,
    pub manufacturer: &'static str,
    pub device_number: u8,
    pub apis: Vec<u16>,
    /// Identified device model
    pub name: String,
    pub liveness: Option<Liveness>,
}

impl ControllerSummary {
    pub fn new(controller: &Controller, library: &DeviceLibrary) -> Self {
        let address = controller.address();
        Self {
            address,
            device_type: address.device_type_name(),
            manufacturer: address.manufacturer_name(),
            device_number: address.device_number,
            apis: controller.apis_seen().iter().copied().collect(),
            name: identify::identify(controller, library.profiles()),
            liveness: controller.liveness().copied(),
        }
    }
}

/// Read-only copy of a session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub live: bool,
    pub ts_start: Timestamp,
    pub ts_end: Timestamp,
    pub frames: Vec<Frame>,
    pub controllers: Vec<ControllerSummary>,
    pub stats: IngestStats,
}

/// The ingestion pipeline both session kinds are built on
#[derive(Debug)]
struct FrameStore {
    config: SessionConfig,
    frames: Vec<Frame>,
    registry: ControllerRegistry,
    stats: IngestStats,
}

impl FrameStore {
    fn new(config: SessionConfig, live: bool) -> Self {
        Self {
            config,
            frames: Vec::new(),
            registry: ControllerRegistry::new(live),
            stats: IngestStats::default(),
        }
    }

    /// Returns the index of the appended frame
    fn ingest(
        &mut self,
        timestamp: Timestamp,
        identifier: u32,
        payload: Payload,
        now: Timestamp,
    ) -> Result<Option<usize>> {
        let (address, api) = match identifier::decode(identifier) {
            Ok(decoded) => decoded,
            Err(e) => {
                log::warn!("Rejecting frame at {:.6}: {}", timestamp, e);
                self.stats.malformed_identifier += 1;
                return Err(e);
            }
        };

        if self.config.is_ignored_api(api) {
            log::trace!("Ignoring API 0x{:03X} from {}", api, address);
            self.stats.ignored += 1;
            return Ok(None);
        }

        self.registry
            .resolve_or_create(address, now)
            .record_sighting(api, now);

        log::trace!(
            "Frame {:.6} id=0x{:08X} {} api=0x{:03X} [{}]",
            timestamp,
            identifier,
            address,
            api,
            payload
        );
        self.frames
            .push(Frame::new(timestamp, identifier, payload, address, api));
        self.stats.ingested += 1;

        Ok(Some(self.frames.len() - 1))
    }
}
