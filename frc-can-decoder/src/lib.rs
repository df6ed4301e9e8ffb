//! FRC CAN Decoder Library
//!
//! Decodes FRC-convention CAN traffic, tracks the controllers seen on the
//! bus and replays recorded sessions in real time.
//!
//! # Architecture
//!
//! - Codecs turn the 29-bit identifier into a device address plus API code
//!   and normalise payloads and log records from different capture tools
//! - Sessions own their frames and a controller registry; live sessions also
//!   track controller liveness, log sessions are frozen after loading
//! - A device library (YAML definitions) identifies controllers by the APIs
//!   they use and decodes message fields
//! - The replay scheduler and live monitor are single-threaded polling loops
//!   driven by a [`Clock`] and stopped through an `AtomicBool`
//!
//! The library does NOT:
//! - Talk to bus hardware (hosts implement [`FrameSource`] / [`FrameSink`])
//! - Render anything (sessions hand out [`SessionSnapshot`]s)
//!
//! # Example Usage
//!
//! ```no_run
//! use frc_can_decoder::{
//!     DeviceLibrary, LogSession, LogSource, LoopbackBus, ReplayScheduler, Session,
//!     SessionConfig,
//! };
//! use std::path::Path;
//! use std::sync::atomic::AtomicBool;
//!
//! let mut library = DeviceLibrary::new();
//! library.load_dir(Path::new("devices")).unwrap();
//!
//! let json = std::fs::read_to_string("capture.json").unwrap();
//! let log = LogSession::from_json(&json, LogSource::InnoMaker, SessionConfig::new()).unwrap();
//!
//! for row in log.snapshot(&library).controllers {
//!     println!("{} {} {:?}", row.address, row.name, row.apis);
//! }
//!
//! let scheduler = ReplayScheduler::new(SessionConfig::new().tick_interval());
//! let mut bus = LoopbackBus::new();
//! let report = scheduler.run(&log, &mut bus, &AtomicBool::new(true)).unwrap();
//! println!("sent {} frames", report.frames_sent);
//! ```

// Public modules
pub mod clock;
pub mod config;
pub mod identifier;
pub mod identify;
pub mod library;
pub mod message_decoder;
pub mod monitor;
pub mod payload;
pub mod record;
pub mod replay;
pub mod session;
pub mod tables;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SessionConfig;
pub use identify::{identify, UNKNOWN_DEVICE};
pub use library::{DeviceDefinition, DeviceLibrary, DeviceProfile, LibraryStats};
pub use message_decoder::{DecodedField, DecodedMessage, MessageDecoder};
pub use monitor::{LiveMonitor, PollSummary};
pub use payload::Payload;
pub use record::{FieldRepr, LogSource, RawRecord, TimestampRepr};
pub use replay::{ReplayReport, ReplayScheduler};
pub use session::{
    Controller, ControllerRegistry, ControllerStatus, ControllerSummary, Ingest, IngestStats,
    LiveSession, Liveness, LogSession, LogSessionBuilder, Session, SessionSnapshot,
};
pub use transport::{FrameSink, FrameSource, LoopbackBus, ReceivedFrame};
pub use types::{DecoderError, Frame, GlobalAddress, Result, Timestamp};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
