//! Bus transport seams
//!
//! The decoder never talks to hardware itself. Live monitoring reads through a
//! [`FrameSource`], replay writes through a [`FrameSink`]. [`LoopbackBus`] is an
//! in-memory bus implementing both.

use crate::types::{DecoderError, Result, Timestamp};
use std::collections::VecDeque;

/// A frame as delivered by a bus adapter
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedFrame {
    /// Seconds, as stamped by the adapter
    pub timestamp: Timestamp,
    /// Raw identifier; range checking is left to ingestion
    pub identifier: u32,
    pub payload: Vec<u8>,
}

impl ReceivedFrame {
    pub fn new(timestamp: Timestamp, identifier: u32, payload: &[u8]) -> Self {
        Self {
            timestamp,
            identifier,
            payload: payload.to_vec(),
        }
    }
}

/// Receive side of a bus adapter
pub trait FrameSource {
    /// Return up to `max_count` frames that are already waiting, without blocking
    fn read_available_frames(&mut self, max_count: usize) -> Result<Vec<ReceivedFrame>>;
}

/// Transmit side of a bus adapter
pub trait FrameSink {
    fn send_frame(&mut self, identifier: u32, payload: &[u8]) -> Result<()>;
}

impl<T: FrameSource + ?Sized> FrameSource for &mut T {
    fn read_available_frames(&mut self, max_count: usize) -> Result<Vec<ReceivedFrame>> {
        (**self).read_available_frames(max_count)
    }
}

impl<T: FrameSink + ?Sized> FrameSink for &mut T {
    fn send_frame(&mut self, identifier: u32, payload: &[u8]) -> Result<()> {
        (**self).send_frame(identifier, payload)
    }
}

/// In-memory bus: queued frames are read back in order, sent frames are kept.
///
/// `fail_after` makes the bus report a transport failure once that many
/// frames have been sent.
#[derive(Debug, Default)]
pub struct LoopbackBus {
    pending: VecDeque<ReceivedFrame>,
    sent: Vec<(u32, Vec<u8>)>,
    fail_after: Option<usize>,
}

impl LoopbackBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a frame for a later read
    pub fn push(&mut self, frame: ReceivedFrame) {
        self.pending.push_back(frame);
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Everything sent so far, in order
    pub fn sent(&self) -> &[(u32, Vec<u8>)] {
        &self.sent
    }

    pub fn fail_after(mut self, sent: usize) -> Self {
        self.fail_after = Some(sent);
        self
    }
}

impl FrameSource for LoopbackBus {
    fn read_available_frames(&mut self, max_count: usize) -> Result<Vec<ReceivedFrame>> {
        let count = max_count.min(self.pending.len());
        Ok(self.pending.drain(..count).collect())
    }
}

impl FrameSink for LoopbackBus {
    fn send_frame(&mut self, identifier: u32, payload: &[u8]) -> Result<()> {
        if self.fail_after.is_some_and(|limit| self.sent.len() >= limit) {
            return Err(DecoderError::TransportFailure(format!(
                "loopback bus refused frame 0x{:08X}",
                identifier
            )));
        }
        self.sent.push((identifier, payload.to_vec()));
        Ok(())
    }
}
