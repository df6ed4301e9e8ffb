//! Frame payload normalisation
//!
//! A classic CAN frame carries 0-8 data bytes. Payloads arrive as byte
//! lists (live bus), plain integers, or hex text with source specific
//! decoration (log exports). Everything is normalised into [`Payload`].

use crate::types::{DecoderError, Result};
use serde::Serialize;
use std::fmt;

/// Fixed data width of a classic CAN frame
pub const MAX_PAYLOAD_LEN: usize = 8;

/// The data bytes of one frame (0-8 bytes)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Payload(Vec<u8>);

impl Payload {
    /// A zero-length payload
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Wrap raw data bytes, rejecting anything longer than 8 bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > MAX_PAYLOAD_LEN {
            return Err(DecoderError::MalformedPayload(format!(
                "{} bytes exceeds the {}-byte frame width",
                bytes.len(),
                MAX_PAYLOAD_LEN
            )));
        }
        Ok(Self(bytes.to_vec()))
    }

    /// Full 8-byte payload holding `value` big-endian
    pub fn from_integer(value: u64) -> Self {
        Self(value.to_be_bytes().to_vec())
    }

    /// Parse hex text after removing `marker` (if present) and all whitespace.
    ///
    /// An empty string yields an empty payload.
    pub fn from_hex_text(text: &str, marker: Option<&str>) -> Result<Self> {
        let stripped = match marker {
            Some(marker) => text.trim_start().strip_prefix(marker).unwrap_or(text),
            None => text,
        };
        let digits: String = stripped.chars().filter(|c| !c.is_whitespace()).collect();

        if digits.is_empty() {
            return Ok(Self::empty());
        }
        let bytes = hex::decode(&digits)
            .map_err(|e| DecoderError::MalformedPayload(format!("{:?}: {}", text, e)))?;

        if bytes.len() > MAX_PAYLOAD_LEN {
            return Err(DecoderError::MalformedPayload(format!(
                "{:?} holds more than {} bytes",
                text, MAX_PAYLOAD_LEN
            )));
        }

        Ok(Self(bytes))
    }

    /// The bytes as received
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The payload at the fixed 8-byte frame width; unused data bytes are zero
    pub fn padded(&self) -> [u8; MAX_PAYLOAD_LEN] {
        let mut out = [0u8; MAX_PAYLOAD_LEN];
        out[..self.0.len()].copy_from_slice(&self.0);
        out
    }

    /// Big-endian value of the fixed-width payload
    pub fn to_integer(&self) -> u64 {
        u64::from_be_bytes(self.padded())
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes: Vec<String> = self.0.iter().map(|b| hex::encode_upper([*b])).collect();
        write!(f, "{}", bytes.join(" "))
    }
}

/// Big-endian bytes of `value`, keeping the `length` least significant bytes.
///
/// Shorter values are zero-padded on the left.
pub fn to_bytes(value: u64, length: usize) -> Vec<u8> {
    let length = length.min(MAX_PAYLOAD_LEN);
    value.to_be_bytes()[MAX_PAYLOAD_LEN - length..].to_vec()
}

/// Big-endian value of up to 8 bytes; missing high-order bytes are zero.
///
/// Values are fixed-width 64-bit, so leading zero bytes are not recoverable.
pub fn to_integer(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .rev()
        .take(MAX_PAYLOAD_LEN)
        .rev()
        .fold(0u64, |acc, b| (acc << 8) | *b as u64)
}
