//! Core types for the FRC CAN decoder library
//!
//! This module defines the fundamental types shared by the codecs, the
//! sessions and the replay machinery: the error taxonomy, the decoded device
//! address and the immutable [`Frame`].

use crate::payload::Payload;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamps are seconds as `f64` (epoch seconds for live buses, whatever
/// the capture tool wrote for logs).
pub type Timestamp = f64;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Errors that can occur while decoding, ingesting or replaying frames
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("Malformed identifier: {0}")]
    MalformedIdentifier(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Malformed timestamp: {0}")]
    MalformedTimestamp(String),

    #[error("Malformed capture: {0}")]
    MalformedCapture(String),

    #[error("Field '{field}' out of range: {value} > {max}")]
    InvalidField {
        field: &'static str,
        value: u32,
        max: u32,
    },

    #[error("Failed to parse device library: {0}")]
    LibraryParseError(String),

    #[error("Session has ended")]
    SessionEnded,

    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// The stable identity of a physical device on the bus.
///
/// Decoded from the 29-bit identifier; the API field is deliberately not
/// part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GlobalAddress {
    /// 5-bit device type (0-31)
    pub device_type: u8,
    /// 8-bit manufacturer code (0-255)
    pub manufacturer: u8,
    /// 6-bit device number (0-63)
    pub device_number: u8,
}

impl GlobalAddress {
    pub const MAX_DEVICE_TYPE: u8 = 0x1F;
    pub const MAX_DEVICE_NUMBER: u8 = 0x3F;

    /// Create an address, validating the narrow fields
    pub fn new(device_type: u8, manufacturer: u8, device_number: u8) -> Result<Self> {
        if device_type > Self::MAX_DEVICE_TYPE {
            return Err(DecoderError::InvalidField {
                field: "device_type",
                value: device_type as u32,
                max: Self::MAX_DEVICE_TYPE as u32,
            });
        }
        if device_number > Self::MAX_DEVICE_NUMBER {
            return Err(DecoderError::InvalidField {
                field: "device_number",
                value: device_number as u32,
                max: Self::MAX_DEVICE_NUMBER as u32,
            });
        }
        Ok(Self {
            device_type,
            manufacturer,
            device_number,
        })
    }

    /// Human readable device type, e.g. "Motor Controller"
    pub fn device_type_name(&self) -> &'static str {
        crate::tables::device_type_name(self.device_type)
    }

    /// Human readable manufacturer, e.g. "REV Robotics"
    pub fn manufacturer_name(&self) -> &'static str {
        crate::tables::manufacturer_name(self.manufacturer)
    }
}

impl fmt::Display for GlobalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.device_type, self.manufacturer, self.device_number
        )
    }
}

/// One decoded bus message.
///
/// Frames are immutable once they leave the session that built them; the
/// owning controller is found through the session registry by `address`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    timestamp: Timestamp,
    relative_timestamp: Timestamp,
    identifier: u32,
    payload: Payload,
    address: GlobalAddress,
    api: u16,
}

impl Frame {
    pub(crate) fn new(
        timestamp: Timestamp,
        identifier: u32,
        payload: Payload,
        address: GlobalAddress,
        api: u16,
    ) -> Self {
        Self {
            timestamp,
            relative_timestamp: 0.0,
            identifier,
            payload,
            address,
            api,
        }
    }

    /// Only sessions set this, during their construction pass
    pub(crate) fn set_relative_timestamp(&mut self, ts_start: Timestamp) {
        self.relative_timestamp = self.timestamp - ts_start;
    }

    /// Absolute timestamp in seconds
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Seconds since the owning session's `ts_start`
    pub fn relative_timestamp(&self) -> Timestamp {
        self.relative_timestamp
    }

    /// Raw 29-bit identifier
    pub fn identifier(&self) -> u32 {
        self.identifier
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn address(&self) -> GlobalAddress {
        self.address
    }

    pub fn api(&self) -> u16 {
        self.api
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_address_validation() {
        assert!(GlobalAddress::new(31, 255, 63).is_ok());
        assert!(matches!(
            GlobalAddress::new(32, 0, 0),
            Err(DecoderError::InvalidField { field: "device_type", .. })
        ));
        assert!(matches!(
            GlobalAddress::new(0, 0, 64),
            Err(DecoderError::InvalidField { field: "device_number", .. })
        ));
    }

    #[test]
    fn test_global_address_names() {
        let addr = GlobalAddress::new(2, 5, 11).unwrap();
        assert_eq!(addr.device_type_name(), "Motor Controller");
        assert_eq!(addr.manufacturer_name(), "REV Robotics");
        assert_eq!(format!("{}", addr), "2/5/11");
    }

    #[test]
    fn test_frame_relative_timestamp() {
        let addr = GlobalAddress::new(2, 5, 11).unwrap();
        let mut frame = Frame::new(12.5, 0x205_0000, Payload::empty(), addr, 0);
        assert_eq!(frame.relative_timestamp(), 0.0);
        frame.set_relative_timestamp(10.0);
        assert_eq!(frame.relative_timestamp(), 2.5);
        assert_eq!(frame.timestamp(), 12.5);
    }
}
