//! Raw log records and their source specific representations
//!
//! Capture tools disagree on how they write the frame triple: integers, byte
//! lists, `0x` text, marker prefixed hex text, `sec.ms.us` timestamps. A
//! record carries its fields as a [`FieldRepr`] and is decoded through the
//! [`SourceFormat`] of its [`LogSource`].

use crate::payload::Payload;
use crate::types::{DecoderError, Result, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a batch of records came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogSource {
    /// Frames captured directly from a bus adapter
    #[default]
    Live,
    /// InnoMaker USB-CAN tool spreadsheet export
    InnoMaker,
    /// Frame table exported by the monitoring GUI
    GuiCsv,
}

/// Decoding rules for one [`LogSource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceFormat {
    /// Token written in front of hex payload text
    pub payload_marker: Option<&'static str>,
}

impl LogSource {
    /// The dispatch table: every source maps to exactly one format
    pub fn format(self) -> SourceFormat {
        match self {
            LogSource::Live => SourceFormat {
                payload_marker: None,
            },
            LogSource::InnoMaker => SourceFormat {
                payload_marker: Some("0X|"),
            },
            LogSource::GuiCsv => SourceFormat {
                payload_marker: None,
            },
        }
    }
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSource::Live => write!(f, "live"),
            LogSource::InnoMaker => write!(f, "innomaker"),
            LogSource::GuiCsv => write!(f, "gui-csv"),
        }
    }
}

impl FromStr for LogSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "live" => Ok(LogSource::Live),
            "innomaker" => Ok(LogSource::InnoMaker),
            "gui-csv" | "gui" | "csv" => Ok(LogSource::GuiCsv),
            other => Err(format!("unknown log source: {}", other)),
        }
    }
}

/// An identifier or payload field as written by the capture tool
///
/// `Other` holds whatever matched no known shape (negative numbers, bytes
/// above 255, `null`, a missing field); it always decodes to an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldRepr {
    Integer(u64),
    Bytes(Vec<u8>),
    Text(String),
    Other(serde_json::Value),
}

impl Default for FieldRepr {
    fn default() -> Self {
        FieldRepr::Other(serde_json::Value::Null)
    }
}

/// A timestamp as written by the capture tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimestampRepr {
    Seconds(f64),
    Text(String),
    Other(serde_json::Value),
}

impl Default for TimestampRepr {
    fn default() -> Self {
        TimestampRepr::Other(serde_json::Value::Null)
    }
}

/// One undecoded `(timestamp, identifier, payload)` record
///
/// Deserializing never fails for a JSON object, so one bad record cannot
/// reject a whole capture; bad fields surface when the record is decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub timestamp: TimestampRepr,
    #[serde(default)]
    pub identifier: FieldRepr,
    #[serde(default)]
    pub payload: FieldRepr,
}

impl RawRecord {
    /// Record from already-typed values
    pub fn new(timestamp: Timestamp, identifier: u32, payload: &[u8]) -> Self {
        Self {
            timestamp: TimestampRepr::Seconds(timestamp),
            identifier: FieldRepr::Integer(identifier as u64),
            payload: FieldRepr::Bytes(payload.to_vec()),
        }
    }

    pub fn timestamp(&self) -> Result<Timestamp> {
        decode_timestamp(&self.timestamp)
    }

    pub fn identifier(&self) -> Result<u32> {
        decode_identifier(&self.identifier)
    }

    pub fn payload(&self, source: LogSource) -> Result<Payload> {
        decode_payload(&self.payload, source.format())
    }
}

/// Decode an identifier field to its raw numeric value
///
/// Text is hex with a `0x` prefix, decimal otherwise. Range checking against
/// the 29-bit layout happens in [`crate::identifier::decode`].
pub fn decode_identifier(repr: &FieldRepr) -> Result<u32> {
    let value = match repr {
        FieldRepr::Integer(v) => *v,
        FieldRepr::Bytes(bytes) => {
            if bytes.len() > 4 {
                return Err(DecoderError::MalformedIdentifier(format!(
                    "{} identifier bytes",
                    bytes.len()
                )));
            }
            crate::payload::to_integer(bytes)
        }
        FieldRepr::Text(text) => {
            let text = text.trim();
            let parsed = match text
                .strip_prefix("0x")
                .or_else(|| text.strip_prefix("0X"))
            {
                Some(hex) => u64::from_str_radix(hex, 16),
                None => text.parse::<u64>(),
            };
            parsed.map_err(|e| DecoderError::MalformedIdentifier(format!("{:?}: {}", text, e)))?
        }
        FieldRepr::Other(value) => {
            return Err(DecoderError::MalformedIdentifier(format!(
                "unsupported identifier {}",
                value
            )))
        }
    };

    u32::try_from(value)
        .map_err(|_| DecoderError::MalformedIdentifier(format!("0x{:X} does not fit in 32 bits", value)))
}

/// Decode a payload field using the source's format rules
pub fn decode_payload(repr: &FieldRepr, format: SourceFormat) -> Result<Payload> {
    match repr {
        FieldRepr::Integer(v) => Ok(Payload::from_integer(*v)),
        FieldRepr::Bytes(bytes) => Payload::from_bytes(bytes),
        FieldRepr::Text(text) => Payload::from_hex_text(text, format.payload_marker),
        FieldRepr::Other(value) => Err(DecoderError::MalformedPayload(format!(
            "unsupported payload {}",
            value
        ))),
    }
}

/// Decode a timestamp to seconds
///
/// Three-part text `sec.ms.us` is how the InnoMaker tool writes times;
/// anything else must parse as a float.
pub fn decode_timestamp(repr: &TimestampRepr) -> Result<Timestamp> {
    let secs = match repr {
        TimestampRepr::Seconds(secs) => *secs,
        TimestampRepr::Text(text) => {
            let text = text.trim();
            let parts: Vec<&str> = text.split('.').collect();
            if parts.len() == 3 {
                let parse = |s: &str| {
                    s.parse::<f64>().map_err(|e| {
                        DecoderError::MalformedTimestamp(format!("{:?}: {}", text, e))
                    })
                };
                parse(parts[0])? + parse(parts[1])? / 1_000.0 + parse(parts[2])? / 1_000_000.0
            } else {
                text.parse::<f64>()
                    .map_err(|e| DecoderError::MalformedTimestamp(format!("{:?}: {}", text, e)))?
            }
        }
        TimestampRepr::Other(value) => {
            return Err(DecoderError::MalformedTimestamp(format!(
                "unsupported timestamp {}",
                value
            )))
        }
    };

    if !secs.is_finite() {
        return Err(DecoderError::MalformedTimestamp(format!("{} is not finite", secs)));
    }
    Ok(secs)
}
