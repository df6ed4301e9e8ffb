//! Message Decoding Engine
//!
//! Extracts field values from frame payloads based on the message layouts of
//! the device library. FRC devices lay their fields out little-endian on
//! byte boundaries.

use crate::library::{DeviceLibrary, FieldDefinition, MessageDefinition};
use crate::payload::MAX_PAYLOAD_LEN;
use crate::types::Frame;
use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;
use std::fmt;

/// A frame interpreted through its message layout
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedMessage {
    /// Message name, `API_<n>` when the layout has none
    pub name: String,
    pub api: u16,
    pub fields: Vec<DecodedField>,
}

/// One decoded field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedField {
    pub name: String,
    /// Physical value after scaling
    pub value: f64,
    /// Raw value before scaling (useful for debugging)
    pub raw_value: i64,
    pub unit: Option<String>,
}

impl fmt::Display for DecodedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(unit) => write!(f, "{}={} {}", self.name, self.value, unit),
            None => write!(f, "{}={}", self.name, self.value),
        }
    }
}

/// Message decoder - extracts fields from frames
pub struct MessageDecoder;

impl MessageDecoder {
    /// Decode a frame using the library's layout for its device and API
    ///
    /// # Returns
    /// * `Some(DecodedMessage)` if the library knows the device and API
    /// * `None` otherwise
    pub fn decode_frame(frame: &Frame, library: &DeviceLibrary) -> Option<DecodedMessage> {
        let message_def = library.message(&frame.address(), frame.api())?;
        Some(Self::decode_message(
            &frame.payload().padded(),
            frame.api(),
            message_def,
        ))
    }

    /// Decode fixed-width payload data with a known layout
    pub fn decode_message(
        data: &[u8; MAX_PAYLOAD_LEN],
        api: u16,
        message_def: &MessageDefinition,
    ) -> DecodedMessage {
        let fields = message_def
            .fields
            .iter()
            .filter_map(|field| Self::decode_field(data, field))
            .collect();

        DecodedMessage {
            name: message_def
                .name
                .clone()
                .unwrap_or_else(|| format!("API_{}", api)),
            api,
            fields,
        }
    }

    /// Decode a single field; `None` if it does not fit or its scale is bad
    fn decode_field(data: &[u8], field: &FieldDefinition) -> Option<DecodedField> {
        let raw_value = Self::extract_field_value(data, field)?;

        let factor = match field.scale.factor() {
            Ok(factor) => factor,
            Err(e) => {
                log::warn!("Field '{}': {}", field.name, e);
                return None;
            }
        };

        Some(DecodedField {
            name: field.name.clone(),
            value: raw_value as f64 * factor,
            raw_value,
            unit: field.unit.clone(),
        })
    }

    /// Extract the raw little-endian value of a field
    fn extract_field_value(data: &[u8], field: &FieldDefinition) -> Option<i64> {
        let start = field.start;
        let length = field.length;

        let end = match start
            .checked_add(length)
            .filter(|end| length > 0 && *end <= data.len())
        {
            Some(end) => end,
            None => {
                log::warn!(
                    "Field '{}' ({} bytes at offset {}) does not fit a {}-byte frame",
                    field.name,
                    length,
                    start,
                    data.len()
                );
                return None;
            }
        };

        let raw = &data[start..end];
        let signed = field.is_signed();

        let value = match (length, signed) {
            (1, false) => raw[0] as i64,
            (1, true) => raw[0] as i8 as i64,
            (2, false) => LittleEndian::read_u16(raw) as i64,
            (2, true) => LittleEndian::read_i16(raw) as i64,
            (4, false) => LittleEndian::read_u32(raw) as i64,
            (4, true) => LittleEndian::read_i32(raw) as i64,
            (_, false) => LittleEndian::read_uint(raw, length) as i64,
            (_, true) => LittleEndian::read_int(raw, length),
        };

        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::Scale;

    fn field(name: &str, start: usize, length: usize, value_type: &str) -> FieldDefinition {
        FieldDefinition {
            name: name.to_string(),
            start,
            length,
            value_type: value_type.to_string(),
            scale: Scale::default(),
            unit: None,
        }
    }

    #[test]
    fn test_extract_little_endian_simple() {
        let data = [0xAB, 0xCD, 0xEF, 0x12, 0, 0, 0, 0];
        let value = MessageDecoder::extract_field_value(&data, &field("x", 0, 1, "uint8"));
        assert_eq!(value, Some(0xAB));
    }

    #[test]
    fn test_extract_little_endian_cross_byte() {
        let data = [0xAB, 0xCD, 0xEF, 0x12, 0, 0, 0, 0];
        let value = MessageDecoder::extract_field_value(&data, &field("x", 0, 2, "uint16"));
        assert_eq!(value, Some(0xCDAB));
        let value = MessageDecoder::extract_field_value(&data, &field("x", 0, 4, "uint32"));
        assert_eq!(value, Some(0x12EF_CDAB));
    }

    #[test]
    fn test_extract_signed() {
        let data = [0xFF, 0x00, 0x80, 0, 0, 0, 0, 0];
        assert_eq!(
            MessageDecoder::extract_field_value(&data, &field("x", 0, 1, "int8")),
            Some(-1)
        );
        assert_eq!(
            MessageDecoder::extract_field_value(&data, &field("x", 1, 2, "int16")),
            Some(-32768)
        );
    }

    #[test]
    fn test_extract_odd_width() {
        let data = [0x01, 0x02, 0x03, 0, 0, 0, 0, 0];
        assert_eq!(
            MessageDecoder::extract_field_value(&data, &field("x", 0, 3, "uint")),
            Some(0x030201)
        );
    }

    #[test]
    fn test_field_out_of_bounds() {
        let data = [0u8; 8];
        assert_eq!(MessageDecoder::extract_field_value(&data, &field("x", 7, 2, "uint")), None);
        assert_eq!(MessageDecoder::extract_field_value(&data, &field("x", 0, 0, "uint")), None);
    }

    #[test]
    fn test_field_offset_overflow() {
        let data = [0u8; 8];
        assert_eq!(
            MessageDecoder::extract_field_value(&data, &field("x", usize::MAX, 2, "uint")),
            None
        );
        assert_eq!(
            MessageDecoder::extract_field_value(&data, &field("x", 1, usize::MAX, "uint")),
            None
        );

        let message_def = MessageDefinition {
            name: Some("Status".into()),
            fields: vec![field("wrapped", usize::MAX, 2, "uint"), field("ok", 0, 1, "uint8")],
        };
        let decoded = MessageDecoder::decode_message(&data, 96, &message_def);
        assert_eq!(decoded.fields.len(), 1);
        assert_eq!(decoded.fields[0].name, "ok");
    }

    #[test]
    fn test_decode_message_with_scale() {
        let mut output = field("applied_output", 0, 2, "int16");
        output.scale = Scale::Ratio("1/32767".into());
        let mut temp = field("temperature", 2, 1, "uint8");
        temp.unit = Some("C".into());
        let message_def = MessageDefinition {
            name: None,
            fields: vec![output, temp, field("broken", 7, 4, "uint")],
        };

        let data = [0xFF, 0x7F, 40, 0, 0, 0, 0, 0];
        let decoded = MessageDecoder::decode_message(&data, 96, &message_def);

        assert_eq!(decoded.name, "API_96");
        assert_eq!(decoded.fields.len(), 2);
        assert!((decoded.fields[0].value - 1.0).abs() < 1e-12);
        assert_eq!(decoded.fields[1].raw_value, 40);
        assert_eq!(decoded.fields[1].to_string(), "temperature=40 C");
    }
}
