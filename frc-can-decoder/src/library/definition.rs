//! Device definition file schema
//!
//! One YAML file describes one device model:
//!
//! ```yaml
//! device:
//!   manufacturer: REV Robotics      # name or numeric code
//!   device_type: Motor Controller   # optional, name or numeric code
//!   name: SPARK MAX
//! api_usage:
//!   always_used: [96, 97]
//!   sometimes_used: [98, 99]
//!   never_used: [400]
//! messages:
//!   96:
//!     name: Periodic Status 0
//!     fields:
//!       - { name: applied_output, start: 0, length: 2, type: int16, scale: "1/32767" }
//! ```

use crate::tables;
use crate::types::{DecoderError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A whole definition file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceDefinition {
    pub device: DeviceInfo,
    #[serde(default)]
    pub api_usage: Option<ApiUsage>,
    #[serde(default)]
    pub messages: BTreeMap<u16, MessageDefinition>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceInfo {
    pub manufacturer: CodeRef,
    #[serde(default)]
    pub device_type: Option<CodeRef>,
    pub name: String,
}

/// A table code given either numerically or by its name
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CodeRef {
    Code(u8),
    Name(String),
}

impl CodeRef {
    pub fn resolve_manufacturer(&self) -> Result<u8> {
        match self {
            CodeRef::Code(code) => Ok(*code),
            CodeRef::Name(name) => tables::manufacturer_by_name(name).ok_or_else(|| {
                DecoderError::LibraryParseError(format!("unknown manufacturer: {:?}", name))
            }),
        }
    }

    pub fn resolve_device_type(&self) -> Result<u8> {
        match self {
            CodeRef::Code(code) if *code <= 0x1F => Ok(*code),
            CodeRef::Code(code) => Err(DecoderError::LibraryParseError(format!(
                "device type {} does not fit in 5 bits",
                code
            ))),
            CodeRef::Name(name) => tables::device_type_by_name(name).ok_or_else(|| {
                DecoderError::LibraryParseError(format!("unknown device type: {:?}", name))
            }),
        }
    }
}

/// Expected API repertoire of a device model
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ApiUsage {
    #[serde(default)]
    pub always_used: BTreeSet<u16>,
    #[serde(default)]
    pub sometimes_used: BTreeSet<u16>,
    #[serde(default)]
    pub never_used: BTreeSet<u16>,
}

/// Layout of one API's payload
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageDefinition {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

/// One little-endian field inside a payload
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FieldDefinition {
    pub name: String,
    /// Byte offset
    pub start: usize,
    /// Width in bytes
    pub length: usize,
    /// "uint*" or "int*"
    #[serde(rename = "type", default = "default_value_type")]
    pub value_type: String,
    #[serde(default)]
    pub scale: Scale,
    #[serde(default)]
    pub unit: Option<String>,
}

fn default_value_type() -> String {
    "uint".to_string()
}

impl FieldDefinition {
    pub fn is_signed(&self) -> bool {
        self.value_type.starts_with("int")
    }
}

/// Scale factor: a number, or a `"num/den"` ratio string
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Scale {
    Factor(f64),
    Ratio(String),
}

impl Default for Scale {
    fn default() -> Self {
        Scale::Factor(1.0)
    }
}

impl Scale {
    pub fn factor(&self) -> Result<f64> {
        match self {
            Scale::Factor(f) => Ok(*f),
            Scale::Ratio(text) => {
                let bad = || DecoderError::LibraryParseError(format!("invalid scale: {:?}", text));
                let (num, den) = text.split_once('/').ok_or_else(bad)?;
                let num: f64 = num.trim().parse().map_err(|_| bad())?;
                let den: f64 = den.trim().parse().map_err(|_| bad())?;
                if den == 0.0 {
                    return Err(bad());
                }
                Ok(num / den)
            }
        }
    }
}
