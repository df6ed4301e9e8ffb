//! Device definitions: identification profiles and message layouts

pub mod database;
pub mod definition;

pub use database::{DeviceLibrary, DeviceProfile, LibraryStats};
pub use definition::{
    ApiUsage, CodeRef, DeviceDefinition, DeviceInfo, FieldDefinition, MessageDefinition, Scale,
};
