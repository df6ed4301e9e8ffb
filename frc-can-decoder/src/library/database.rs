//! Device library
//!
//! Combines device definition files into one read-only database of
//! identification profiles and message layouts. Built once at startup and
//! passed by reference to whatever needs it.

use super::definition::{ApiUsage, DeviceDefinition, MessageDefinition};
use crate::types::{DecoderError, GlobalAddress, Result};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

/// Identification profile of one device model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Manufacturer code
    pub manufacturer: u8,
    pub name: String,
    /// Every one of these must have been seen
    pub always_used: BTreeSet<u16>,
    /// Each one seen scores a point
    pub sometimes_used: BTreeSet<u16>,
    /// Any one seen rules the profile out
    pub never_used: BTreeSet<u16>,
}

impl DeviceProfile {
    pub fn new(manufacturer: u8, name: impl Into<String>, usage: ApiUsage) -> Self {
        Self {
            manufacturer,
            name: name.into(),
            always_used: usage.always_used,
            sometimes_used: usage.sometimes_used,
            never_used: usage.never_used,
        }
    }
}

/// The device library
#[derive(Debug, Default)]
pub struct DeviceLibrary {
    profiles: Vec<DeviceProfile>,
    /// Key: (manufacturer, device type), Value: message layouts by API
    messages: HashMap<(u8, u8), HashMap<u16, MessageDefinition>>,
    num_files: usize,
}

/// Statistics about the loaded library
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LibraryStats {
    pub num_files: usize,
    pub num_profiles: usize,
    pub num_messages: usize,
}

impl DeviceLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one parsed definition
    pub fn add_definition(&mut self, definition: DeviceDefinition, source: &str) -> Result<()> {
        let manufacturer = definition.device.manufacturer.resolve_manufacturer()?;

        match definition.api_usage {
            Some(usage) => self.profiles.push(DeviceProfile::new(
                manufacturer,
                definition.device.name.clone(),
                usage,
            )),
            None => log::warn!("{}: no api_usage section, not used for identification", source),
        }

        if !definition.messages.is_empty() {
            match &definition.device.device_type {
                Some(device_type) => {
                    let key = (manufacturer, device_type.resolve_device_type()?);
                    // Later files extend (and override) earlier ones
                    self.messages.entry(key).or_default().extend(definition.messages);
                }
                None => log::warn!(
                    "{}: messages without a device_type are ignored",
                    source
                ),
            }
        }

        self.num_files += 1;
        Ok(())
    }

    /// Parse YAML text and add it
    pub fn add_yaml_str(&mut self, yaml: &str, source: &str) -> Result<()> {
        let definition: DeviceDefinition = serde_yaml::from_str(yaml)
            .map_err(|e| DecoderError::LibraryParseError(format!("{}: {}", source, e)))?;
        self.add_definition(definition, source)
    }

    /// Load one definition file
    pub fn add_file(&mut self, path: &Path) -> Result<()> {
        log::info!("Loading device definition: {:?}", path);
        let content = fs::read_to_string(path)?;
        self.add_yaml_str(&content, &path.display().to_string())
    }

    /// Load every `.yaml`/`.yml` file under `dir`, recursively.
    ///
    /// Files are visited in sorted path order so profile order is stable.
    /// Returns the number of files loaded.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        log::info!("Loading device library from {:?}", dir);

        let mut entries = fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort();

        let mut loaded = 0;
        for path in entries {
            if path.is_dir() {
                loaded += self.load_dir(&path)?;
            } else if is_yaml(&path) {
                self.add_file(&path)?;
                loaded += 1;
            }
        }
        Ok(loaded)
    }

    /// Identification profiles, in load order
    pub fn profiles(&self) -> &[DeviceProfile] {
        &self.profiles
    }

    /// Layout for frames of `api` sent by the device at `address`
    pub fn message(&self, address: &GlobalAddress, api: u16) -> Option<&MessageDefinition> {
        self.messages
            .get(&(address.manufacturer, address.device_type))
            .and_then(|apis| apis.get(&api))
    }

    pub fn stats(&self) -> LibraryStats {
        LibraryStats {
            num_files: self.num_files,
            num_profiles: self.profiles.len(),
            num_messages: self.messages.values().map(|apis| apis.len()).sum(),
        }
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()).as_deref(),
        Some("yaml") | Some("yml")
    )
}
