//! Device, zone and input names.
//!
//! Names live on the amplifier and are read with the ALLNAMES packet.  The
//! decoders never look names up on their own; instead the caller hands them
//! an [`InputMapping`] so the same bytes can be resolved against whatever
//! names the session currently knows.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::zone::{InputRef, ZoneId};
use crate::domain::{INPUT_COUNT, ZONE_COUNT};

/// Name used for a zone the device did not report.
pub fn default_zone_name(zone: u8) -> String {
    format!("Zone {zone}")
}

/// Name used for an input the device did not report.
///
/// Input 8 is the built-in streaming input and the device often omits it.
pub fn default_input_name(id: u8) -> String {
    if usize::from(id) == INPUT_COUNT {
        "Wi-Fi".to_string()
    } else {
        format!("Input{id}")
    }
}

/// Everything the ALLNAMES packet carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameTable {
    pub device_name: String,
    /// Always eight entries, index 0 is zone 1.
    pub zone_names: Vec<String>,
    /// Input id (1..=8) to name.  Always has all eight keys.
    pub input_names: BTreeMap<u8, String>,
    /// Set when the packet ran out before every name was read.
    pub truncated: bool,
}

impl Default for NameTable {
    fn default() -> Self {
        Self {
            device_name: String::new(),
            zone_names: (1..=ZONE_COUNT as u8).map(default_zone_name).collect(),
            input_names: (1..=INPUT_COUNT as u8)
                .map(|id| (id, default_input_name(id)))
                .collect(),
            truncated: false,
        }
    }
}

impl NameTable {
    pub fn zone_name(&self, zone: ZoneId) -> &str {
        self.zone_names
            .get(zone.index())
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn input_name(&self, id: u8) -> Option<&str> {
        self.input_names.get(&id).map(String::as_str)
    }

    /// Updates a cached zone name after a successful rename.
    pub fn set_zone_name(&mut self, zone: ZoneId, name: impl Into<String>) {
        if let Some(slot) = self.zone_names.get_mut(zone.index()) {
            *slot = name.into();
        }
    }

    pub fn set_input_name(&mut self, id: u8, name: impl Into<String>) {
        self.input_names.insert(id, name.into());
    }
}

/// Input id to display name, injected into the sync and change decoders.
///
/// The default mapping names the inputs `Input1` through `Input8`; a session
/// that has read the device names builds one from its [`NameTable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputMapping(BTreeMap<u8, String>);

impl InputMapping {
    /// An empty mapping: every input byte decodes as unknown.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, id: u8) -> Option<&str> {
        self.0.get(&id).map(String::as_str)
    }

    pub fn insert(&mut self, id: u8, name: impl Into<String>) {
        self.0.insert(id, name.into());
    }

    /// Resolves a raw input byte to a named input, or [`InputRef::Unknown`].
    pub fn resolve(&self, id: u8) -> InputRef {
        match self.get(id) {
            Some(name) => InputRef::Named {
                id,
                name: name.to_string(),
            },
            None => InputRef::Unknown(id),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &str)> {
        self.0.iter().map(|(id, name)| (*id, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for InputMapping {
    fn default() -> Self {
        (1..=INPUT_COUNT as u8)
            .map(|id| (id, format!("Input{id}")))
            .collect()
    }
}

impl From<&NameTable> for InputMapping {
    fn from(names: &NameTable) -> Self {
        Self(names.input_names.clone())
    }
}

impl<S: Into<String>> FromIterator<(u8, S)> for InputMapping {
    fn from_iter<I: IntoIterator<Item = (u8, S)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(id, name)| (id, name.into())).collect())
    }
}
