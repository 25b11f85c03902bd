//! Mapping model: wire keys, option flags and preset entries
//!
//! A preset is an ordered list of [`MappingEntry`] values. The engine never
//! edits entries in place; a reload builds a new [`MappingTable`] and swaps
//! it into the [`MappingStore`].

mod store;
mod table;

pub use store::MappingStore;
pub use table::MappingTable;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::control::ControlId;

/// Identifies one logical control on a device: status byte (type | channel)
/// plus note or CC number. Matching is exact, there is no channel wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WireKey {
    pub status: u8,
    pub data1: u8,
}

impl WireKey {
    pub const fn new(status: u8, data1: u8) -> Self {
        Self { status, data1 }
    }
}

impl fmt::Display for WireKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:02X} {:02X})", self.status, self.data1)
    }
}

/// A single option flag as written in preset files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingFlag {
    /// Momentary press/release regardless of the hardware's native shape
    Button,
    /// Literal two-state switch, the value byte sets the level
    #[serde(alias = "sw")]
    Switch,
}

/// Interpretation flags attached to one mapping entry.
///
/// Both flags may be set; `switch` wins during dispatch. Neither set means
/// the wire message's natural note-on/note-off or CC semantics apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MappingOptions {
    pub button: bool,
    pub switch: bool,
}

impl MappingOptions {
    pub const NONE: MappingOptions = MappingOptions {
        button: false,
        switch: false,
    };

    pub const fn button() -> Self {
        Self {
            button: true,
            switch: false,
        }
    }

    pub const fn switch() -> Self {
        Self {
            button: false,
            switch: true,
        }
    }

    pub fn with(mut self, flag: MappingFlag) -> Self {
        match flag {
            MappingFlag::Button => self.button = true,
            MappingFlag::Switch => self.switch = true,
        }
        self
    }

    pub fn flags(&self) -> Vec<MappingFlag> {
        let mut flags = Vec::new();
        if self.button {
            flags.push(MappingFlag::Button);
        }
        if self.switch {
            flags.push(MappingFlag::Switch);
        }
        flags
    }
}

impl FromIterator<MappingFlag> for MappingOptions {
    fn from_iter<I: IntoIterator<Item = MappingFlag>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, Self::with)
    }
}

/// One preset line: wire key, option flags and the control it drives
#[derive(Debug, Clone, PartialEq)]
pub struct MappingEntry {
    pub key: WireKey,
    pub options: MappingOptions,
    pub target: ControlId,
}

impl MappingEntry {
    pub fn new(key: WireKey, options: MappingOptions, target: ControlId) -> Self {
        Self {
            key,
            options,
            target,
        }
    }
}

impl From<(WireKey, MappingOptions, ControlId)> for MappingEntry {
    fn from((key, options, target): (WireKey, MappingOptions, ControlId)) -> Self {
        Self::new(key, options, target)
    }
}
