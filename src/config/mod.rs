//! Preset files for ctrlmap
//!
//! Handles loading, parsing and validating YAML presets, and turning them
//! into mapping entries and controls.

pub mod watcher;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::fs;
use tracing::debug;

pub use watcher::PresetWatcher;

use crate::control::{
    ButtonMode, ButtonTarget, ControlBank, ControlId, ControlRegistry, PotTarget, TargetHandle,
};
use crate::controller::{KeyBinding, KeyboardPreset, MidiPreset};
use crate::dispatch::SwitchPolicy;
use crate::mapping::{MappingEntry, MappingFlag, MappingOptions, WireKey};

/// Root preset structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Preset {
    #[serde(default = "default_preset_name")]
    pub name: String,
    #[serde(default)]
    pub switch_policy: SwitchPolicy,
    #[serde(default)]
    pub controls: Vec<ControlConfig>,
    #[serde(default)]
    pub mappings: Vec<MappingConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keyboard: Vec<KeyConfig>,
}

/// Control declaration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControlConfig {
    pub group: String,
    pub item: String,
    pub kind: ControlKind,
    #[serde(default)]
    pub mode: ButtonMode,
    #[serde(default = "default_min")]
    pub min: f64,
    #[serde(default = "default_max")]
    pub max: f64,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Button,
    Pot,
}

/// One MIDI mapping line
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MappingConfig {
    pub status: u8,
    pub data1: u8,
    pub group: String,
    pub item: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<MappingFlag>,
}

/// One keyboard binding
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeyConfig {
    pub key: String,
    pub group: String,
    pub item: String,
}

impl ControlConfig {
    pub fn id(&self) -> ControlId {
        ControlId::new(&self.group, &self.item)
    }
}

impl MappingConfig {
    pub fn key(&self) -> WireKey {
        WireKey::new(self.status, self.data1)
    }

    pub fn target(&self) -> ControlId {
        ControlId::new(&self.group, &self.item)
    }
}

impl Preset {
    /// Load preset from a YAML file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read preset file: {}", path))?;

        Self::from_yaml(&content).with_context(|| format!("Invalid preset file: {}", path))
    }

    /// Parse and validate a preset from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let preset: Preset =
            serde_yaml::from_str(content).context("Failed to parse preset YAML")?;
        preset.validate()?;
        Ok(preset)
    }

    pub async fn save(&self, path: &str) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize preset")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write preset file: {}", path))?;

        Ok(())
    }

    /// Validate preset consistency
    ///
    /// Mappings may reference controls that are not declared here; they are
    /// reported as dangling at dispatch time, not rejected.
    pub fn validate(&self) -> Result<()> {
        let mut declared = HashSet::new();

        for (idx, control) in self.controls.iter().enumerate() {
            if control.group.is_empty() || control.item.is_empty() {
                anyhow::bail!("Control {} must have a non-empty group and item", idx);
            }
            if !declared.insert(control.id()) {
                anyhow::bail!("Control '{}' is declared more than once", control.id());
            }
            if control.kind == ControlKind::Pot && !(control.min.is_finite() && control.max.is_finite()) {
                anyhow::bail!("Potmeter '{}' range must be finite", control.id());
            }
        }

        for (idx, mapping) in self.mappings.iter().enumerate() {
            validate_mapping(mapping).with_context(|| format!("Invalid mapping {}", idx))?;
        }

        for binding in &self.keyboard {
            if binding.key.is_empty() {
                anyhow::bail!("Keyboard binding for '{},{}' has an empty key", binding.group, binding.item);
            }
        }

        Ok(())
    }

    /// Ordered mapping entries, duplicates preserved
    pub fn mapping_entries(&self) -> Vec<MappingEntry> {
        self.mappings
            .iter()
            .map(|m| {
                let options: MappingOptions = m.options.iter().copied().collect();
                MappingEntry::new(m.key(), options, m.target())
            })
            .collect()
    }

    pub fn midi_preset(&self) -> MidiPreset {
        MidiPreset {
            name: self.name.clone(),
            entries: self.mapping_entries(),
            switch_policy: self.switch_policy,
        }
    }

    pub fn keyboard_preset(&self) -> KeyboardPreset {
        KeyboardPreset {
            name: self.name.clone(),
            bindings: self
                .keyboard
                .iter()
                .map(|k| KeyBinding {
                    key: k.key.clone(),
                    target: ControlId::new(&k.group, &k.item),
                })
                .collect(),
        }
    }

    /// Register declared controls on `bank`.
    ///
    /// A control already registered with the same kind, mode and range keeps
    /// its value; anything else is (re)created. Returns how many controls
    /// were created.
    pub fn install_controls(&self, bank: &ControlBank) -> usize {
        let mut created = 0;

        for control in &self.controls {
            let id = control.id();
            let unchanged = match (bank.resolve(&id), control.kind) {
                (Some(TargetHandle::Button(b)), ControlKind::Button) => b.behavior_mode() == control.mode,
                (Some(TargetHandle::Pot(p)), ControlKind::Pot) => p.range() == (control.min, control.max),
                _ => false,
            };
            if unchanged {
                continue;
            }

            debug!("Installing control {} ({:?})", id, control.kind);
            match control.kind {
                ControlKind::Button => {
                    bank.add_push_button(id, control.mode);
                }
                ControlKind::Pot => {
                    bank.add_potmeter(id, control.min, control.max);
                }
            }
            created += 1;
        }

        created
    }
}

fn validate_mapping(mapping: &MappingConfig) -> Result<()> {
    if mapping.status < 0x80 {
        anyhow::bail!("Status byte 0x{:02X} is not a status byte", mapping.status);
    }
    if mapping.status >= 0xF0 {
        anyhow::bail!("System message 0x{:02X} cannot be mapped", mapping.status);
    }
    if mapping.data1 > 0x7F {
        anyhow::bail!("Data byte 0x{:02X} is out of range (must be 0-127)", mapping.data1);
    }
    if mapping.group.is_empty() || mapping.item.is_empty() {
        anyhow::bail!("Mapping {} must name a group and item", mapping.key());
    }
    Ok(())
}

// Default value functions
fn default_preset_name() -> String { "Untitled".to_string() }
fn default_min() -> f64 { 0.0 }
fn default_max() -> f64 { 1.0 }
