//! Controller kinds and their presets
//!
//! Each kind carries only what its input protocol needs. Applying a preset
//! is a `match` over (controller, preset); a preset of the wrong kind is
//! refused.

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::control::{ControlId, ControlRegistry};
use crate::diagnostics::{DiagnosticsSink, TracingDiagnostics};
use crate::dispatch::{apply_to_target, DispatchOutcome, Dispatcher, SwitchPolicy};
use crate::error::{EngineError, Result};
use crate::mapping::{MappingEntry, MappingOptions};
use crate::midi::{MidiEvent, NOTE_OFF, NOTE_ON};

/// Mapping set for a MIDI device
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MidiPreset {
    pub name: String,
    pub entries: Vec<MappingEntry>,
    pub switch_policy: SwitchPolicy,
}

/// Binds a key name (as reported by the windowing layer) to a control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    pub key: String,
    pub target: ControlId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyboardPreset {
    pub name: String,
    pub bindings: Vec<KeyBinding>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControllerPreset {
    Midi(MidiPreset),
    Keyboard(KeyboardPreset),
}

impl ControllerPreset {
    pub fn name(&self) -> &str {
        match self {
            ControllerPreset::Midi(p) => &p.name,
            ControllerPreset::Keyboard(p) => &p.name,
        }
    }
}

pub enum Controller {
    Midi(MidiController),
    Keyboard(KeyboardController),
}

impl Controller {
    pub fn name(&self) -> &str {
        match self {
            Controller::Midi(c) => &c.name,
            Controller::Keyboard(c) => &c.name,
        }
    }

    /// Load `preset` if it matches this controller's kind
    pub fn apply_preset(&self, preset: &ControllerPreset) -> bool {
        match (self, preset) {
            (Controller::Midi(c), ControllerPreset::Midi(p)) => {
                c.apply_preset(p);
                true
            }
            (Controller::Keyboard(c), ControllerPreset::Keyboard(p)) => {
                c.apply_preset(p);
                true
            }
            _ => {
                warn!(
                    "Preset '{}' does not fit controller '{}', ignoring",
                    preset.name(),
                    self.name()
                );
                false
            }
        }
    }

    /// True once a non-empty preset is loaded
    pub fn is_mappable(&self) -> bool {
        match self {
            Controller::Midi(c) => !c.dispatcher.mappings().snapshot().is_empty(),
            Controller::Keyboard(c) => !c.bindings.load().is_empty(),
        }
    }

    pub fn as_midi(&self) -> Option<&MidiController> {
        match self {
            Controller::Midi(c) => Some(c),
            Controller::Keyboard(_) => None,
        }
    }

    pub fn as_keyboard(&self) -> Option<&KeyboardController> {
        match self {
            Controller::Keyboard(c) => Some(c),
            Controller::Midi(_) => None,
        }
    }
}

pub struct MidiController {
    name: String,
    dispatcher: Dispatcher,
}

impl MidiController {
    pub fn new(name: impl Into<String>, dispatcher: Dispatcher) -> Self {
        Self {
            name: name.into(),
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn receive(&self, bytes: &[u8]) -> Result<DispatchOutcome> {
        self.dispatcher.receive(bytes)
    }

    fn apply_preset(&self, preset: &MidiPreset) {
        info!(
            "Loading MIDI preset '{}' on '{}' ({} mappings, switch policy {:?})",
            preset.name,
            self.name,
            preset.entries.len(),
            preset.switch_policy
        );
        self.dispatcher.set_switch_policy(preset.switch_policy);
        self.dispatcher.mappings().load(preset.entries.iter().cloned());
    }
}

/// Input-only controller fed by key press/release events.
///
/// A key press behaves like (NOTE_ON, 0x7F) and a release like
/// (NOTE_OFF, 0x00) on an unflagged mapping: momentary controls follow the
/// key, toggle controls flip on press, potmeters jump to max then min.
pub struct KeyboardController {
    name: String,
    bindings: ArcSwap<HashMap<String, Vec<ControlId>>>,
    registry: Arc<dyn ControlRegistry>,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl KeyboardController {
    pub fn new(name: impl Into<String>, registry: Arc<dyn ControlRegistry>) -> Self {
        Self {
            name: name.into(),
            bindings: ArcSwap::from_pointee(HashMap::new()),
            registry,
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    fn apply_preset(&self, preset: &KeyboardPreset) {
        let mut bindings: HashMap<String, Vec<ControlId>> = HashMap::new();
        for binding in &preset.bindings {
            bindings
                .entry(binding.key.to_lowercase())
                .or_default()
                .push(binding.target.clone());
        }
        info!(
            "Loading keyboard preset '{}' on '{}' ({} keys)",
            preset.name,
            self.name,
            bindings.len()
        );
        self.bindings.store(Arc::new(bindings));
    }

    /// Apply a key press or release. Key names match case-insensitively.
    pub fn key_event(&self, key: &str, pressed: bool) -> DispatchOutcome {
        let bindings = self.bindings.load();
        let mut outcome = DispatchOutcome::default();
        let Some(targets) = bindings.get(&key.to_lowercase()) else {
            return outcome;
        };

        let event = if pressed {
            MidiEvent::new(NOTE_ON, 0, 0x7F)
        } else {
            MidiEvent::new(NOTE_OFF, 0, 0x00)
        };

        for target in targets {
            outcome.matched += 1;
            match self.registry.resolve(target) {
                Some(handle) => {
                    debug!("key '{}' {} -> {}", key, if pressed { "down" } else { "up" }, target);
                    apply_to_target(&handle, &event, MappingOptions::NONE, SwitchPolicy::Level);
                    outcome.applied += 1;
                }
                None => {
                    outcome.dangling += 1;
                    self.diagnostics.report(&EngineError::DanglingTarget {
                        key: event.key(),
                        control: target.clone(),
                    });
                }
            }
        }

        outcome
    }
}
