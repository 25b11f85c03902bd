//! ctrlmap - MIDI controller mapping engine
//!
//! Decodes raw MIDI from a hardware controller, looks up the preset entries
//! bound to each message and drives the mapped application controls
//! (push buttons and potmeters). Presets can be swapped at run time without
//! stopping input.

pub mod config;
pub mod control;
pub mod controller;
pub mod diagnostics;
pub mod dispatch;
pub mod error;
pub mod mapping;
pub mod midi;

pub use control::{ButtonMode, ControlBank, ControlId, ControlRegistry, ControlValue};
pub use controller::{Controller, ControllerPreset, KeyboardController, MidiController};
pub use diagnostics::{CollectingDiagnostics, DiagnosticsSink, TracingDiagnostics};
pub use dispatch::{DispatchOutcome, Dispatcher, SwitchPolicy};
pub use error::{EngineError, MalformedReason};
pub use mapping::{MappingEntry, MappingOptions, MappingStore, MappingTable, WireKey};
pub use midi::MidiEvent;
