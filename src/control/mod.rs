//! Target controls driven by the dispatch engine
//!
//! The engine only sees two capabilities: [`ButtonTarget`] (push/toggle
//! boolean) and [`PotTarget`] (scaled value). Whoever owns the controls
//! implements these traits and a [`ControlRegistry`] that resolves a
//! [`ControlId`] to a live handle.

mod potmeter;
mod push_button;
mod registry;

pub use potmeter::{midi_to_parameter, scale_midi_value, Potmeter};
pub use push_button::PushButton;
pub use registry::{ControlBank, ControlChange, ControlValue};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Opaque control address, e.g. `[Channel1],hotcue_1_activate`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ControlId {
    pub group: String,
    pub item: String,
}

impl ControlId {
    pub fn new(group: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            item: item.into(),
        }
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.group, self.item)
    }
}

/// How a boolean control reacts to presses. Owned by the control's own
/// configuration, never by a mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonMode {
    /// True only while held
    #[default]
    Momentary,
    /// Flips on each press, ignores release
    Toggle,
}

impl fmt::Display for ButtonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ButtonMode::Momentary => write!(f, "momentary"),
            ButtonMode::Toggle => write!(f, "toggle"),
        }
    }
}

/// Boolean control. Each call must be atomic with respect to `get`.
pub trait ButtonTarget: Send + Sync {
    fn press(&self);
    fn release(&self);
    fn toggle(&self);
    fn set_direct(&self, on: bool);
    fn get(&self) -> bool;
    fn behavior_mode(&self) -> ButtonMode;
}

/// Scaled control with a fixed `[min, max]` range
pub trait PotTarget: Send + Sync {
    fn set_scaled(&self, value: f64);
    fn get(&self) -> f64;
    fn range(&self) -> (f64, f64);
}

/// A resolved control
#[derive(Clone)]
pub enum TargetHandle {
    Button(Arc<dyn ButtonTarget>),
    Pot(Arc<dyn PotTarget>),
}

impl TargetHandle {
    pub fn value(&self) -> ControlValue {
        match self {
            TargetHandle::Button(button) => ControlValue::Bool(button.get()),
            TargetHandle::Pot(pot) => ControlValue::Float(pot.get()),
        }
    }
}

impl fmt::Debug for TargetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetHandle::Button(button) => f
                .debug_struct("Button")
                .field("mode", &button.behavior_mode())
                .field("value", &button.get())
                .finish(),
            TargetHandle::Pot(pot) => f
                .debug_struct("Pot")
                .field("range", &pot.range())
                .field("value", &pot.get())
                .finish(),
        }
    }
}

/// Lookup from control address to live control
pub trait ControlRegistry: Send + Sync {
    fn resolve(&self, id: &ControlId) -> Option<TargetHandle>;
}
