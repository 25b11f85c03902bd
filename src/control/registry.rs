//! In-memory control registry with change notifications
//!
//! Uses DashMap so the MIDI callback thread can resolve controls while the
//! host adds or removes them. Value changes are published on a broadcast
//! channel instead of UI signals.

use dashmap::DashMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use super::{
    ButtonMode, ControlId, ControlRegistry, Potmeter, PushButton, TargetHandle,
};

const CHANGE_CHANNEL_CAPACITY: usize = 1024;

/// Current value of a control
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ControlValue {
    Bool(bool),
    Float(f64),
}

impl fmt::Display for ControlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlValue::Bool(on) => write!(f, "{}", if *on { "on" } else { "off" }),
            ControlValue::Float(v) => write!(f, "{:.4}", v),
        }
    }
}

/// Published whenever a bank-owned control changes value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlChange {
    pub control: ControlId,
    pub value: ControlValue,
}

pub struct ControlBank {
    controls: DashMap<ControlId, TargetHandle>,
    changes: broadcast::Sender<ControlChange>,
}

impl ControlBank {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            controls: DashMap::new(),
            changes,
        }
    }

    /// Register a push button, replacing any control with the same id
    pub fn add_push_button(&self, id: ControlId, mode: ButtonMode) -> Arc<PushButton> {
        let button = Arc::new(PushButton::new(id.clone(), mode).with_notifier(self.changes.clone()));
        debug!("Registered {} button {}", mode, id);
        self.controls.insert(id, TargetHandle::Button(button.clone()));
        button
    }

    /// Register a potmeter, replacing any control with the same id
    pub fn add_potmeter(&self, id: ControlId, min: f64, max: f64) -> Arc<Potmeter> {
        let pot = Arc::new(Potmeter::new(id.clone(), min, max).with_notifier(self.changes.clone()));
        debug!("Registered potmeter {} [{}, {}]", id, min, max);
        self.controls.insert(id, TargetHandle::Pot(pot.clone()));
        pot
    }

    /// Register a control implemented elsewhere. Its changes are not broadcast.
    pub fn insert(&self, id: ControlId, handle: TargetHandle) {
        self.controls.insert(id, handle);
    }

    pub fn remove(&self, id: &ControlId) -> Option<TargetHandle> {
        self.controls.remove(id).map(|(_, handle)| handle)
    }

    pub fn contains(&self, id: &ControlId) -> bool {
        self.controls.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControlChange> {
        self.changes.subscribe()
    }

    pub fn value(&self, id: &ControlId) -> Option<ControlValue> {
        self.controls.get(id).map(|entry| entry.value().value())
    }

    /// All control values, sorted by id
    pub fn values(&self) -> Vec<(ControlId, ControlValue)> {
        let mut values: Vec<_> = self
            .controls
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().value()))
            .collect();
        values.sort_by(|a, b| a.0.cmp(&b.0));
        values
    }
}

impl Default for ControlBank {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlRegistry for ControlBank {
    fn resolve(&self, id: &ControlId) -> Option<TargetHandle> {
        self.controls.get(id).map(|entry| entry.value().clone())
    }
}
