//! Dispatch engine - applies decoded MIDI events to mapped controls
//!
//! For each event the dispatcher:
//! - takes a snapshot of the current mapping table
//! - walks every entry bound to the event's wire key, in load order
//! - resolves the entry's control and applies the event to it
//!
//! Dispatch is synchronous and never blocks, so it can run directly on the
//! MIDI input callback thread. Unmapped keys are a silent no-op; dangling
//! controls are reported to the diagnostics sink and skipped.

mod action;

#[cfg(test)]
mod tests;

pub use action::{
    apply_button_action, apply_to_target, is_press, resolve_action, ButtonAction, SwitchPolicy,
    PRESS_THRESHOLD,
};

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::control::ControlRegistry;
use crate::diagnostics::{DiagnosticsSink, TracingDiagnostics};
use crate::error::{EngineError, Result};
use crate::mapping::MappingStore;
use crate::midi::MidiEvent;

/// Per-event dispatch summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Entries bound to the event's wire key
    pub matched: usize,
    /// Entries whose control resolved and was driven
    pub applied: usize,
    /// Entries whose control is no longer registered
    pub dangling: usize,
}

impl DispatchOutcome {
    pub fn is_unmapped(&self) -> bool {
        self.matched == 0
    }
}

pub struct Dispatcher {
    mappings: Arc<MappingStore>,
    registry: Arc<dyn ControlRegistry>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    switch_policy: AtomicU8,
}

impl Dispatcher {
    pub fn new(mappings: Arc<MappingStore>, registry: Arc<dyn ControlRegistry>) -> Self {
        Self {
            mappings,
            registry,
            diagnostics: Arc::new(TracingDiagnostics),
            switch_policy: AtomicU8::new(SwitchPolicy::default().to_u8()),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_switch_policy(self, policy: SwitchPolicy) -> Self {
        self.set_switch_policy(policy);
        self
    }

    pub fn set_switch_policy(&self, policy: SwitchPolicy) {
        self.switch_policy.store(policy.to_u8(), Ordering::Release);
    }

    pub fn switch_policy(&self) -> SwitchPolicy {
        SwitchPolicy::from_u8(self.switch_policy.load(Ordering::Acquire))
    }

    pub fn mappings(&self) -> &Arc<MappingStore> {
        &self.mappings
    }

    pub fn registry(&self) -> &Arc<dyn ControlRegistry> {
        &self.registry
    }

    /// Decode raw bytes and dispatch them. A malformed buffer is reported,
    /// returned as an error and touches no control.
    pub fn receive(&self, bytes: &[u8]) -> Result<DispatchOutcome> {
        match MidiEvent::decode(bytes) {
            Ok(event) => Ok(self.dispatch(&event)),
            Err(e) => {
                self.diagnostics.report(&e);
                Err(e)
            }
        }
    }

    /// Apply `event` to every control mapped to its wire key
    pub fn dispatch(&self, event: &MidiEvent) -> DispatchOutcome {
        let key = event.key();
        let table = self.mappings.snapshot();
        let policy = self.switch_policy();
        let mut outcome = DispatchOutcome::default();

        trace!("Dispatching {}", event);

        for entry in table.lookup(&key) {
            outcome.matched += 1;

            let Some(target) = self.registry.resolve(&entry.target) else {
                outcome.dangling += 1;
                self.diagnostics.report(&EngineError::DanglingTarget {
                    key,
                    control: entry.target.clone(),
                });
                continue;
            };

            debug!("{} {} -> {} ({:?})", key, event.data2, entry.target, entry.options);
            apply_to_target(&target, event, entry.options, policy);
            outcome.applied += 1;
        }

        outcome
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("mappings", &self.mappings)
            .field("switch_policy", &self.switch_policy())
            .finish()
    }
}
