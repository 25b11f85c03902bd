//! Boolean push/toggle control

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tracing::trace;

use super::{ButtonMode, ButtonTarget, ControlChange, ControlId, ControlValue};

pub struct PushButton {
    id: ControlId,
    value: AtomicBool,
    mode: RwLock<ButtonMode>,
    changes: Option<broadcast::Sender<ControlChange>>,
}

impl PushButton {
    pub fn new(id: ControlId, mode: ButtonMode) -> Self {
        Self {
            id,
            value: AtomicBool::new(false),
            mode: RwLock::new(mode),
            changes: None,
        }
    }

    pub(crate) fn with_notifier(mut self, changes: broadcast::Sender<ControlChange>) -> Self {
        self.changes = Some(changes);
        self
    }

    pub fn id(&self) -> &ControlId {
        &self.id
    }

    pub fn set_mode(&self, mode: ButtonMode) {
        *self.mode.write() = mode;
    }

    fn notify(&self, previous: bool, current: bool) {
        if previous == current {
            return;
        }
        trace!("{} -> {}", self.id, current);
        if let Some(tx) = &self.changes {
            // No subscribers is fine
            let _ = tx.send(ControlChange {
                control: self.id.clone(),
                value: ControlValue::Bool(current),
            });
        }
    }
}

impl ButtonTarget for PushButton {
    fn press(&self) {
        self.set_direct(true);
    }

    fn release(&self) {
        self.set_direct(false);
    }

    fn toggle(&self) {
        let previous = self.value.fetch_xor(true, Ordering::AcqRel);
        self.notify(previous, !previous);
    }

    fn set_direct(&self, on: bool) {
        let previous = self.value.swap(on, Ordering::AcqRel);
        self.notify(previous, on);
    }

    fn get(&self) -> bool {
        self.value.load(Ordering::Acquire)
    }

    fn behavior_mode(&self) -> ButtonMode {
        *self.mode.read()
    }
}
