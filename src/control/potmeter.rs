//! Scaled potentiometer control and 7-bit value scaling

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::trace;

use super::{ControlChange, ControlId, ControlValue, PotTarget};

const MIDI_CENTER: f64 = 64.0;
const MIDI_MAX: f64 = 127.0;

/// Map a 7-bit value onto `[0, 1]` with 64 as the exact center.
///
/// The lower half spans 0..=64 and the upper half 64..=127, so a centered
/// knob lands on 0.5 instead of 64/127.
pub fn midi_to_parameter(value: u8) -> f64 {
    let value = f64::from(value.min(127));
    if value > MIDI_CENTER {
        0.5 + (value - MIDI_CENTER) / (MIDI_MAX - MIDI_CENTER) / 2.0
    } else {
        value / MIDI_CENTER / 2.0
    }
}

/// Scale a 7-bit value into `[min, max]`. 0, 64 and 127 land exactly on
/// `min`, the midpoint and `max`.
pub fn scale_midi_value(value: u8, (min, max): (f64, f64)) -> f64 {
    let p = midi_to_parameter(value);
    min * (1.0 - p) + max * p
}

pub struct Potmeter {
    id: ControlId,
    min: f64,
    max: f64,
    bits: AtomicU64,
    changes: Option<broadcast::Sender<ControlChange>>,
}

impl Potmeter {
    /// New potmeter resting at `min`
    pub fn new(id: ControlId, min: f64, max: f64) -> Self {
        Self {
            id,
            min,
            max,
            bits: AtomicU64::new(min.to_bits()),
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
}

impl PotTarget for Potmeter {
    fn set_scaled(&self, value: f64) {
        let previous = f64::from_bits(self.bits.swap(value.to_bits(), Ordering::AcqRel));
        if previous.to_bits() == value.to_bits() {
            return;
        }
        trace!("{} -> {}", self.id, value);
        if let Some(tx) = &self.changes {
            let _ = tx.send(ControlChange {
                control: self.id.clone(),
                value: ControlValue::Float(value),
            });
        }
    }

    fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}
