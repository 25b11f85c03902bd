//! Option resolution: wire event + mapping flags -> button action

use serde::{Deserialize, Serialize};

use crate::control::{scale_midi_value, ButtonMode, ButtonTarget, PotTarget, TargetHandle};
use crate::mapping::MappingOptions;
use crate::midi::{MessageKind, MidiEvent};

/// Values at or above this count as "on" / pressed
pub const PRESS_THRESHOLD: u8 = 1;

/// What a wire event means for a boolean control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    Press,
    Release,
    /// Level write from a switch mapping
    Set(bool),
}

/// How a `switch` mapping drives a toggle-mode control
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchPolicy {
    /// The switch level is written directly, so the control tracks the switch
    #[default]
    Level,
    /// Every switch event flips the control, on both halves of a switch
    /// transition. Matches older presets; the control can drift out of sync
    /// with the hardware.
    ToggleCompat,
}

impl SwitchPolicy {
    pub(crate) fn to_u8(self) -> u8 {
        match self {
            SwitchPolicy::Level => 0,
            SwitchPolicy::ToggleCompat => 1,
        }
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => SwitchPolicy::ToggleCompat,
            _ => SwitchPolicy::Level,
        }
    }
}

/// Press-shaped: a note-on or any other message whose value byte is at or
/// above the threshold. Note-off is always a release, whatever its velocity.
pub fn is_press(event: &MidiEvent) -> bool {
    match event.kind() {
        Some(MessageKind::NoteOff) => false,
        _ => event.data2 >= PRESS_THRESHOLD,
    }
}

/// Resolve the effective action for a button mapping.
///
/// `switch` takes precedence and follows the level regardless of note-on or
/// note-off framing. `button` and the no-flag case share the press-shape rule.
pub fn resolve_action(event: &MidiEvent, options: MappingOptions) -> ButtonAction {
    if options.switch {
        return ButtonAction::Set(event.data2 >= PRESS_THRESHOLD);
    }

    if is_press(event) {
        ButtonAction::Press
    } else {
        ButtonAction::Release
    }
}

/// Apply `action` to a boolean control according to its behavior mode
pub fn apply_button_action(button: &dyn ButtonTarget, action: ButtonAction, policy: SwitchPolicy) {
    match (button.behavior_mode(), action) {
        (ButtonMode::Momentary, ButtonAction::Press) => button.press(),
        (ButtonMode::Momentary, ButtonAction::Release) => button.release(),
        (ButtonMode::Momentary, ButtonAction::Set(on)) => button.set_direct(on),
        (ButtonMode::Toggle, ButtonAction::Press) => button.toggle(),
        (ButtonMode::Toggle, ButtonAction::Release) => {}
        (ButtonMode::Toggle, ButtonAction::Set(on)) => match policy {
            SwitchPolicy::Level => button.set_direct(on),
            SwitchPolicy::ToggleCompat => button.toggle(),
        },
    }
}

/// Apply one wire event to one resolved control. Option flags only affect
/// boolean controls; potmeters always take the linear 7-bit scale.
pub fn apply_to_target(
    target: &TargetHandle,
    event: &MidiEvent,
    options: MappingOptions,
    policy: SwitchPolicy,
) {
    match target {
        TargetHandle::Pot(pot) => pot.set_scaled(scale_midi_value(event.data2, pot.range())),
        TargetHandle::Button(button) => {
            apply_button_action(button.as_ref(), resolve_action(event, options), policy)
        }
    }
}
