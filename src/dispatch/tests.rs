//! Scenario tests for the dispatch engine

use super::*;
use crate::control::{ButtonMode, ButtonTarget, ControlBank, ControlId, PotTarget};
use crate::diagnostics::CollectingDiagnostics;
use crate::mapping::{MappingEntry, MappingOptions, WireKey};
use crate::midi::{CONTROL_CHANGE, NOTE_OFF, NOTE_ON};

const CHANNEL: u8 = 0x01;
const CONTROL: u8 = 0x10;

struct Fixture {
    bank: Arc<ControlBank>,
    diagnostics: Arc<CollectingDiagnostics>,
    dispatcher: Dispatcher,
    entries: Vec<MappingEntry>,
}

impl Fixture {
    fn new() -> Self {
        let bank = Arc::new(ControlBank::new());
        let diagnostics = Arc::new(CollectingDiagnostics::new());
        let dispatcher = Dispatcher::new(Arc::new(MappingStore::new()), bank.clone())
            .with_diagnostics(diagnostics.clone());
        Self {
            bank,
            diagnostics,
            dispatcher,
            entries: Vec::new(),
        }
    }

    fn add_mapping(&mut self, status: u8, options: MappingOptions, target: &ControlId) {
        self.entries.push(MappingEntry::new(
            WireKey::new(status, CONTROL),
            options,
            target.clone(),
        ));
    }

    fn load_preset(&self) {
        self.dispatcher.mappings().load(self.entries.clone());
    }

    fn receive(&self, status: u8, value: u8) -> DispatchOutcome {
        self.dispatcher.receive(&[status, CONTROL, value]).unwrap()
    }
}

fn hotcue() -> ControlId {
    ControlId::new("[Channel1]", "hotcue_1_activate")
}

fn keylock() -> ControlId {
    ControlId::new("[Channel1]", "keylock")
}

// Push-button controls (momentary)

#[test]
fn test_push_button_note_on_note_off() {
    // Most controllers send (NOTE_ON, 0x7F) for press and (NOTE_OFF, 0x00) for release
    let mut fx = Fixture::new();
    let cpb = fx.bank.add_push_button(hotcue(), ButtonMode::Momentary);
    fx.add_mapping(NOTE_ON | CHANNEL, MappingOptions::NONE, &hotcue());
    fx.add_mapping(NOTE_OFF | CHANNEL, MappingOptions::NONE, &hotcue());
    fx.load_preset();

    for _ in 0..2 {
        fx.receive(NOTE_ON | CHANNEL, 0x7F);
        assert!(cpb.get());
        fx.receive(NOTE_OFF | CHANNEL, 0x00);
        assert!(!cpb.get());
    }
}

#[test]
fn test_push_button_note_on_note_on() {
    // Some controllers release with (NOTE_ON, 0x00)
    let mut fx = Fixture::new();
    let cpb = fx.bank.add_push_button(hotcue(), ButtonMode::Momentary);
    fx.add_mapping(NOTE_ON | CHANNEL, MappingOptions::NONE, &hotcue());
    fx.load_preset();

    for _ in 0..2 {
        fx.receive(NOTE_ON | CHANNEL, 0x7F);
        assert!(cpb.get());
        fx.receive(NOTE_ON | CHANNEL, 0x00);
        assert!(!cpb.get());
    }
}

#[test]
fn test_push_button_cc() {
    // Korg nanoKONTROL style: (CC, 0x7F) press, (CC, 0x00) release
    let mut fx = Fixture::new();
    let cpb = fx.bank.add_push_button(hotcue(), ButtonMode::Momentary);
    fx.add_mapping(CONTROL_CHANGE | CHANNEL, MappingOptions::NONE, &hotcue());
    fx.load_preset();

    for _ in 0..2 {
        fx.receive(CONTROL_CHANGE | CHANNEL, 0x7F);
        assert!(cpb.get());
        fx.receive(CONTROL_CHANGE | CHANNEL, 0x00);
        assert!(!cpb.get());
    }
}

#[test]
fn test_push_button_with_button_option_releases() {
    // A toggle-style hardware button used as a momentary push button
    let mut fx = Fixture::new();
    let cpb = fx.bank.add_push_button(hotcue(), ButtonMode::Momentary);
    fx.add_mapping(NOTE_ON | CHANNEL, MappingOptions::button(), &hotcue());
    fx.add_mapping(NOTE_OFF | CHANNEL, MappingOptions::button(), &hotcue());
    fx.load_preset();

    fx.receive(NOTE_ON | CHANNEL, 0x7F);
    assert!(cpb.get());

    // Release always reaches the momentary control
    fx.receive(NOTE_OFF | CHANNEL, 0x00);
    assert!(!cpb.get());

    fx.receive(NOTE_ON | CHANNEL, 0x7F);
    fx.receive(NOTE_ON | CHANNEL, 0x00);
    assert!(!cpb.get());
}

#[test]
fn test_push_button_with_switch_option_follows_level() {
    let mut fx = Fixture::new();
    let cpb = fx.bank.add_push_button(hotcue(), ButtonMode::Momentary);
    fx.add_mapping(NOTE_ON | CHANNEL, MappingOptions::switch(), &hotcue());
    fx.add_mapping(NOTE_OFF | CHANNEL, MappingOptions::switch(), &hotcue());
    fx.load_preset();

    fx.receive(NOTE_ON | CHANNEL, 0x7F);
    assert!(cpb.get());
    fx.receive(NOTE_OFF | CHANNEL, 0x00);
    assert!(!cpb.get());
}

#[test]
fn test_push_button_switch_option_same_under_compat_policy() {
    // The compat policy only changes toggle-mode controls
    let mut fx = Fixture::new();
    fx.dispatcher.set_switch_policy(SwitchPolicy::ToggleCompat);
    let cpb = fx.bank.add_push_button(hotcue(), ButtonMode::Momentary);
    fx.add_mapping(NOTE_ON | CHANNEL, MappingOptions::switch(), &hotcue());
    fx.add_mapping(NOTE_OFF | CHANNEL, MappingOptions::switch(), &hotcue());
    fx.load_preset();

    fx.receive(NOTE_ON | CHANNEL, 0x7F);
    assert!(cpb.get());
    fx.receive(NOTE_OFF | CHANNEL, 0x00);
    assert!(!cpb.get());
}

// Toggle controls

#[test]
fn test_toggle_note_on_note_off() {
    let mut fx = Fixture::new();
    let cpb = fx.bank.add_push_button(keylock(), ButtonMode::Toggle);
    fx.add_mapping(NOTE_ON | CHANNEL, MappingOptions::NONE, &keylock());
    fx.add_mapping(NOTE_OFF | CHANNEL, MappingOptions::NONE, &keylock());
    fx.load_preset();

    // One press/release pair is one toggle
    fx.receive(NOTE_ON | CHANNEL, 0x7F);
    fx.receive(NOTE_OFF | CHANNEL, 0x00);
    assert!(cpb.get());

    fx.receive(NOTE_ON | CHANNEL, 0x7F);
    fx.receive(NOTE_OFF | CHANNEL, 0x00);
    assert!(!cpb.get());
}

#[test]
fn test_toggle_note_on_note_on() {
    let mut fx = Fixture::new();
    let cpb = fx.bank.add_push_button(keylock(), ButtonMode::Toggle);
    fx.add_mapping(NOTE_ON | CHANNEL, MappingOptions::NONE, &keylock());
    fx.load_preset();

    fx.receive(NOTE_ON | CHANNEL, 0x7F);
    fx.receive(NOTE_ON | CHANNEL, 0x00);
    assert!(cpb.get());

    fx.receive(NOTE_ON | CHANNEL, 0x7F);
    fx.receive(NOTE_ON | CHANNEL, 0x00);
    assert!(!cpb.get());
}

#[test]
fn test_toggle_cc() {
    let mut fx = Fixture::new();
    let cpb = fx.bank.add_push_button(keylock(), ButtonMode::Toggle);
    fx.add_mapping(CONTROL_CHANGE | CHANNEL, MappingOptions::NONE, &keylock());
    fx.load_preset();

    fx.receive(CONTROL_CHANGE | CHANNEL, 0x7F);
    fx.receive(CONTROL_CHANGE | CHANNEL, 0x00);
    assert!(cpb.get());

    fx.receive(CONTROL_CHANGE | CHANNEL, 0x7F);
    fx.receive(CONTROL_CHANGE | CHANNEL, 0x00);
    assert!(!cpb.get());
}

#[test]
fn test_toggle_with_button_option_ignores_release() {
    let mut fx = Fixture::new();
    let cpb = fx.bank.add_push_button(keylock(), ButtonMode::Toggle);
    fx.add_mapping(NOTE_ON | CHANNEL, MappingOptions::button(), &keylock());
    fx.add_mapping(NOTE_OFF | CHANNEL, MappingOptions::button(), &keylock());
    fx.load_preset();

    fx.receive(NOTE_ON | CHANNEL, 0x7F);
    assert!(cpb.get());

    // Release does nothing to a toggle control
    fx.receive(NOTE_OFF | CHANNEL, 0x00);
    assert!(cpb.get());
}

#[test]
fn test_toggle_with_switch_option_tracks_switch() {
    let mut fx = Fixture::new();
    let cpb = fx.bank.add_push_button(keylock(), ButtonMode::Toggle);
    fx.add_mapping(NOTE_ON | CHANNEL, MappingOptions::switch(), &keylock());
    fx.add_mapping(NOTE_OFF | CHANNEL, MappingOptions::switch(), &keylock());
    fx.load_preset();

    fx.receive(NOTE_ON | CHANNEL, 0x7F);
    assert!(cpb.get());
    fx.receive(NOTE_OFF | CHANNEL, 0x00);
    assert!(!cpb.get());

    // Something else turns the control on
    cpb.set_direct(true);

    // The switch still wins: on stays on, off turns it off
    fx.receive(NOTE_ON | CHANNEL, 0x7F);
    assert!(cpb.get());
    fx.receive(NOTE_OFF | CHANNEL, 0x00);
    assert!(!cpb.get());
}

#[test]
fn test_toggle_with_switch_option_compat_policy_flips() {
    let mut fx = Fixture::new();
    fx.dispatcher.set_switch_policy(SwitchPolicy::ToggleCompat);
    let cpb = fx.bank.add_push_button(keylock(), ButtonMode::Toggle);
    fx.add_mapping(NOTE_ON | CHANNEL, MappingOptions::switch(), &keylock());
    fx.add_mapping(NOTE_OFF | CHANNEL, MappingOptions::switch(), &keylock());
    fx.load_preset();

    fx.receive(NOTE_ON | CHANNEL, 0x7F);
    assert!(cpb.get());
    fx.receive(NOTE_OFF | CHANNEL, 0x00);
    assert!(!cpb.get());

    // Once out of sync, each switch half inverts the control
    cpb.set_direct(true);

    fx.receive(NOTE_ON | CHANNEL, 0x7F);
    assert!(!cpb.get());
    fx.receive(NOTE_OFF | CHANNEL, 0x00);
    assert!(cpb.get());
}

#[test]
fn test_mode_change_applies_to_next_event() {
    let mut fx = Fixture::new();
    let cpb = fx.bank.add_push_button(keylock(), ButtonMode::Momentary);
    fx.add_mapping(NOTE_ON | CHANNEL, MappingOptions::NONE, &keylock());
    fx.load_preset();

    fx.receive(NOTE_ON | CHANNEL, 0x7F);
    fx.receive(NOTE_ON | CHANNEL, 0x00);
    assert!(!cpb.get());

    cpb.set_mode(ButtonMode::Toggle);
    fx.receive(NOTE_ON | CHANNEL, 0x7F);
    fx.receive(NOTE_ON | CHANNEL, 0x00);
    assert!(cpb.get());
}

// Potmeters

#[test]
fn test_potmeter_7bit_cc() {
    const MIN: f64 = -1234.5;
    const MAX: f64 = 678.9;

    let mut fx = Fixture::new();
    let id = ControlId::new("[Channel1]", "playposition");
    let pot = fx.bank.add_potmeter(id.clone(), MIN, MAX);
    fx.add_mapping(CONTROL_CHANGE | CHANNEL, MappingOptions::NONE, &id);
    fx.load_preset();

    fx.receive(CONTROL_CHANGE | CHANNEL, 0x00);
    assert_eq!(pot.get(), MIN);

    fx.receive(CONTROL_CHANGE | CHANNEL, 0x7F);
    assert_eq!(pot.get(), MAX);

    fx.receive(CONTROL_CHANGE | CHANNEL, 0x40);
    assert_eq!(pot.get(), (MIN + MAX) * 0.5);
    assert!((pot.get() - -277.8).abs() < 1e-9);
}

#[test]
fn test_potmeter_ignores_option_flags() {
    let mut fx = Fixture::new();
    let id = ControlId::new("[Master]", "crossfader");
    let pot = fx.bank.add_potmeter(id.clone(), -1.0, 1.0);
    fx.add_mapping(
        NOTE_OFF | CHANNEL,
        MappingOptions {
            button: true,
            switch: true,
        },
        &id,
    );
    fx.load_preset();

    fx.receive(NOTE_OFF | CHANNEL, 0x7F);
    assert_eq!(pot.get(), 1.0);
    fx.receive(NOTE_OFF | CHANNEL, 0x40);
    assert_eq!(pot.get(), 0.0);
}

// Table behavior and failures

#[test]
fn test_one_key_drives_several_controls_in_order() {
    let mut fx = Fixture::new();
    let play = fx.bank.add_push_button(ControlId::new("[Channel1]", "play"), ButtonMode::Toggle);
    let cue = fx.bank.add_push_button(ControlId::new("[Channel1]", "cue_default"), ButtonMode::Momentary);
    fx.add_mapping(NOTE_ON | CHANNEL, MappingOptions::NONE, play.id());
    fx.add_mapping(NOTE_ON | CHANNEL, MappingOptions::NONE, cue.id());
    fx.load_preset();

    let mut changes = fx.bank.subscribe();
    let outcome = fx.receive(NOTE_ON | CHANNEL, 0x7F);
    assert_eq!(
        outcome,
        DispatchOutcome {
            matched: 2,
            applied: 2,
            dangling: 0
        }
    );
    assert!(play.get());
    assert!(cue.get());

    assert_eq!(changes.try_recv().unwrap().control, *play.id());
    assert_eq!(changes.try_recv().unwrap().control, *cue.id());
}

#[test]
fn test_duplicate_entries_apply_independently() {
    // Two identical entries on a toggle control flip it twice
    let mut fx = Fixture::new();
    let cpb = fx.bank.add_push_button(keylock(), ButtonMode::Toggle);
    fx.add_mapping(NOTE_ON | CHANNEL, MappingOptions::NONE, &keylock());
    fx.add_mapping(NOTE_ON | CHANNEL, MappingOptions::NONE, &keylock());
    fx.load_preset();

    let outcome = fx.receive(NOTE_ON | CHANNEL, 0x7F);
    assert_eq!(outcome.applied, 2);
    assert!(!cpb.get());
}

#[test]
fn test_unmapped_key_is_silent() {
    let mut fx = Fixture::new();
    let cpb = fx.bank.add_push_button(hotcue(), ButtonMode::Momentary);
    fx.add_mapping(NOTE_ON | CHANNEL, MappingOptions::NONE, &hotcue());
    fx.load_preset();

    let mut changes = fx.bank.subscribe();
    // Same note on another channel
    let outcome = fx.dispatcher.receive(&[NOTE_ON | 0x02, CONTROL, 0x7F]).unwrap();

    assert!(outcome.is_unmapped());
    assert!(!cpb.get());
    assert!(changes.try_recv().is_err());
    assert!(fx.diagnostics.is_empty());
}

#[test]
fn test_dangling_target_does_not_stop_other_entries() {
    let mut fx = Fixture::new();
    let cpb = fx.bank.add_push_button(hotcue(), ButtonMode::Momentary);
    let gone = ControlId::new("[Sampler9]", "start_play");
    fx.add_mapping(NOTE_ON | CHANNEL, MappingOptions::NONE, &gone);
    fx.add_mapping(NOTE_ON | CHANNEL, MappingOptions::NONE, &hotcue());
    fx.load_preset();

    let outcome = fx.receive(NOTE_ON | CHANNEL, 0x7F);

    assert_eq!(
        outcome,
        DispatchOutcome {
            matched: 2,
            applied: 1,
            dangling: 1
        }
    );
    assert!(cpb.get());
    assert_eq!(
        fx.diagnostics.take(),
        vec![EngineError::DanglingTarget {
            key: WireKey::new(NOTE_ON | CHANNEL, CONTROL),
            control: gone,
        }]
    );
}

#[test]
fn test_removed_control_becomes_dangling() {
    let mut fx = Fixture::new();
    let cpb = fx.bank.add_push_button(hotcue(), ButtonMode::Momentary);
    fx.add_mapping(NOTE_ON | CHANNEL, MappingOptions::NONE, &hotcue());
    fx.load_preset();

    fx.bank.remove(&hotcue());
    let outcome = fx.receive(NOTE_ON | CHANNEL, 0x7F);

    assert_eq!(outcome.dangling, 1);
    assert!(!cpb.get());
    assert_eq!(fx.diagnostics.len(), 1);
}

#[test]
fn test_malformed_message_touches_nothing() {
    let mut fx = Fixture::new();
    let cpb = fx.bank.add_push_button(hotcue(), ButtonMode::Momentary);
    fx.add_mapping(NOTE_ON | CHANNEL, MappingOptions::NONE, &hotcue());
    fx.load_preset();

    let err = fx.dispatcher.receive(&[NOTE_ON | CHANNEL, CONTROL]).unwrap_err();
    assert!(matches!(err, EngineError::MalformedMessage { .. }));
    assert!(!cpb.get());
    assert_eq!(fx.diagnostics.take(), vec![err]);

    // The stream keeps going
    fx.receive(NOTE_ON | CHANNEL, 0x7F);
    assert!(cpb.get());
}

#[test]
fn test_reload_replaces_bindings() {
    let mut fx = Fixture::new();
    let hot = fx.bank.add_push_button(hotcue(), ButtonMode::Momentary);
    let lock = fx.bank.add_push_button(keylock(), ButtonMode::Momentary);
    fx.add_mapping(NOTE_ON | CHANNEL, MappingOptions::NONE, &hotcue());
    fx.load_preset();

    fx.dispatcher.mappings().load(vec![MappingEntry::new(
        WireKey::new(NOTE_ON | CHANNEL, CONTROL),
        MappingOptions::NONE,
        keylock(),
    )]);

    fx.receive(NOTE_ON | CHANNEL, 0x7F);
    assert!(!hot.get());
    assert!(lock.get());
}

#[test]
fn test_concurrent_reload_never_mixes_tables() {
    use std::sync::atomic::AtomicBool;
    use std::thread;

    // Table A binds the key to both [A] controls, table B to both [B]
    // controls. A mixed table would drive one of each.
    let bank = Arc::new(ControlBank::new());
    let ids: Vec<ControlId> = ["[A]", "[B]"]
        .iter()
        .flat_map(|g| [ControlId::new(*g, "one"), ControlId::new(*g, "two")])
        .collect();
    let buttons: Vec<_> = ids
        .iter()
        .map(|id| bank.add_push_button(id.clone(), ButtonMode::Toggle))
        .collect();

    let table = |group: &str| -> Vec<MappingEntry> {
        ["one", "two"]
            .iter()
            .map(|item| {
                MappingEntry::new(
                    WireKey::new(NOTE_ON | CHANNEL, CONTROL),
                    MappingOptions::NONE,
                    ControlId::new(group, *item),
                )
            })
            .collect()
    };
    let table_a = table("[A]");
    let table_b = table("[B]");

    let dispatcher = Arc::new(Dispatcher::new(Arc::new(MappingStore::new()), bank.clone()));
    dispatcher.mappings().load(table_a.clone());
    let done = Arc::new(AtomicBool::new(false));

    let worker = {
        let dispatcher = dispatcher.clone();
        let done = done.clone();
        thread::spawn(move || {
            let mut events = 0usize;
            while !done.load(Ordering::Acquire) || events == 0 {
                let outcome = dispatcher
                    .receive(&[NOTE_ON | CHANNEL, CONTROL, 0x7F])
                    .unwrap();
                assert_eq!(outcome.applied, 2);
                events += 1;
            }
            events
        })
    };

    for n in 0..500 {
        let next = if n % 2 == 0 { &table_b } else { &table_a };
        dispatcher.mappings().load(next.clone());
    }
    done.store(true, Ordering::Release);
    assert!(worker.join().unwrap() > 0);

    // Every event toggled both controls of one group, so within a group the
    // two controls always agree
    assert_eq!(buttons[0].get(), buttons[1].get());
    assert_eq!(buttons[2].get(), buttons[3].get());
}
