//! Interactive REPL for driving the engine by hand
//!
//! Accepts raw MIDI as hex (`91 10 7F`), keyboard events (`key space down`)
//! and a few inspection commands.

use anyhow::Result;
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::Arc;

use ctrlmap::{ControlBank, Controller};

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Midi(Vec<u8>),
    Key { name: String, pressed: bool },
    Values,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let mut words = line.split_whitespace();

    match words.next() {
        Some("exit") | Some("quit") => Ok(Command::Quit),
        Some("help") | Some("?") => Ok(Command::Help),
        Some("values") | Some("ls") => Ok(Command::Values),
        Some("key") => {
            let name = words.next().ok_or("usage: key <name> down|up")?;
            let pressed = match words.next() {
                Some("down") => true,
                Some("up") => false,
                _ => return Err("usage: key <name> down|up".into()),
            };
            Ok(Command::Key {
                name: name.to_string(),
                pressed,
            })
        }
        Some(_) => {
            let digits: String = line.split_whitespace().collect();
            hex::decode(&digits)
                .map(Command::Midi)
                .map_err(|e| format!("not a command or hex bytes: {}", e))
        }
        None => Err("empty input".into()),
    }
}

fn print_help() {
    println!("  {}           send raw MIDI bytes", "91 10 7F".yellow());
    println!("  {}  press or release a bound key", "key <name> down|up".yellow());
    println!("  {}             show every control value", "values".yellow());
    println!("  {}               leave the REPL", "quit".yellow());
}

/// Blocking read loop. Run it off the async runtime.
pub fn run_repl(midi: Arc<Controller>, keyboard: Arc<Controller>, bank: Arc<ControlBank>) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    println!("{}", "ctrlmap REPL, type 'help' for commands".dimmed());

    loop {
        let line = match rl.readline("ctrlmap> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        if line.trim().is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line.as_str());

        match parse_command(&line) {
            Ok(Command::Quit) => break,
            Ok(Command::Help) => print_help(),
            Ok(Command::Values) => {
                for (id, value) in bank.values() {
                    println!("  {:32} {}", id.to_string().cyan(), value);
                }
            }
            Ok(Command::Midi(bytes)) => match midi.as_midi() {
                Some(controller) => match controller.receive(&bytes) {
                    Ok(outcome) if outcome.is_unmapped() => println!("  {}", "unmapped".dimmed()),
                    Ok(outcome) => println!(
                        "  applied {} of {} ({} dangling)",
                        outcome.applied, outcome.matched, outcome.dangling
                    ),
                    Err(e) => println!("  {}", e.to_string().red()),
                },
                None => println!("  {}", "no MIDI controller".red()),
            },
            Ok(Command::Key { name, pressed }) => match keyboard.as_keyboard() {
                Some(controller) => {
                    let outcome = controller.key_event(&name, pressed);
                    if outcome.is_unmapped() {
                        println!("  {}", format!("key '{}' is not bound", name).dimmed());
                    }
                }
                None => println!("  {}", "no keyboard controller".red()),
            },
            Err(e) => println!("  {}", e.red()),
        }
    }

    Ok(())
}
