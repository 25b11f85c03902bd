//! MIDI port discovery and sniffer
//!
//! Lists ports, opens input connections for the engine, and prints live
//! traffic for building presets.

use anyhow::Result;
use colored::*;
use midir::{MidiInput, MidiInputConnection, MidiOutput};
use serde::Serialize;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::info;

use ctrlmap::midi::{format_hex, MessageKind, MidiEvent};

/// A MIDI port as reported by the backend
#[derive(Debug, Clone)]
pub struct PortInfo {
    pub index: usize,
    pub name: String,
}

pub fn discover_input_ports() -> Result<Vec<PortInfo>> {
    let midi_in = MidiInput::new("ctrlmap-discovery")?;
    Ok(midi_in
        .ports()
        .iter()
        .enumerate()
        .filter_map(|(index, port)| {
            midi_in.port_name(port).ok().map(|name| PortInfo { index, name })
        })
        .collect())
}

pub fn discover_output_ports() -> Result<Vec<PortInfo>> {
    let midi_out = MidiOutput::new("ctrlmap-discovery")?;
    Ok(midi_out
        .ports()
        .iter()
        .enumerate()
        .filter_map(|(index, port)| {
            midi_out.port_name(port).ok().map(|name| PortInfo { index, name })
        })
        .collect())
}

/// Open an input port and feed every message to `callback`.
///
/// `pattern` is a port index or a case-insensitive name fragment; `None`
/// picks the first port. Returns the live connection and the port name.
pub fn connect_input<F>(
    client_name: &str,
    pattern: Option<&str>,
    mut callback: F,
) -> Result<(MidiInputConnection<()>, String)>
where
    F: FnMut(u64, &[u8]) + Send + 'static,
{
    let midi_in = MidiInput::new(client_name)?;
    let ports = midi_in.ports();

    let found = match pattern {
        None => ports.first().cloned(),
        Some(p) => match p.parse::<usize>() {
            Ok(index) => ports.get(index).cloned(),
            Err(_) => {
                let needle = p.to_lowercase();
                ports.iter().find(|port| {
                    midi_in
                        .port_name(port)
                        .map(|name| name.to_lowercase().contains(&needle))
                        .unwrap_or(false)
                }).cloned()
            }
        },
    };

    let Some(port) = found else {
        match pattern {
            Some(p) => anyhow::bail!("No input port matching: {}", p),
            None => anyhow::bail!("No MIDI input ports available"),
        }
    };

    let port_name = midi_in.port_name(&port)?;
    info!("Connecting to input: {}", port_name);

    // ConnectError carries the MidiInput back, which is not Sync
    let conn = midi_in
        .connect(&port, client_name, move |timestamp, data, _| callback(timestamp, data), ())
        .map_err(|e| anyhow::anyhow!("Failed to connect to input port '{}': {}", port_name, e))?;

    Ok((conn, port_name))
}

/// MIDI sniffer event
#[derive(Debug, Clone, Serialize)]
pub struct SnifferEvent {
    pub timestamp_ms: u64,
    pub port: String,
    #[serde(serialize_with = "serialize_hex")]
    pub data: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn serialize_hex<S: serde::Serializer>(data: &[u8], s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&hex::encode_upper(data))
}

impl SnifferEvent {
    pub fn new(timestamp_ms: u64, port: &str, data: &[u8]) -> Self {
        Self {
            timestamp_ms,
            port: port.to_string(),
            data: data.to_vec(),
            message: MidiEvent::decode(data).ok().map(|m| m.to_string()),
        }
    }
}

/// Print live traffic from one input port until Ctrl+C
pub async fn run_cli_sniffer(pattern: Option<String>, json: bool) -> Result<()> {
    let (event_tx, mut event_rx) = mpsc::channel::<SnifferEvent>(1000);
    let start_time = Instant::now();

    // The port name is only known after connecting
    let port_name = std::sync::Arc::new(parking_lot::RwLock::new(String::new()));
    let callback_name = port_name.clone();

    let (_conn, name) = connect_input("ctrlmap-sniffer", pattern.as_deref(), move |_ts, data| {
        let timestamp_ms = start_time.elapsed().as_millis() as u64;
        let event = SnifferEvent::new(timestamp_ms, &callback_name.read(), data);
        let _ = event_tx.try_send(event);
    })?;
    *port_name.write() = name.clone();

    if !json {
        println!("{}", "=== MIDI Sniffer ===".bold().cyan());
        println!("Listening on {}. Press Ctrl+C to exit\n", name.bright_white());
        println!("{}", "Format: [timestamp] DIR PORT | HEX => PARSED".dimmed());
        println!("{}\n", "─".repeat(80).dimmed());
    }

    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                if json {
                    println!("{}", serde_json::to_string(&event)?);
                } else {
                    print_event(&event);
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    if !json {
        println!("\n{}", "Sniffer stopped".yellow());
    }
    Ok(())
}

fn print_event(event: &SnifferEvent) {
    let port = if event.port.chars().count() > 20 {
        format!("{}...", event.port.chars().take(17).collect::<String>())
    } else {
        event.port.clone()
    };

    let hex = format_hex(&event.data);
    let hex_colored = match event.data.first().copied().and_then(MessageKind::from_status) {
        Some(MessageKind::NoteOn) => hex.bright_green(),
        Some(MessageKind::NoteOff) => hex.bright_red(),
        Some(MessageKind::ControlChange) => hex.bright_yellow(),
        Some(MessageKind::PitchBend) => hex.bright_cyan(),
        Some(_) => hex.normal(),
        None => hex.bright_black(),
    };

    let parsed = event
        .message
        .as_ref()
        .map(|m| format!(" => {}", m.bright_blue()))
        .unwrap_or_default();

    println!(
        "[{}ms] {} {:20} | {}{}",
        format!("{:08}", event.timestamp_ms).dimmed(),
        "IN ".green(),
        port.white(),
        hex_colored,
        parsed
    );
}

/// List all ports in a formatted way
pub fn list_ports_formatted() -> Result<()> {
    println!("\n{}", "=== Available MIDI Ports ===".bold().cyan());

    for (title, ports) in [
        ("Input Ports:", discover_input_ports()?),
        ("Output Ports:", discover_output_ports()?),
    ] {
        println!("\n{}", title.bold());
        if ports.is_empty() {
            println!("  {}", "No ports found".dimmed());
        }
        for port in ports {
            println!("  [{}] {}", port.index.to_string().yellow(), port.name);
        }
    }

    println!();
    Ok(())
}
