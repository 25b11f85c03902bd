//! ctrlmap host
//!
//! Connects a MIDI input port to the mapping engine, keeps the preset file
//! hot-reloaded and logs every control change.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod sniffer;

use ctrlmap::config::{Preset, PresetWatcher};
use ctrlmap::{
    ControlBank, Controller, ControllerPreset, Dispatcher, KeyboardController, MappingStore,
    MidiController,
};

/// ctrlmap - map MIDI controller input onto application controls
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to preset file
    #[arg(short, long, default_value = "preset.yaml")]
    preset: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Also write logs to a daily rolling file at this path
    #[arg(long, env = "LOG_FILE")]
    log_file: Option<String>,

    /// MIDI input port index or name fragment (first port if omitted)
    #[arg(long)]
    port: Option<String>,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,

    /// Run in sniffer mode
    #[arg(long)]
    sniffer: bool,

    /// Print sniffed messages as JSON lines
    #[arg(long, requires = "sniffer")]
    json: bool,

    /// Drive the engine from an interactive prompt
    #[arg(long)]
    repl: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let _log_guard = init_logging(&args.log_level, args.log_file.as_deref())?;

    if args.list_ports {
        return sniffer::list_ports_formatted();
    }

    if args.sniffer {
        return sniffer::run_cli_sniffer(args.port, args.json).await;
    }

    info!("Starting ctrlmap v{}...", env!("CARGO_PKG_VERSION"));
    info!("Preset file: {}", args.preset);

    let (preset_watcher, preset) = PresetWatcher::new(args.preset.clone()).await?;
    info!("Preset '{}' loaded with hot-reload enabled", preset.name);

    let bank = Arc::new(ControlBank::new());
    let dispatcher = Dispatcher::new(Arc::new(MappingStore::new()), bank.clone());
    let midi = Arc::new(Controller::Midi(MidiController::new("MIDI", dispatcher)));
    let keyboard = Arc::new(Controller::Keyboard(KeyboardController::new(
        "Keyboard",
        bank.clone(),
    )));

    apply_preset(&preset, &bank, &midi, &keyboard);

    run_app(args, bank, midi, keyboard, preset_watcher).await?;

    info!("ctrlmap shutdown complete");
    Ok(())
}

async fn run_app(
    args: Args,
    bank: Arc<ControlBank>,
    midi: Arc<Controller>,
    keyboard: Arc<Controller>,
    mut preset_watcher: PresetWatcher,
) -> Result<()> {
    let mut changes = bank.subscribe();

    // Dispatch runs on the backend's callback thread
    let callback_midi = midi.clone();
    let connection = sniffer::connect_input("ctrlmap", args.port.as_deref(), move |_ts, data| {
        if let Some(controller) = callback_midi.as_midi() {
            // Malformed input is already reported by the dispatcher
            let _ = controller.receive(data);
        }
    });

    let _connection = match connection {
        Ok((conn, name)) => {
            info!("Listening on MIDI input: {}", name);
            Some(conn)
        }
        Err(e) if args.repl => {
            warn!("No MIDI input ({}), continuing with REPL only", e);
            None
        }
        Err(e) => return Err(e),
    };

    let repl = if args.repl {
        let (midi, keyboard, bank) = (midi.clone(), keyboard.clone(), bank.clone());
        Some(tokio::task::spawn_blocking(move || cli::run_repl(midi, keyboard, bank)))
    } else {
        None
    };
    let repl_done = async move {
        match repl {
            Some(handle) => handle.await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(repl_done);

    info!("Ready to process MIDI events!");

    loop {
        tokio::select! {
            change = changes.recv() => match change {
                Ok(change) => {
                    if args.repl {
                        debug!("{} = {}", change.control, change.value);
                    } else {
                        info!("{} = {}", change.control, change.value);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Control change log fell behind, {} changes skipped", skipped);
                }
                Err(RecvError::Closed) => break,
            },

            Some(preset) = preset_watcher.next_preset() => {
                info!("Preset file changed, reloading...");
                apply_preset(&preset, &bank, &midi, &keyboard);
            }

            result = &mut repl_done => {
                match result {
                    Ok(Ok(())) => info!("REPL closed"),
                    Ok(Err(e)) => warn!("REPL failed: {}", e),
                    Err(e) => warn!("REPL task panicked: {}", e),
                }
                break;
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received, stopping event loop");
                break;
            }
        }
    }

    info!("Shutting down...");
    Ok(())
}

fn apply_preset(preset: &Preset, bank: &ControlBank, midi: &Controller, keyboard: &Controller) {
    let created = preset.install_controls(bank);
    debug!("{} controls created, {} registered", created, bank.len());

    midi.apply_preset(&ControllerPreset::Midi(preset.midi_preset()));
    keyboard.apply_preset(&ControllerPreset::Keyboard(preset.keyboard_preset()));
}

fn init_logging(level: &str, log_file: Option<&str>) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Log file path has no file name: {}", path.display()))?;
            std::fs::create_dir_all(dir)?;

            let appender = tracing_appender::rolling::daily(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}
