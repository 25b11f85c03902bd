//! Preset file watcher for hot-reload support

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::Preset;

/// Let editors finish writing before the file is re-read
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(100);

/// Watches a preset file and yields each successfully parsed revision.
/// A revision that fails to load is logged and skipped, so the caller keeps
/// whatever table it already has.
pub struct PresetWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<Preset>,
}

impl PresetWatcher {
    /// Load the initial preset and start watching `preset_path`
    pub async fn new(preset_path: String) -> Result<(Self, Preset)> {
        let (tx, rx) = mpsc::channel(10);

        let initial = Preset::load(&preset_path)
            .await
            .context("Failed to load initial preset")?;

        let path_clone = preset_path.clone();

        // notify callbacks run on their own OS thread, outside the runtime
        let runtime_handle = tokio::runtime::Handle::current();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                        debug!("Preset file changed: {:?}", event.paths);

                        let path = path_clone.clone();
                        let tx = tx.clone();

                        runtime_handle.spawn(async move {
                            tokio::time::sleep(RELOAD_DEBOUNCE).await;

                            match Preset::load(&path).await {
                                Ok(preset) => {
                                    info!("Preset '{}' reloaded", preset.name);
                                    if let Err(e) = tx.send(preset).await {
                                        error!("Failed to send preset update: {}", e);
                                    }
                                }
                                Err(e) => {
                                    warn!("Failed to reload preset (keeping current mappings): {:#}", e);
                                }
                            }
                        });
                    }
                }
                Err(e) => {
                    error!("Watch error: {}", e);
                }
            }
        })?;

        watcher
            .watch(Path::new(&preset_path), RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch preset file: {}", preset_path))?;

        info!("Preset watcher started for: {}", preset_path);

        Ok((Self { _watcher: watcher, rx }, initial))
    }

    /// Wait for the next preset revision.
    /// Returns None if the watcher has been closed.
    pub async fn next_preset(&mut self) -> Option<Preset> {
        self.rx.recv().await
    }
}
