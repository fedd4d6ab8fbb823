use std::path::{Path, PathBuf};

mod backend_bridge;
mod controller;
mod ui;

use anyhow::{anyhow, Context};
use clap::Parser;
use client_core::{config::SETTINGS_FILE_NAME, load_settings, Settings};
use crossbeam_channel::bounded;
use eframe::egui;
use tracing_subscriber::EnvFilter;

use backend_bridge::{commands::BackendCommand, runtime};
use controller::events::UiEvent;
use ui::BiometriaApp;

#[derive(Parser, Debug)]
#[command(about = "Fingerprint enrollment station")]
struct Args {
    /// Settings file; defaults to the per-user config directory.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn user_settings_path() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join("biometria").join(SETTINGS_FILE_NAME);
    path.is_file().then_some(path)
}

fn resolve_settings(explicit: Option<&Path>) -> anyhow::Result<Settings> {
    match explicit {
        Some(path) => load_settings(Some(path)),
        None => match user_settings_path() {
            Some(path) => load_settings(Some(&path)),
            None => load_settings(None),
        },
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let settings = resolve_settings(args.config.as_deref()).context("failed to load settings")?;

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    let worker = runtime::launch(settings, cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Biometria")
            .with_inner_size([1100.0, 760.0])
            .with_min_inner_size([860.0, 600.0]),
        ..Default::default()
    };
    let exit_tx = cmd_tx.clone();
    let result = eframe::run_native(
        "Biometria",
        options,
        Box::new(move |_cc| Ok(Box::new(BiometriaApp::new(cmd_tx, ui_rx)))),
    );

    let _ = exit_tx.send(BackendCommand::Exit);
    drop(exit_tx);
    if worker.join().is_err() {
        tracing::error!("backend worker panicked");
    }
    result.map_err(|err| anyhow!("gui terminated: {err}"))
}
