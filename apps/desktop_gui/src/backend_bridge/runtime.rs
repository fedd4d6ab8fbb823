//! Backend worker: owns the controller and processes UI commands one at a time.

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};

use client_core::{AppController, Command, HttpApiClient, Settings};
use crossbeam_channel::{Receiver, Sender};
use fingerprint_device::{DeviceGateway, SimulatedReader};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::UiEvent;

pub fn launch(
    settings: Settings,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::StartupFailed(format!(
                    "failed to build backend runtime: {err}"
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            if !settings.simulated_device {
                let _ = ui_tx.try_send(UiEvent::StartupFailed(
                    "no reader driver is built into this application; enable simulated_device"
                        .to_string(),
                ));
                return;
            }
            let api = match HttpApiClient::from_settings(&settings) {
                Ok(api) => api,
                Err(err) => {
                    let _ = ui_tx.try_send(UiEvent::StartupFailed(format!(
                        "failed to build HTTP client: {err}"
                    )));
                    tracing::error!("failed to build HTTP client: {err}");
                    return;
                }
            };
            let device: Arc<dyn DeviceGateway> = Arc::new(SimulatedReader::new());
            let mut controller = AppController::new(Arc::new(api), device);
            tracing::info!(api = %settings.api_base_url, "backend worker ready");

            let mut forward = |event| {
                if ui_tx.send(UiEvent::Core(event)).is_err() {
                    tracing::debug!("ui receiver gone; dropping event");
                }
            };

            controller.handle(Command::InitDevice, &mut forward).await;
            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    BackendCommand::Core(command) => controller.handle(command, &mut forward).await,
                    BackendCommand::Exit => break,
                }
            }
            // Best effort on every exit path, including a dropped UI.
            controller.handle(Command::Shutdown, &mut forward).await;
            tracing::info!("backend worker stopped");
        });
    })
}
