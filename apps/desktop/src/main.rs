use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    device_config::{MinVar, SimilarityThreshold},
    load_settings, AppController, Command as CoreCommand, DeviceSettings, Event, HttpApiClient,
    View,
};
use fingerprint_device::{DeviceGateway, FingerImage, SimulatedReader};
use shared::domain::EmployeeId;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Headless driver for the biometry enrollment client")]
struct Cli {
    /// Settings file (defaults to ./biometria.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, env = "API_BASE_URL")]
    api_url: Option<String>,
    #[arg(long, env = "BIOMETRIA_USERNAME")]
    username: String,
    #[arg(long, env = "BIOMETRIA_PASSWORD", hide_env_values = true)]
    password: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List employees, optionally filtered by a name substring.
    Employees {
        #[arg(long)]
        filter: Option<String>,
    },
    /// Capture three samples and register the merged template for an employee.
    Enroll {
        #[arg(long)]
        employee_id: i64,
    },
    Info,
    /// Capture one image; writes a PNG when --output is given.
    Capture {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    Firmware {
        path: PathBuf,
        #[arg(long)]
        yes: bool,
    },
    /// Enroll a finger directly in the reader's template store.
    DeviceEnroll {
        id: String,
    },
    Identify,
    Ids,
    DeleteAll {
        #[arg(long)]
        yes: bool,
    },
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    Show,
    Set {
        #[arg(long)]
        min_var_track: Option<u32>,
        /// `0` or `auto` selects the automatic threshold.
        #[arg(long)]
        threshold: Option<String>,
        #[arg(long)]
        buzzer: Option<bool>,
    },
    Defaults,
}

struct Driver {
    controller: AppController,
}

impl Driver {
    /// Runs one command, echoing operator log lines. A failure event turns
    /// into an error carrying the operator message.
    async fn run(&mut self, command: CoreCommand) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        self.controller
            .handle(command, &mut |event| events.push(event))
            .await;

        let mut failure = None;
        for event in &events {
            match event {
                Event::Log { view, line } => println!("[{}] {line}", view.title()),
                Event::Failed { message, .. } => failure = Some(message.clone()),
                _ => {}
            }
        }
        match failure {
            Some(message) => Err(anyhow!(message)),
            None => Ok(events),
        }
    }
}

fn threshold_arg(raw: &str) -> Result<SimilarityThreshold> {
    if raw.eq_ignore_ascii_case("auto") {
        return Ok(SimilarityThreshold::Automatic);
    }
    Ok(SimilarityThreshold::parse(raw)?)
}

fn write_png(image: &FingerImage, path: &Path) -> Result<()> {
    let buffer = image::GrayImage::from_raw(image.width, image.height, image.pixels.clone())
        .ok_or_else(|| anyhow!("reader returned an incomplete {}x{} frame", image.width, image.height))?;
    buffer
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(url) = &cli.api_url {
        settings.api_base_url = client_core::config::normalize_base_url(url)?;
    }
    if !settings.simulated_device {
        bail!("no reader driver is built into this binary; set simulated_device = true");
    }

    let api = HttpApiClient::from_settings(&settings).context("failed to build HTTP client")?;
    tracing::info!(api = %settings.api_base_url, "starting headless session");
    let device: Arc<dyn DeviceGateway> = Arc::new(SimulatedReader::new());
    let mut driver = Driver {
        controller: AppController::new(Arc::new(api), device),
    };

    driver.run(CoreCommand::InitDevice).await?;
    driver
        .run(CoreCommand::Login {
            username: cli.username.clone(),
            password: cli.password.clone(),
        })
        .await?;

    let outcome = execute(&mut driver, cli.command).await;
    driver.run(CoreCommand::Shutdown).await?;
    outcome
}

async fn execute(driver: &mut Driver, command: Command) -> Result<()> {
    match command {
        Command::Employees { filter } => {
            driver.run(CoreCommand::LoadRoster).await?;
            if let Some(filter) = filter {
                driver.run(CoreCommand::FilterRoster(filter)).await?;
            }
            let view = driver.controller.roster().snapshot();
            for employee in &view.rows {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    employee.id,
                    employee.name,
                    employee.time_card,
                    employee.department,
                    if employee.active { "active" } else { "inactive" }
                );
            }
            println!("{} of {} employees", view.rows.len(), view.total);
        }
        Command::Enroll { employee_id } => {
            driver.run(CoreCommand::LoadRoster).await?;
            driver
                .run(CoreCommand::SelectEmployee(EmployeeId(employee_id)))
                .await?;
            if driver.controller.roster().selected().is_none() {
                bail!("employee {employee_id} is not in the roster");
            }
            driver.run(CoreCommand::Enroll).await?;
        }
        Command::Info => {
            for event in driver.run(CoreCommand::DeviceInfo).await? {
                if let Event::DeviceInfo(info) = event {
                    println!("serial:  {}", info.serial_number);
                    println!("model:   {}", info.model);
                    println!("version: {}", info.version);
                }
            }
        }
        Command::Capture { output } => {
            for event in driver.run(CoreCommand::CaptureImage).await? {
                if let (Event::Image(Some(image)), Some(path)) = (&event, &output) {
                    write_png(image, path)?;
                    println!("wrote {}", path.display());
                }
            }
        }
        Command::Firmware { path, yes } => {
            if !yes {
                bail!(
                    "refusing to update the reader with {} without --yes",
                    path.display()
                );
            }
            driver.run(CoreCommand::UpdateFirmware(path)).await?;
        }
        Command::DeviceEnroll { id } => {
            driver.run(CoreCommand::EnrollOnDevice { raw_id: id }).await?;
        }
        Command::Identify => {
            driver.run(CoreCommand::Identify).await?;
        }
        Command::Ids => {
            for event in driver.run(CoreCommand::LoadTemplateIds).await? {
                if let Event::TemplateIds(ids) = event {
                    for id in ids {
                        println!("{id}");
                    }
                }
            }
        }
        Command::DeleteAll { yes } => {
            if !yes {
                bail!("refusing to delete every reader template without --yes");
            }
            driver.run(CoreCommand::DeleteAllTemplates).await?;
        }
        Command::Config(ConfigCommand::Show) => {
            driver.run(CoreCommand::LoadConfig).await?;
            print_config(driver.controller.config());
        }
        Command::Config(ConfigCommand::Set {
            min_var_track,
            threshold,
            buzzer,
        }) => {
            driver.run(CoreCommand::LoadConfig).await?;
            let mut settings = driver.controller.config();
            if let Some(track) = min_var_track {
                settings.min_var = MinVar::from_track(track);
            }
            if let Some(raw) = threshold {
                settings.threshold = threshold_arg(&raw)?;
            }
            if let Some(on) = buzzer {
                settings.buzzer = on;
            }
            driver.run(CoreCommand::SaveAllConfig(settings)).await?;
            print_config(driver.controller.config());
        }
        Command::Config(ConfigCommand::Defaults) => {
            driver.run(CoreCommand::RestoreDefaults).await?;
            print_config(driver.controller.config());
        }
    }
    Ok(())
}

fn print_config(settings: DeviceSettings) {
    println!(
        "[{}] min var: {} (track {})",
        View::Configuration.title(),
        settings.min_var.device_value(),
        settings.min_var.track()
    );
    match settings.threshold {
        SimilarityThreshold::Automatic => println!("similarity threshold: automatic"),
        SimilarityThreshold::Fixed(value) => println!("similarity threshold: {value}"),
    }
    println!("buzzer: {}", if settings.buzzer { "on" } else { "off" });
}
