//! Command/event boundary between a front end and the core.
//!
//! Front ends send [`Command`]s; [`AppController::handle`] is the only code
//! that mutates the session and roster, and it reports everything back as a
//! stream of [`Event`]s. Every command tied to an [`Operation`] ends with
//! exactly one [`Event::Finished`].

use std::{path::PathBuf, sync::Arc};

use fingerprint_device::{ConfigParam, DeviceGateway, DeviceInfo, FingerImage, Identification};
use shared::domain::EmployeeId;
use tracing::{debug, info};

use crate::{
    api::ApiClient,
    device_config::{self, DeviceSettings, SimilarityThreshold},
    device_ops,
    enrollment::{EnrollmentOrchestrator, EnrollmentReport},
    error::{DeviceConfigError, OperationError},
    guard::Operation,
    roster::{EmployeeRoster, RosterView, Selection},
    session::{Session, View},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    InitDevice,
    Login { username: String, password: String },
    LoadRoster,
    FilterRoster(String),
    SelectEmployee(EmployeeId),
    Enroll,
    DeviceInfo,
    CaptureImage,
    UpdateFirmware(PathBuf),
    EnrollOnDevice { raw_id: String },
    Identify,
    LoadTemplateIds,
    DeleteAllTemplates,
    LoadConfig,
    SetMinVarTrack(u32),
    SetThreshold(String),
    SetAutomaticThreshold(bool),
    SetBuzzer(bool),
    SaveAllConfig(DeviceSettings),
    RestoreDefaults,
    Shutdown,
}

impl Command {
    /// Busy slot the command occupies while it runs.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Command::Login { .. } => Some(Operation::Login),
            Command::LoadRoster => Some(Operation::LoadRoster),
            Command::Enroll => Some(Operation::Enroll),
            Command::DeviceInfo => Some(Operation::DeviceInfo),
            Command::CaptureImage => Some(Operation::Capture),
            Command::UpdateFirmware(_) => Some(Operation::FirmwareUpdate),
            Command::EnrollOnDevice { .. } => Some(Operation::DeviceEnroll),
            Command::Identify => Some(Operation::Identify),
            Command::LoadTemplateIds => Some(Operation::TemplateIds),
            Command::DeleteAllTemplates => Some(Operation::DeleteTemplates),
            Command::LoadConfig => Some(Operation::LoadConfig),
            Command::SetMinVarTrack(_)
            | Command::SetThreshold(_)
            | Command::SetAutomaticThreshold(_)
            | Command::SetBuzzer(_)
            | Command::SaveAllConfig(_)
            | Command::RestoreDefaults => Some(Operation::SaveConfig),
            Command::InitDevice
            | Command::FilterRoster(_)
            | Command::SelectEmployee(_)
            | Command::Shutdown => None,
        }
    }

    /// View whose log receives the command's output.
    pub fn view(&self) -> View {
        match self {
            Command::Login { .. } => View::Login,
            Command::InitDevice
            | Command::DeviceInfo
            | Command::CaptureImage
            | Command::UpdateFirmware(_)
            | Command::Shutdown => View::Capture,
            Command::LoadRoster
            | Command::FilterRoster(_)
            | Command::SelectEmployee(_)
            | Command::Enroll
            | Command::EnrollOnDevice { .. }
            | Command::Identify
            | Command::LoadTemplateIds
            | Command::DeleteAllTemplates => View::Identification,
            Command::LoadConfig
            | Command::SetMinVarTrack(_)
            | Command::SetThreshold(_)
            | Command::SetAutomaticThreshold(_)
            | Command::SetBuzzer(_)
            | Command::SaveAllConfig(_)
            | Command::RestoreDefaults => View::Configuration,
        }
    }
}

/// Work to run when a view is entered.
pub fn entry_command(view: View) -> Option<Command> {
    match view {
        View::Identification => Some(Command::LoadTemplateIds),
        View::Configuration => Some(Command::LoadConfig),
        View::Login | View::Capture => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Log { view: View, line: String },
    ClearLog(View),
    LoggedIn,
    Roster(RosterView),
    DeviceInfo(DeviceInfo),
    /// `None` clears the preview after a failed capture.
    Image(Option<FingerImage>),
    /// `None` when the finger was not identified.
    Identified(Option<Identification>),
    TemplateIds(Vec<i64>),
    Config(DeviceSettings),
    Failed {
        operation: Option<Operation>,
        message: String,
        requires_reauth: bool,
    },
    Finished(Operation),
}

pub type EventSink<'a> = &'a mut (dyn FnMut(Event) + Send);

fn log(sink: &mut (dyn FnMut(Event) + Send), view: View, line: impl Into<String>) {
    sink(Event::Log {
        view,
        line: line.into(),
    });
}

pub struct AppController {
    api: Arc<dyn ApiClient>,
    device: Arc<dyn DeviceGateway>,
    orchestrator: EnrollmentOrchestrator,
    session: Session,
    roster: EmployeeRoster,
    config: DeviceSettings,
}

impl AppController {
    pub fn new(api: Arc<dyn ApiClient>, device: Arc<dyn DeviceGateway>) -> Self {
        let orchestrator = EnrollmentOrchestrator::new(device.clone(), api.clone());
        Self {
            api,
            device,
            orchestrator,
            session: Session::new(),
            roster: EmployeeRoster::new(),
            config: DeviceSettings::factory_defaults(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn roster(&self) -> &EmployeeRoster {
        &self.roster
    }

    /// Last device configuration known to the controller.
    pub fn config(&self) -> DeviceSettings {
        self.config
    }

    pub async fn handle(&mut self, command: Command, sink: EventSink<'_>) {
        let operation = command.operation();
        let view = command.view();
        debug!(?command, "handling command");

        if let Err(err) = self.dispatch(command, sink).await {
            let message = err.operator_message();
            log(sink, view, message.clone());
            sink(Event::Failed {
                operation,
                message,
                requires_reauth: err.requires_reauth(),
            });
        }
        if let Some(operation) = operation {
            sink(Event::Finished(operation));
        }
    }

    async fn dispatch(&mut self, command: Command, sink: EventSink<'_>) -> Result<(), OperationError> {
        match command {
            Command::InitDevice => {
                let outcome = device_ops::init(&self.device).await?;
                match outcome.warning {
                    Some(warning) => log(sink, View::Capture, format!("Init Warning: {}", warning.message)),
                    None => log(sink, View::Capture, "Init Successful"),
                }
            }
            Command::Login { username, password } => {
                log(sink, View::Login, "Authenticating...");
                self.session
                    .login(self.api.as_ref(), &username, &password)
                    .await?;
                log(sink, View::Login, "Connected!");
                sink(Event::LoggedIn);
            }
            Command::LoadRoster => {
                sink(Event::ClearLog(View::Identification));
                log(sink, View::Identification, "Fetching employees from the API...");
                let token = self.session.bearer()?.to_string();
                self.roster.load(self.api.as_ref(), &token).await?;
                sink(Event::Roster(self.roster.snapshot()));
                log(sink, View::Identification, "Employees loaded!");
            }
            Command::FilterRoster(text) => {
                self.roster.filter(&text);
                sink(Event::Roster(self.roster.snapshot()));
            }
            Command::SelectEmployee(id) => {
                if let Selection::Selected(_) = self.roster.select(id) {
                    if let Some(employee) = self.roster.selected() {
                        sink(Event::ClearLog(View::Identification));
                        log(
                            sink,
                            View::Identification,
                            format!("Employee selected: {}", employee.name),
                        );
                    }
                }
                sink(Event::Roster(self.roster.snapshot()));
            }
            Command::Enroll => {
                let report = self.enroll(sink).await?;
                if let Err(err) = &report.roster_refresh {
                    log(
                        sink,
                        View::Identification,
                        format!("Employee list could not be refreshed: {err}"),
                    );
                }
                sink(Event::Roster(self.roster.snapshot()));
            }
            Command::DeviceInfo => {
                let outcome = device_ops::device_info(&self.device).await?;
                sink(Event::DeviceInfo(outcome.value));
            }
            Command::CaptureImage => {
                sink(Event::ClearLog(View::Capture));
                log(sink, View::Capture, "Waiting for finger...");
                match device_ops::capture_image(&self.device).await {
                    Ok(outcome) => {
                        log(sink, View::Capture, "Capture Success");
                        sink(Event::Image(Some(outcome.value)));
                    }
                    Err(err) => {
                        sink(Event::Image(None));
                        return Err(err.into());
                    }
                }
            }
            Command::UpdateFirmware(path) => {
                log(sink, View::Capture, "Updating reader firmware...");
                device_ops::update_firmware(&self.device, path).await?;
                log(sink, View::Capture, "Update Successful!");
            }
            Command::EnrollOnDevice { raw_id } => {
                let id = device_ops::parse_template_id(&raw_id)?;
                sink(Event::ClearLog(View::Identification));
                log(
                    sink,
                    View::Identification,
                    "Enrolling... Press your finger 3 times on the device",
                );
                let enrolled = device_ops::enroll_on_device(&self.device, id).await;
                if enrolled.is_ok() {
                    log(sink, View::Identification, format!("ID {id} Enrolled"));
                }
                self.reload_template_ids(sink).await;
                enrolled?;
            }
            Command::Identify => {
                sink(Event::ClearLog(View::Identification));
                log(sink, View::Identification, "Identifying...");
                match device_ops::identify(&self.device).await {
                    Ok(outcome) => {
                        let matched = outcome.value;
                        log(
                            sink,
                            View::Identification,
                            format!(
                                "ID {} Identified (score: {}, quality: {})",
                                matched.id, matched.score, matched.quality
                            ),
                        );
                        sink(Event::Identified(Some(matched)));
                    }
                    Err(err) => {
                        sink(Event::Identified(None));
                        return Err(err.into());
                    }
                }
            }
            Command::LoadTemplateIds => {
                let outcome = device_ops::template_ids(&self.device).await?;
                sink(Event::TemplateIds(outcome.value));
            }
            Command::DeleteAllTemplates => {
                let deleted = device_ops::delete_all_templates(&self.device).await;
                if deleted.is_ok() {
                    log(sink, View::Identification, "IDs Deleted");
                }
                self.reload_template_ids(sink).await;
                deleted?;
            }
            Command::LoadConfig => {
                let loaded = device_config::load_all(&self.device).await;
                for err in &loaded.errors {
                    log(sink, View::Configuration, err.to_string());
                }
                self.config = loaded.merged_over(self.config);
                sink(Event::Config(self.config));
            }
            Command::SetMinVarTrack(track) => {
                let mut next = self.config;
                next.min_var = device_config::MinVar::from_track(track);
                self.save_one(ConfigParam::MinVar, next, sink).await?;
            }
            Command::SetThreshold(raw) => {
                let threshold = match SimilarityThreshold::parse(&raw) {
                    Ok(threshold) => threshold,
                    Err(err) => {
                        // The field snaps back to the manual default without
                        // touching the reader.
                        sink(Event::Config(DeviceSettings {
                            threshold: SimilarityThreshold::Fixed(
                                device_config::MANUAL_THRESHOLD_DEFAULT,
                            ),
                            ..self.config
                        }));
                        return Err(err.into());
                    }
                };
                let mut next = self.config;
                next.threshold = threshold;
                self.save_one(ConfigParam::SimilarityThreshold, next, sink).await?;
            }
            Command::SetAutomaticThreshold(automatic) => {
                let mut next = self.config;
                next.threshold = SimilarityThreshold::with_automatic(automatic);
                self.save_one(ConfigParam::SimilarityThreshold, next, sink).await?;
            }
            Command::SetBuzzer(on) => {
                let mut next = self.config;
                next.buzzer = on;
                self.save_one(ConfigParam::BuzzerOn, next, sink).await?;
            }
            Command::SaveAllConfig(settings) => {
                let results = device_config::save_all(&self.device, &settings).await;
                self.apply_save_results(settings, results, sink)?;
            }
            Command::RestoreDefaults => {
                let defaults = DeviceSettings::factory_defaults();
                let results = device_config::restore_defaults(&self.device).await;
                self.apply_save_results(defaults, results, sink)?;
            }
            Command::Shutdown => {
                device_ops::terminate(&self.device).await;
            }
        }
        Ok(())
    }

    async fn enroll(&mut self, sink: EventSink<'_>) -> Result<EnrollmentReport, OperationError> {
        let mut progress = |step: crate::enrollment::EnrollmentProgress| {
            log(sink, View::Identification, step.message());
        };
        let report = self
            .orchestrator
            .enroll(&self.session, &mut self.roster, &mut progress)
            .await?;
        info!(employee_id = report.employee_id.0, "enrollment finished");
        Ok(report)
    }

    /// Refresh that follows device-side template changes. Its failure is
    /// only logged; the triggering operation reports its own outcome.
    async fn reload_template_ids(&mut self, sink: EventSink<'_>) {
        match device_ops::template_ids(&self.device).await {
            Ok(outcome) => sink(Event::TemplateIds(outcome.value)),
            Err(err) => log(
                sink,
                View::Identification,
                format!("Error Reading IDs: {}", err.message),
            ),
        }
    }

    async fn save_one(
        &mut self,
        param: ConfigParam,
        next: DeviceSettings,
        sink: EventSink<'_>,
    ) -> Result<(), OperationError> {
        let value = next
            .wire_values()
            .into_iter()
            .find_map(|(candidate, value)| (candidate == param).then_some(value))
            .unwrap_or_default();
        device_config::save(&self.device, param, &value).await?;
        self.config = next;
        log(sink, View::Configuration, format!("{} set successfully", param.label()));
        sink(Event::Config(self.config));
        Ok(())
    }

    /// Keeps the successfully written parameters and reports the first
    /// failure; the others are logged individually.
    fn apply_save_results(
        &mut self,
        requested: DeviceSettings,
        results: Vec<(ConfigParam, Result<(), DeviceConfigError>)>,
        sink: EventSink<'_>,
    ) -> Result<(), OperationError> {
        let mut first_error = None;
        for (param, result) in results {
            match result {
                Ok(()) => {
                    match param {
                        ConfigParam::MinVar => self.config.min_var = requested.min_var,
                        ConfigParam::SimilarityThreshold => {
                            self.config.threshold = requested.threshold
                        }
                        ConfigParam::BuzzerOn => self.config.buzzer = requested.buzzer,
                        ConfigParam::TemplateFormat => {}
                    }
                    log(sink, View::Configuration, format!("{} set successfully", param.label()));
                }
                Err(err) => match first_error {
                    None => first_error = Some(err),
                    Some(_) => log(sink, View::Configuration, err.to_string()),
                },
            }
        }
        sink(Event::Config(self.config));
        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
