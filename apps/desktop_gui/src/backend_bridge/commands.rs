//! Backend commands queued from UI to backend worker.

use client_core::Command;

pub enum BackendCommand {
    Core(Command),
    /// Stops the worker after terminating the reader.
    Exit,
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::Core(command) => match command {
                Command::InitDevice => "init_device",
                Command::Login { .. } => "login",
                Command::LoadRoster => "load_roster",
                Command::FilterRoster(_) => "filter_roster",
                Command::SelectEmployee(_) => "select_employee",
                Command::Enroll => "enroll",
                Command::DeviceInfo => "device_info",
                Command::CaptureImage => "capture_image",
                Command::UpdateFirmware(_) => "update_firmware",
                Command::EnrollOnDevice { .. } => "enroll_on_device",
                Command::Identify => "identify",
                Command::LoadTemplateIds => "load_template_ids",
                Command::DeleteAllTemplates => "delete_all_templates",
                Command::LoadConfig => "load_config",
                Command::SetMinVarTrack(_) => "set_min_var_track",
                Command::SetThreshold(_) => "set_threshold",
                Command::SetAutomaticThreshold(_) => "set_automatic_threshold",
                Command::SetBuzzer(_) => "set_buzzer",
                Command::SaveAllConfig(_) => "save_all_config",
                Command::RestoreDefaults => "restore_defaults",
                Command::Shutdown => "shutdown",
            },
            BackendCommand::Exit => "exit",
        }
    }
}
