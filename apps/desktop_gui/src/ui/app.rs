use std::{collections::HashMap, path::PathBuf};

use client_core::{
    entry_command, guard_navigation, Command, DeviceSettings, Event, Navigation, Operation,
    RosterView, SimilarityThreshold, View,
};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use egui::TextureHandle;
use fingerprint_device::{DeviceInfo, FingerImage};
use image::GenericImageView;
use shared::domain::{Employee, EmployeeId};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::{
    events::UiEvent,
    orchestration::{dispatch_backend_command, InFlight},
};

/// Slider positions offered for Min Var (device value = 500 * position).
const MAX_MIN_VAR_TRACK: u32 = 20;
const PHOTO_SIZE: f32 = 64.0;
const LOG_HEIGHT: f32 = 150.0;

const CAPTURE_OPERATIONS: [Operation; 3] = [
    Operation::DeviceInfo,
    Operation::Capture,
    Operation::FirmwareUpdate,
];
const CONFIG_OPERATIONS: [Operation; 2] = [Operation::LoadConfig, Operation::SaveConfig];
const IDENTIFY_OPERATIONS: [Operation; 6] = [
    Operation::DeviceEnroll,
    Operation::Identify,
    Operation::TemplateIds,
    Operation::DeleteTemplates,
    Operation::LoadRoster,
    Operation::Enroll,
];

/// Timestamped, append-only log shown under a tab.
#[derive(Default)]
pub struct OperatorLog {
    lines: Vec<String>,
}

impl OperatorLog {
    pub fn push(&mut self, line: &str) {
        let stamp = chrono::Local::now().format("%H:%M:%S");
        self.lines.push(format!("[{stamp}] {line}"));
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn last(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }
}

pub struct BiometriaApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    in_flight: InFlight,

    view: View,
    authenticated: bool,
    access_warning: Option<&'static str>,
    status: String,
    startup_error: Option<String>,
    logs: HashMap<View, OperatorLog>,

    username: String,
    password: String,
    login_failed: bool,

    device_info: Option<DeviceInfo>,
    finger_texture: Option<TextureHandle>,
    pending_firmware: Option<PathBuf>,

    enroll_id: String,
    identify_result: String,
    template_ids: Vec<i64>,
    roster: RosterView,
    filter: String,
    photos: HashMap<EmployeeId, Option<TextureHandle>>,

    min_var_track: u32,
    automatic_threshold: bool,
    threshold_text: String,
    buzzer: bool,
}

impl BiometriaApp {
    pub fn new(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>) -> Self {
        let mut app = Self {
            cmd_tx,
            ui_rx,
            in_flight: InFlight::default(),
            view: View::Login,
            authenticated: false,
            access_warning: None,
            status: "Not signed in".to_string(),
            startup_error: None,
            logs: HashMap::new(),
            username: String::new(),
            password: String::new(),
            login_failed: false,
            device_info: None,
            finger_texture: None,
            pending_firmware: None,
            enroll_id: String::new(),
            identify_result: String::new(),
            template_ids: Vec::new(),
            roster: RosterView::default(),
            filter: String::new(),
            photos: HashMap::new(),
            min_var_track: 0,
            automatic_threshold: true,
            threshold_text: "0".to_string(),
            buzzer: true,
        };
        app.apply_config(DeviceSettings::factory_defaults());
        app
    }

    fn send(&mut self, command: Command) {
        dispatch_backend_command(&self.cmd_tx, &mut self.in_flight, command, &mut self.status);
    }

    fn any_busy(&self, operations: &[Operation]) -> bool {
        operations.iter().any(|op| self.in_flight.is_busy(*op))
    }

    fn log_mut(&mut self, view: View) -> &mut OperatorLog {
        self.logs.entry(view).or_default()
    }

    fn navigate(&mut self, requested: View) {
        match guard_navigation(self.authenticated, requested) {
            Navigation::Allowed(view) => {
                if view == self.view {
                    return;
                }
                self.view = view;
                if let Some(command) = entry_command(view) {
                    self.send(command);
                }
            }
            Navigation::Redirected { to, warning } => {
                self.view = to;
                self.access_warning = Some(warning);
            }
        }
    }

    fn apply_config(&mut self, settings: DeviceSettings) {
        self.min_var_track = settings.min_var.track();
        self.automatic_threshold = settings.threshold.is_automatic();
        self.threshold_text = settings.threshold.value().to_string();
        self.buzzer = settings.buzzer;
    }

    fn process_ui_events(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.ui_rx.try_recv() {
            let event = match event {
                UiEvent::Core(event) => event,
                UiEvent::StartupFailed(message) => {
                    tracing::error!("{message}");
                    self.status = message.clone();
                    self.startup_error = Some(message);
                    continue;
                }
            };
            match event {
                Event::Log { view, line } => self.log_mut(view).push(&line),
                Event::ClearLog(view) => self.log_mut(view).clear(),
                Event::LoggedIn => {
                    self.authenticated = true;
                    self.login_failed = false;
                    self.status = "Signed in".to_string();
                    self.navigate(View::Identification);
                }
                Event::Roster(view) => self.roster = view,
                Event::DeviceInfo(info) => self.device_info = Some(info),
                Event::Image(image) => {
                    self.finger_texture = image.as_ref().and_then(finger_color_image).map(|img| {
                        ctx.load_texture("finger-capture", img, egui::TextureOptions::LINEAR)
                    });
                }
                Event::Identified(found) => {
                    self.identify_result = match found {
                        Some(found) => found.id.to_string(),
                        None => "X".to_string(),
                    };
                }
                Event::TemplateIds(ids) => self.template_ids = ids,
                Event::Config(settings) => self.apply_config(settings),
                Event::Failed {
                    operation,
                    message,
                    requires_reauth,
                } => {
                    if operation == Some(Operation::Login) {
                        self.login_failed = true;
                    }
                    self.status = if requires_reauth {
                        format!("{message} Sign in again.")
                    } else {
                        message
                    };
                }
                Event::Finished(operation) => {
                    self.in_flight.finish(operation);
                    if matches!(operation, Operation::LoadRoster | Operation::Enroll) {
                        self.photos.clear();
                    }
                }
            }
        }
    }

    fn show_tabs(&mut self, ui: &mut egui::Ui) {
        let mut requested = None;
        ui.horizontal(|ui| {
            for view in View::ALL {
                let title = if view.is_protected() && !self.authenticated {
                    format!("{} 🔒", view.title())
                } else {
                    view.title().to_string()
                };
                if ui.selectable_label(self.view == view, title).clicked() {
                    requested = Some(view);
                }
            }
        });
        if let Some(view) = requested {
            self.navigate(view);
        }
    }

    fn show_log(&self, ui: &mut egui::Ui, view: View) {
        ui.separator();
        egui::ScrollArea::vertical()
            .id_salt(("operator_log", view.title()))
            .max_height(LOG_HEIGHT)
            .stick_to_bottom(true)
            .auto_shrink([false, true])
            .show(ui, |ui| {
                if let Some(log) = self.logs.get(&view) {
                    for line in log.lines() {
                        ui.monospace(line);
                    }
                }
            });
    }

    fn show_login(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.set_max_width(320.0);
            ui.heading("Sign in");
            ui.add_space(8.0);
            ui.label("Username");
            ui.add(egui::TextEdit::singleline(&mut self.username).id_salt("login_username"));
            ui.label("Password");
            let password = ui.add(
                egui::TextEdit::singleline(&mut self.password)
                    .id_salt("login_password")
                    .password(true),
            );
            let submitted =
                password.lost_focus() && ui.input(|input| input.key_pressed(egui::Key::Enter));

            let idle = !self.in_flight.is_busy(Operation::Login);
            let clicked = ui.add_enabled(idle, egui::Button::new("Sign in")).clicked();
            if idle && (clicked || submitted) {
                self.login_failed = false;
                let command = Command::Login {
                    username: self.username.trim().to_string(),
                    password: self.password.clone(),
                };
                self.send(command);
            }

            if let Some(line) = self.logs.get(&View::Login).and_then(OperatorLog::last) {
                let color = if self.login_failed {
                    egui::Color32::from_rgb(220, 70, 70)
                } else if self.authenticated {
                    egui::Color32::from_rgb(35, 165, 90)
                } else {
                    ui.visuals().text_color()
                };
                ui.label(egui::RichText::new(line).color(color));
            }
        });
    }

    fn show_capture(&mut self, ui: &mut egui::Ui) {
        let idle = !self.any_busy(&CAPTURE_OPERATIONS);
        ui.horizontal(|ui| {
            if ui.add_enabled(idle, egui::Button::new("Check device")).clicked() {
                self.send(Command::DeviceInfo);
            }
            if ui.add_enabled(idle, egui::Button::new("Capture")).clicked() {
                self.send(Command::CaptureImage);
            }
            if ui
                .add_enabled(idle, egui::Button::new("Update firmware…"))
                .clicked()
            {
                self.pending_firmware = rfd::FileDialog::new()
                    .set_title("Select firmware file")
                    .pick_file();
            }
        });

        egui::Grid::new("device_info_grid")
            .num_columns(2)
            .spacing([12.0, 4.0])
            .show(ui, |ui| {
                let info = self.device_info.as_ref();
                ui.label("Serial");
                ui.monospace(info.map(|i| i.serial_number.as_str()).unwrap_or("-"));
                ui.end_row();
                ui.label("Model");
                ui.monospace(info.map(|i| i.model.as_str()).unwrap_or("-"));
                ui.end_row();
                ui.label("Version");
                ui.monospace(info.map(|i| i.version.as_str()).unwrap_or("-"));
                ui.end_row();
            });

        ui.add_space(8.0);
        match &self.finger_texture {
            Some(texture) => {
                ui.add(egui::Image::new((texture.id(), texture.size_vec2())));
            }
            None => {
                ui.weak("No image captured");
            }
        }
        self.show_log(ui, View::Capture);
    }

    fn show_firmware_confirmation(&mut self, ctx: &egui::Context) {
        let Some(path) = self.pending_firmware.clone() else {
            return;
        };
        egui::Window::new("Confirm Update")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(format!(
                    "Are you sure you want to update the reader with the file: {}",
                    path.display()
                ));
                ui.horizontal(|ui| {
                    if ui.button("Yes").clicked() {
                        self.pending_firmware = None;
                        self.send(Command::UpdateFirmware(path.clone()));
                    }
                    if ui.button("No").clicked() {
                        self.pending_firmware = None;
                    }
                });
            });
    }

    fn show_access_warning(&mut self, ctx: &egui::Context) {
        let Some(warning) = self.access_warning else {
            return;
        };
        egui::Window::new("Access denied")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(warning);
                if ui.button("OK").clicked() {
                    self.access_warning = None;
                }
            });
    }

    fn show_identification(&mut self, ui: &mut egui::Ui) {
        ui.columns(2, |columns| {
            self.show_reader_templates(&mut columns[0]);
            self.show_roster(&mut columns[1]);
        });
        self.show_log(ui, View::Identification);
    }

    fn show_reader_templates(&mut self, ui: &mut egui::Ui) {
        let idle = !self.any_busy(&IDENTIFY_OPERATIONS);
        ui.heading("Reader templates");
        ui.horizontal(|ui| {
            ui.label("ID");
            ui.add(egui::TextEdit::singleline(&mut self.enroll_id).desired_width(80.0));
            if ui.add_enabled(idle, egui::Button::new("Enroll")).clicked() {
                let raw_id = self.enroll_id.clone();
                self.send(Command::EnrollOnDevice { raw_id });
            }
        });
        ui.horizontal(|ui| {
            if ui.add_enabled(idle, egui::Button::new("Identify")).clicked() {
                self.send(Command::Identify);
            }
            ui.add_enabled(
                false,
                egui::TextEdit::singleline(&mut self.identify_result).desired_width(80.0),
            );
        });
        ui.horizontal(|ui| {
            if ui.add_enabled(idle, egui::Button::new("Read all")).clicked() {
                self.send(Command::LoadTemplateIds);
            }
            if ui.add_enabled(idle, egui::Button::new("Delete all")).clicked() {
                self.send(Command::DeleteAllTemplates);
            }
        });
        egui::ScrollArea::vertical()
            .id_salt("template_ids")
            .max_height(200.0)
            .show(ui, |ui| {
                for id in &self.template_ids {
                    ui.monospace(id.to_string());
                }
            });
    }

    fn show_roster(&mut self, ui: &mut egui::Ui) {
        let idle = !self.any_busy(&IDENTIFY_OPERATIONS);
        ui.heading("Employees");
        ui.horizontal(|ui| {
            if ui.add_enabled(idle, egui::Button::new("Load list")).clicked() {
                self.send(Command::LoadRoster);
            }
            ui.label("Filter");
            if ui.text_edit_singleline(&mut self.filter).changed() {
                let filter = self.filter.clone();
                self.send(Command::FilterRoster(filter));
            }
        });
        let can_enroll = idle && self.roster.selected.is_some();
        if ui
            .add_enabled(can_enroll, egui::Button::new("Register biometry"))
            .clicked()
        {
            self.send(Command::Enroll);
        }
        ui.small(format!(
            "{} of {} employees",
            self.roster.rows.len(),
            self.roster.total
        ));

        let mut clicked = None;
        egui::ScrollArea::vertical()
            .id_salt("employee_cards")
            .max_height(360.0)
            .show(ui, |ui| {
                let ctx = ui.ctx().clone();
                for employee in &self.roster.rows {
                    let selected = self.roster.selected == Some(employee.id);
                    let photo = photo_texture(&mut self.photos, &ctx, employee);
                    if employee_card(ui, employee, photo.as_ref(), selected) {
                        clicked = Some(employee.id);
                    }
                }
            });
        if let Some(id) = clicked {
            self.send(Command::SelectEmployee(id));
        }
    }

    fn show_configuration(&mut self, ui: &mut egui::Ui) {
        let idle = !self.any_busy(&CONFIG_OPERATIONS);
        ui.heading("Reader configuration");
        ui.add_enabled_ui(idle, |ui| {
            let slider = ui.add(
                egui::Slider::new(&mut self.min_var_track, 0..=MAX_MIN_VAR_TRACK).text("Min Var"),
            );
            if slider.drag_stopped() || (slider.changed() && !slider.dragged()) {
                self.send(Command::SetMinVarTrack(self.min_var_track));
            }

            ui.horizontal(|ui| {
                if ui
                    .checkbox(&mut self.automatic_threshold, "Automatic threshold")
                    .changed()
                {
                    self.threshold_text = SimilarityThreshold::with_automatic(self.automatic_threshold)
                        .value()
                        .to_string();
                    self.send(Command::SetAutomaticThreshold(self.automatic_threshold));
                }
                let field = ui.add_enabled(
                    !self.automatic_threshold,
                    egui::TextEdit::singleline(&mut self.threshold_text).desired_width(80.0),
                );
                if field.lost_focus() {
                    let raw = self.threshold_text.clone();
                    self.send(Command::SetThreshold(raw));
                }
            });

            if ui.checkbox(&mut self.buzzer, "Buzzer").changed() {
                self.send(Command::SetBuzzer(self.buzzer));
            }
            if ui.button("Default").clicked() {
                self.send(Command::RestoreDefaults);
            }
        });
        self.show_log(ui, View::Configuration);
    }
}

impl eframe::App for BiometriaApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events(ctx);

        egui::TopBottomPanel::top("tabs").show(ctx, |ui| self.show_tabs(ui));
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            let text = egui::RichText::new(&self.status);
            if self.startup_error.is_some() {
                ui.label(text.color(egui::Color32::from_rgb(220, 70, 70)));
            } else {
                ui.label(text.weak());
            }
        });
        egui::CentralPanel::default().show(ctx, |ui| match self.view {
            View::Login => self.show_login(ui),
            View::Capture => self.show_capture(ui),
            View::Identification => self.show_identification(ui),
            View::Configuration => self.show_configuration(ui),
        });

        self.show_firmware_confirmation(ctx);
        self.show_access_warning(ctx);

        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }
}

/// Cached per employee; `None` marks a photo that failed to decode.
fn photo_texture(
    cache: &mut HashMap<EmployeeId, Option<TextureHandle>>,
    ctx: &egui::Context,
    employee: &Employee,
) -> Option<TextureHandle> {
    cache
        .entry(employee.id)
        .or_insert_with(|| {
            employee.photo.as_deref().and_then(decode_photo).map(|img| {
                ctx.load_texture(
                    format!("employee-photo:{}", employee.id),
                    img,
                    egui::TextureOptions::LINEAR,
                )
            })
        })
        .clone()
}

/// Returns true when the card was clicked.
fn employee_card(
    ui: &mut egui::Ui,
    employee: &Employee,
    photo: Option<&TextureHandle>,
    selected: bool,
) -> bool {
    let fill = if selected {
        ui.visuals().selection.bg_fill
    } else {
        ui.visuals().faint_bg_color
    };
    let frame = egui::Frame::group(ui.style()).fill(fill).show(ui, |ui| {
        ui.set_width(ui.available_width());
        ui.horizontal(|ui| {
            match photo {
                Some(texture) => {
                    ui.add(
                        egui::Image::new((texture.id(), texture.size_vec2()))
                            .fit_to_exact_size(egui::vec2(PHOTO_SIZE, PHOTO_SIZE)),
                    );
                }
                None => {
                    let (rect, _) = ui.allocate_exact_size(
                        egui::vec2(PHOTO_SIZE, PHOTO_SIZE),
                        egui::Sense::hover(),
                    );
                    ui.painter()
                        .rect_filled(rect, 4.0, ui.visuals().widgets.inactive.bg_fill);
                    ui.painter().text(
                        rect.center(),
                        egui::Align2::CENTER_CENTER,
                        "?",
                        egui::FontId::proportional(24.0),
                        ui.visuals().weak_text_color(),
                    );
                }
            }
            ui.vertical(|ui| {
                ui.label(egui::RichText::new(&employee.name).strong());
                ui.small(format!("Time card: {}", employee.time_card));
                ui.small(format!("Role: {}", employee.role));
                ui.small(format!("Department: {}", employee.department));
                let (label, color) = if employee.active {
                    ("Active", egui::Color32::from_rgb(35, 165, 90))
                } else {
                    ("Inactive", egui::Color32::from_rgb(220, 70, 70))
                };
                ui.small(egui::RichText::new(label).color(color));
            });
        });
    });
    frame.response.interact(egui::Sense::click()).clicked()
}

/// Downscaled RGBA image for an employee card, or `None` for bytes that do
/// not decode as an image.
pub fn decode_photo(bytes: &[u8]) -> Option<egui::ColorImage> {
    let decoded = image::load_from_memory(bytes).ok()?;
    let (width, height) = decoded.dimensions();
    let longest = width.max(height).max(1) as f32;
    let scale = (PHOTO_SIZE * 2.0 / longest).min(1.0);
    let resized = if scale < 1.0 {
        decoded.resize(
            (width as f32 * scale).max(1.0) as u32,
            (height as f32 * scale).max(1.0) as u32,
            image::imageops::FilterType::Triangle,
        )
    } else {
        decoded
    };
    let rgba = resized.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Some(egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}

pub fn finger_color_image(image: &FingerImage) -> Option<egui::ColorImage> {
    if !image.is_complete() || image.width == 0 || image.height == 0 {
        return None;
    }
    Some(egui::ColorImage::from_gray(
        [image.width as usize, image.height as usize],
        &image.pixels,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::io::Cursor;

    #[test]
    fn configuration_stays_locked_until_the_pending_save_finishes() {
        let (cmd_tx, cmd_rx) = bounded(8);
        let (ui_tx, ui_rx) = bounded(8);
        let mut app = BiometriaApp::new(cmd_tx, ui_rx);
        assert!(!app.any_busy(&CONFIG_OPERATIONS));

        app.send(Command::SetBuzzer(false));
        assert!(app.any_busy(&CONFIG_OPERATIONS));

        // A second edit while locked would be rejected by the busy guard.
        app.send(Command::SetMinVarTrack(4));
        assert_eq!(cmd_rx.len(), 1);

        ui_tx
            .send(UiEvent::Core(Event::Finished(Operation::SaveConfig)))
            .expect("queue finished");
        app.process_ui_events(&egui::Context::default());
        assert!(!app.any_busy(&CONFIG_OPERATIONS));
    }

    #[test]
    fn log_lines_are_timestamped_and_clearable() {
        let mut log = OperatorLog::default();
        log.push("Capture Success");

        let line = log.last().expect("line");
        assert!(line.starts_with('['));
        assert!(line.ends_with("] Capture Success"));

        log.clear();
        assert!(log.lines().is_empty());
    }

    #[test]
    fn undecodable_photo_falls_back_to_placeholder() {
        assert!(decode_photo(b"definitely not an image").is_none());
        assert!(decode_photo(&[]).is_none());
    }

    #[test]
    fn large_photos_are_downscaled() {
        let source = image::RgbaImage::from_pixel(640, 320, image::Rgba([10, 20, 30, 255]));
        let mut png = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(source)
            .write_to(&mut png, image::ImageFormat::Png)
            .expect("encode png");

        let decoded = decode_photo(png.get_ref()).expect("decodes");
        assert_eq!(decoded.size, [128, 64]);
    }

    #[test]
    fn truncated_frames_are_not_rendered() {
        let frame = FingerImage {
            pixels: vec![0; 5],
            width: 2,
            height: 3,
        };
        assert!(finger_color_image(&frame).is_none());

        let complete = FingerImage {
            pixels: vec![128; 6],
            width: 2,
            height: 3,
        };
        assert_eq!(finger_color_image(&complete).map(|img| img.size), Some([2, 3]));
    }
}
