use std::{
    collections::{BTreeMap, VecDeque},
    path::Path,
    sync::{Mutex, MutexGuard},
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, info};

use crate::{
    CapturedSample, ConfigParam, DeviceGateway, DeviceInfo, DeviceResult, FingerImage,
    Identification, Reply, RetCode,
};

/// Codes produced by [`SimulatedReader`].
pub mod codes {
    use crate::RetCode;

    pub const ALREADY_INITIALIZED: RetCode = RetCode(1);
    pub const LOW_QUALITY: RetCode = RetCode(2);
    pub const UNKNOWN: RetCode = RetCode(-1);
    pub const NOT_INITIALIZED: RetCode = RetCode(-2);
    pub const CAPTURE_TIMEOUT: RetCode = RetCode(-3);
    pub const INVALID_PARAMETER: RetCode = RetCode(-4);
    pub const INVALID_ID: RetCode = RetCode(-5);
    pub const ID_ALREADY_EXISTS: RetCode = RetCode(-6);
    pub const NOT_IDENTIFIED: RetCode = RetCode(-7);
    pub const MERGE_FAILED: RetCode = RetCode(-8);
    pub const INVALID_FILE: RetCode = RetCode(-9);
}

const IMAGE_WIDTH: u32 = 96;
const IMAGE_HEIGHT: u32 = 128;
const LOW_QUALITY_THRESHOLD: i32 = 40;

struct ReaderState {
    initialized: bool,
    params: BTreeMap<ConfigParam, String>,
    enrolled: BTreeMap<i64, u8>,
    finger: u8,
    captures: u32,
    firmware_revision: u32,
    injected: VecDeque<RetCode>,
}

impl ReaderState {
    fn new() -> Self {
        let params = BTreeMap::from([
            (ConfigParam::MinVar, "1000".to_string()),
            (ConfigParam::SimilarityThreshold, "0".to_string()),
            (ConfigParam::BuzzerOn, "1".to_string()),
            (ConfigParam::TemplateFormat, "0".to_string()),
        ]);
        Self {
            initialized: false,
            params,
            enrolled: BTreeMap::new(),
            finger: 1,
            captures: 0,
            firmware_revision: 0,
            injected: VecDeque::new(),
        }
    }
}

/// In-process stand-in for a physical reader.
///
/// Templates are deterministic base64 strings derived from the finger
/// currently "on the glass" (see [`SimulatedReader::place_finger`]), so
/// identification after enrollment round-trips.
pub struct SimulatedReader {
    state: Mutex<ReaderState>,
}

impl Default for SimulatedReader {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedReader {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ReaderState::new()),
        }
    }

    /// Chooses which finger subsequent captures read.
    pub fn place_finger(&self, finger: u8) {
        self.lock().finger = finger;
    }

    /// Makes the next finger operation return `code` instead of reading.
    pub fn inject(&self, code: RetCode) {
        self.lock().injected.push_back(code);
    }

    fn lock(&self) -> MutexGuard<'_, ReaderState> {
        // A poisoned simulator is still internally consistent: every mutation
        // is a single assignment.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ready(&self) -> Result<MutexGuard<'_, ReaderState>, crate::DeviceFault> {
        let state = self.lock();
        if !state.initialized {
            return Err(self.fault(codes::NOT_INITIALIZED));
        }
        Ok(state)
    }

    fn fault(&self, code: RetCode) -> crate::DeviceFault {
        crate::DeviceFault {
            code,
            message: self.error_message(code),
        }
    }

    /// Consumes an injected code, if any. Injected warnings let the read go on.
    fn take_injected(&self, state: &mut ReaderState) -> Result<RetCode, crate::DeviceFault> {
        match state.injected.pop_front() {
            Some(code) => code.check(|code| self.error_message(code)),
            None => Ok(RetCode::SUCCESS),
        }
    }

    fn read_finger(state: &mut ReaderState) -> (u8, u32, i32) {
        state.captures = state.captures.wrapping_add(1);
        let quality = 35 + ((state.captures * 17 + u32::from(state.finger) * 11) % 60) as i32;
        (state.finger, state.captures, quality)
    }

    fn synthetic_image(finger: u8, capture: u32) -> FingerImage {
        let mut pixels = Vec::with_capacity((IMAGE_WIDTH * IMAGE_HEIGHT) as usize);
        let cx = IMAGE_WIDTH as i64 / 2;
        let cy = IMAGE_HEIGHT as i64 / 2;
        for y in 0..IMAGE_HEIGHT as i64 {
            for x in 0..IMAGE_WIDTH as i64 {
                let r2 = (x - cx).pow(2) + (y - cy).pow(2);
                let ridge = (r2 / (12 + i64::from(finger))) + i64::from(capture % 3);
                pixels.push(if ridge % 2 == 0 { 40 } else { 215 });
            }
        }
        FingerImage {
            pixels,
            width: IMAGE_WIDTH,
            height: IMAGE_HEIGHT,
        }
    }

    fn template_for(finger: u8, capture: u32) -> String {
        STANDARD.encode(format!("SIMTPL;finger={finger};capture={capture}"))
    }

    fn finger_of(template: &str) -> Option<u8> {
        let decoded = STANDARD.decode(template).ok()?;
        let text = String::from_utf8(decoded).ok()?;
        text.split(';')
            .find_map(|part| part.strip_prefix("finger="))
            .and_then(|value| value.parse().ok())
    }

    fn quality_code(quality: i32) -> RetCode {
        if quality < LOW_QUALITY_THRESHOLD {
            codes::LOW_QUALITY
        } else {
            RetCode::SUCCESS
        }
    }

    fn validate_parameter(param: ConfigParam, value: &str) -> bool {
        match param {
            ConfigParam::BuzzerOn => matches!(value, "0" | "1"),
            ConfigParam::MinVar | ConfigParam::SimilarityThreshold | ConfigParam::TemplateFormat => {
                value.parse::<u32>().is_ok()
            }
        }
    }
}

impl DeviceGateway for SimulatedReader {
    fn init(&self) -> DeviceResult<()> {
        let mut state = self.lock();
        if state.initialized {
            return Ok(Reply::with_code((), codes::ALREADY_INITIALIZED));
        }
        state.initialized = true;
        info!("simulated reader initialized");
        Ok(Reply::ok(()))
    }

    fn terminate(&self) -> DeviceResult<()> {
        let mut state = self.lock();
        state.initialized = false;
        debug!("simulated reader terminated");
        Ok(Reply::ok(()))
    }

    fn device_info(&self) -> DeviceResult<DeviceInfo> {
        let state = self.ready()?;
        Ok(Reply::ok(DeviceInfo {
            version: format!("sim-1.{}.0", state.firmware_revision),
            serial_number: "SIM-0000001".to_string(),
            model: "Simulated optical reader".to_string(),
        }))
    }

    fn capture_image(&self) -> DeviceResult<FingerImage> {
        let mut state = self.ready()?;
        let code = self.take_injected(&mut state)?;
        let (finger, capture, _) = Self::read_finger(&mut state);
        Ok(Reply::with_code(Self::synthetic_image(finger, capture), code))
    }

    fn capture_image_and_template(&self) -> DeviceResult<CapturedSample> {
        let mut state = self.ready()?;
        let injected = self.take_injected(&mut state)?;
        let (finger, capture, quality) = Self::read_finger(&mut state);
        let code = if injected == RetCode::SUCCESS {
            Self::quality_code(quality)
        } else {
            injected
        };
        debug!(finger, capture, quality, "simulated capture");
        Ok(Reply::with_code(
            CapturedSample {
                template: Self::template_for(finger, capture),
                image: Self::synthetic_image(finger, capture),
                quality,
            },
            code,
        ))
    }

    fn merge_templates(&self, first: &str, second: &str, third: &str) -> DeviceResult<String> {
        let _state = self.ready()?;
        let fingers = [first, second, third].map(Self::finger_of);
        let Some(finger) = fingers[0] else {
            return Err(self.fault(codes::MERGE_FAILED));
        };
        if fingers.iter().any(|other| *other != Some(finger)) {
            return Err(self.fault(codes::MERGE_FAILED));
        }
        let merged = STANDARD.encode(format!("SIMTPL;finger={finger};merged=3"));
        Ok(Reply::ok(merged))
    }

    fn capture_and_enroll(&self, id: i64) -> DeviceResult<()> {
        let mut state = self.ready()?;
        if id <= 0 {
            return Err(self.fault(codes::INVALID_ID));
        }
        if state.enrolled.contains_key(&id) {
            return Err(self.fault(codes::ID_ALREADY_EXISTS));
        }
        let code = self.take_injected(&mut state)?;
        for _ in 0..3 {
            Self::read_finger(&mut state);
        }
        let finger = state.finger;
        state.enrolled.insert(id, finger);
        info!(id, finger, "simulated enrollment stored");
        Ok(Reply::with_code((), code))
    }

    fn capture_and_identify(&self) -> DeviceResult<Identification> {
        let mut state = self.ready()?;
        let code = self.take_injected(&mut state)?;
        let (finger, _, quality) = Self::read_finger(&mut state);
        let matched = state
            .enrolled
            .iter()
            .find_map(|(id, enrolled)| (*enrolled == finger).then_some(*id));
        match matched {
            Some(id) => Ok(Reply::with_code(
                Identification {
                    id,
                    score: 9000 + quality * 10,
                    quality,
                },
                code,
            )),
            None => Err(self.fault(codes::NOT_IDENTIFIED)),
        }
    }

    fn template_ids(&self) -> DeviceResult<Vec<i64>> {
        let state = self.ready()?;
        Ok(Reply::ok(state.enrolled.keys().copied().collect()))
    }

    fn delete_all_templates(&self) -> DeviceResult<()> {
        let mut state = self.ready()?;
        state.enrolled.clear();
        Ok(Reply::ok(()))
    }

    fn get_parameter(&self, param: ConfigParam) -> DeviceResult<String> {
        let state = self.ready()?;
        state
            .params
            .get(&param)
            .cloned()
            .map(Reply::ok)
            .ok_or_else(|| self.fault(codes::INVALID_PARAMETER))
    }

    fn set_parameter(&self, param: ConfigParam, value: &str) -> DeviceResult<()> {
        let mut state = self.ready()?;
        if !Self::validate_parameter(param, value) {
            return Err(self.fault(codes::INVALID_PARAMETER));
        }
        state.params.insert(param, value.to_string());
        debug!(key = param.key(), value, "simulated parameter stored");
        Ok(Reply::ok(()))
    }

    fn update_firmware(&self, path: &Path) -> DeviceResult<()> {
        let mut state = self.ready()?;
        if !path.is_file() {
            return Err(self.fault(codes::INVALID_FILE));
        }
        state.firmware_revision += 1;
        info!(path = %path.display(), revision = state.firmware_revision, "simulated firmware update");
        Ok(Reply::ok(()))
    }

    fn error_message(&self, code: RetCode) -> String {
        match code {
            RetCode::SUCCESS => "Success".to_string(),
            codes::ALREADY_INITIALIZED => "Reader already initialized".to_string(),
            codes::LOW_QUALITY => "Low image quality".to_string(),
            codes::UNKNOWN => "Unknown reader failure".to_string(),
            codes::NOT_INITIALIZED => "Reader not initialized".to_string(),
            codes::CAPTURE_TIMEOUT => "Timed out waiting for a finger".to_string(),
            codes::INVALID_PARAMETER => "Invalid parameter".to_string(),
            codes::INVALID_ID => "Invalid template id".to_string(),
            codes::ID_ALREADY_EXISTS => "Template id already enrolled".to_string(),
            codes::NOT_IDENTIFIED => "Finger not identified".to_string(),
            codes::MERGE_FAILED => "Templates could not be merged".to_string(),
            codes::INVALID_FILE => "Invalid firmware file".to_string(),
            other => format!("Unknown error ({other})"),
        }
    }
}
