//! Typed view over the reader's string parameters.
//!
//! Each parameter is read and written independently; one failing parameter
//! never prevents the others from loading or saving.

use std::sync::Arc;

use fingerprint_device::{ConfigParam, DeviceGateway};
use tracing::{info, warn};

use crate::{
    device_ops::run_device,
    error::{DeviceConfigError, InvalidInput},
};

/// Device units per position of the Min Var slider.
pub const MIN_VAR_STEP: u32 = 500;
/// Threshold written when the operator leaves automatic mode.
pub const MANUAL_THRESHOLD_DEFAULT: u32 = 12300;
pub const FACTORY_MIN_VAR_TRACK: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinVar {
    track: u32,
}

impl MinVar {
    pub fn from_track(track: u32) -> Self {
        Self { track }
    }

    /// Integer division: values between steps snap down.
    pub fn from_device(value: u32) -> Self {
        Self {
            track: value / MIN_VAR_STEP,
        }
    }

    pub fn track(self) -> u32 {
        self.track
    }

    pub fn device_value(self) -> u32 {
        self.track.saturating_mul(MIN_VAR_STEP)
    }

    pub fn to_wire(self) -> String {
        self.device_value().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityThreshold {
    Automatic,
    Fixed(u32),
}

impl SimilarityThreshold {
    pub fn from_value(value: u32) -> Self {
        if value == 0 {
            SimilarityThreshold::Automatic
        } else {
            SimilarityThreshold::Fixed(value)
        }
    }

    /// Parses operator or device text. `"0"` means automatic.
    pub fn parse(raw: &str) -> Result<Self, InvalidInput> {
        raw.trim()
            .parse::<u32>()
            .map(Self::from_value)
            .map_err(|_| InvalidInput(format!("similarity threshold '{}'", raw.trim())))
    }

    /// State after the "automatic" checkbox changes.
    pub fn with_automatic(automatic: bool) -> Self {
        if automatic {
            SimilarityThreshold::Automatic
        } else {
            SimilarityThreshold::Fixed(MANUAL_THRESHOLD_DEFAULT)
        }
    }

    pub fn is_automatic(self) -> bool {
        self == SimilarityThreshold::Automatic
    }

    pub fn value(self) -> u32 {
        match self {
            SimilarityThreshold::Automatic => 0,
            SimilarityThreshold::Fixed(value) => value,
        }
    }

    pub fn to_wire(self) -> String {
        self.value().to_string()
    }
}

pub fn buzzer_from_wire(raw: &str) -> bool {
    raw.trim() == "1"
}

pub fn buzzer_to_wire(on: bool) -> &'static str {
    if on {
        "1"
    } else {
        "0"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSettings {
    pub min_var: MinVar,
    pub threshold: SimilarityThreshold,
    pub buzzer: bool,
}

impl DeviceSettings {
    pub fn factory_defaults() -> Self {
        Self {
            min_var: MinVar::from_track(FACTORY_MIN_VAR_TRACK),
            threshold: SimilarityThreshold::Automatic,
            buzzer: true,
        }
    }

    /// Parameters in the order they are written to the reader.
    pub fn wire_values(&self) -> [(ConfigParam, String); 3] {
        [
            (ConfigParam::MinVar, self.min_var.to_wire()),
            (ConfigParam::SimilarityThreshold, self.threshold.to_wire()),
            (ConfigParam::BuzzerOn, buzzer_to_wire(self.buzzer).to_string()),
        ]
    }
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self::factory_defaults()
    }
}

/// Whatever could be read; a `None` field has a matching entry in `errors`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedSettings {
    pub min_var: Option<MinVar>,
    pub threshold: Option<SimilarityThreshold>,
    pub buzzer: Option<bool>,
    pub errors: Vec<DeviceConfigError>,
}

impl LoadedSettings {
    /// Overlays the loaded values on `base`, keeping `base` where loading
    /// failed.
    pub fn merged_over(&self, base: DeviceSettings) -> DeviceSettings {
        DeviceSettings {
            min_var: self.min_var.unwrap_or(base.min_var),
            threshold: self.threshold.unwrap_or(base.threshold),
            buzzer: self.buzzer.unwrap_or(base.buzzer),
        }
    }
}

async fn get(device: &Arc<dyn DeviceGateway>, param: ConfigParam) -> Result<String, DeviceConfigError> {
    run_device(device, move |d| d.get_parameter(param))
        .await
        .map(|outcome| outcome.value)
        .map_err(|fault| DeviceConfigError::Get {
            parameter: param,
            message: fault.message,
        })
}

fn unexpected(param: ConfigParam, raw: &str) -> DeviceConfigError {
    DeviceConfigError::Get {
        parameter: param,
        message: format!("unexpected value '{raw}'"),
    }
}

pub async fn load_all(device: &Arc<dyn DeviceGateway>) -> LoadedSettings {
    let mut loaded = LoadedSettings::default();

    match get(device, ConfigParam::MinVar).await {
        Ok(raw) => match raw.trim().parse::<u32>() {
            Ok(value) => loaded.min_var = Some(MinVar::from_device(value)),
            Err(_) => loaded.errors.push(unexpected(ConfigParam::MinVar, &raw)),
        },
        Err(err) => loaded.errors.push(err),
    }

    match get(device, ConfigParam::SimilarityThreshold).await {
        Ok(raw) => match SimilarityThreshold::parse(&raw) {
            Ok(threshold) => loaded.threshold = Some(threshold),
            Err(_) => loaded
                .errors
                .push(unexpected(ConfigParam::SimilarityThreshold, &raw)),
        },
        Err(err) => loaded.errors.push(err),
    }

    match get(device, ConfigParam::BuzzerOn).await {
        Ok(raw) => loaded.buzzer = Some(buzzer_from_wire(&raw)),
        Err(err) => loaded.errors.push(err),
    }

    for err in &loaded.errors {
        warn!(parameter = err.parameter().key(), "{err}");
    }
    loaded
}

pub async fn save(
    device: &Arc<dyn DeviceGateway>,
    param: ConfigParam,
    value: &str,
) -> Result<(), DeviceConfigError> {
    let owned = value.to_string();
    match run_device(device, move |d| d.set_parameter(param, &owned)).await {
        Ok(_) => {
            info!(parameter = param.key(), value, "parameter saved");
            Ok(())
        }
        Err(fault) => {
            let err = DeviceConfigError::Set {
                parameter: param,
                value: value.to_string(),
                message: fault.message,
            };
            warn!(parameter = param.key(), "{err}");
            Err(err)
        }
    }
}

/// Writes every parameter, continuing past failures. One result per
/// parameter, in write order.
pub async fn save_all(
    device: &Arc<dyn DeviceGateway>,
    settings: &DeviceSettings,
) -> Vec<(ConfigParam, Result<(), DeviceConfigError>)> {
    let mut results = Vec::with_capacity(3);
    for (param, value) in settings.wire_values() {
        let result = save(device, param, &value).await;
        results.push((param, result));
    }
    results
}

pub async fn restore_defaults(
    device: &Arc<dyn DeviceGateway>,
) -> Vec<(ConfigParam, Result<(), DeviceConfigError>)> {
    save_all(device, &DeviceSettings::factory_defaults()).await
}

#[cfg(test)]
#[path = "tests/device_config_tests.rs"]
mod tests;
