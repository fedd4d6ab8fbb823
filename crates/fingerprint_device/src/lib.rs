//! Capability boundary around a fingerprint reader.
//!
//! Every call is blocking. Results keep the reader's three-way code semantics:
//! negative codes are errors, zero is success and positive codes are warnings
//! that still carry a usable value.

use std::{fmt, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod simulated;

pub use simulated::{codes, SimulatedReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RetCode(pub i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetStatus {
    Error,
    Success,
    Warning,
}

impl RetCode {
    pub const SUCCESS: RetCode = RetCode(0);
    /// Failure on the host side of the call (the reader never answered).
    pub const HOST_FAILURE: RetCode = RetCode(i32::MIN);

    pub fn status(self) -> RetStatus {
        match self.0.cmp(&Self::SUCCESS.0) {
            std::cmp::Ordering::Less => RetStatus::Error,
            std::cmp::Ordering::Equal => RetStatus::Success,
            std::cmp::Ordering::Greater => RetStatus::Warning,
        }
    }

    pub fn is_error(self) -> bool {
        self.status() == RetStatus::Error
    }

    /// Splits a raw code into the fault path (below success) or the code to
    /// attach to a [`Reply`]. `lookup` is only consulted for errors.
    pub fn check(self, lookup: impl FnOnce(RetCode) -> String) -> Result<RetCode, DeviceFault> {
        if self.is_error() {
            Err(DeviceFault {
                code: self,
                message: lookup(self),
            })
        } else {
            Ok(self)
        }
    }
}

impl fmt::Display for RetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A successful (or warned) device call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply<T> {
    pub value: T,
    pub code: RetCode,
}

impl<T> Reply<T> {
    pub fn ok(value: T) -> Self {
        Self {
            value,
            code: RetCode::SUCCESS,
        }
    }

    pub fn with_code(value: T, code: RetCode) -> Self {
        Self { value, code }
    }

    pub fn warning(&self) -> Option<RetCode> {
        (self.code.status() == RetStatus::Warning).then_some(self.code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (code {code})")]
pub struct DeviceFault {
    pub code: RetCode,
    pub message: String,
}

pub type DeviceResult<T> = Result<Reply<T>, DeviceFault>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfigParam {
    MinVar,
    SimilarityThreshold,
    BuzzerOn,
    TemplateFormat,
}

impl ConfigParam {
    /// Key understood by the reader firmware.
    pub fn key(self) -> &'static str {
        match self {
            ConfigParam::MinVar => "MIN_VAR",
            ConfigParam::SimilarityThreshold => "SIMILIARITY_THRESHOLD",
            ConfigParam::BuzzerOn => "BUZZER_ON",
            ConfigParam::TemplateFormat => "TEMPLATE_FORMAT",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ConfigParam::MinVar => "Min Var",
            ConfigParam::SimilarityThreshold => "Similarity Threshold",
            ConfigParam::BuzzerOn => "Buzzer",
            ConfigParam::TemplateFormat => "Template Format",
        }
    }
}

impl fmt::Display for ConfigParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub version: String,
    pub serial_number: String,
    pub model: String,
}

/// 8-bit grayscale frame, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerImage {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl FingerImage {
    pub fn is_complete(&self) -> bool {
        self.pixels.len() == self.width as usize * self.height as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedSample {
    pub template: String,
    pub image: FingerImage,
    pub quality: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identification {
    pub id: i64,
    pub score: i32,
    pub quality: i32,
}

pub trait DeviceGateway: Send + Sync {
    fn init(&self) -> DeviceResult<()>;
    fn terminate(&self) -> DeviceResult<()>;
    fn device_info(&self) -> DeviceResult<DeviceInfo>;
    fn capture_image(&self) -> DeviceResult<FingerImage>;
    fn capture_image_and_template(&self) -> DeviceResult<CapturedSample>;
    fn merge_templates(&self, first: &str, second: &str, third: &str) -> DeviceResult<String>;
    fn capture_and_enroll(&self, id: i64) -> DeviceResult<()>;
    fn capture_and_identify(&self) -> DeviceResult<Identification>;
    fn template_ids(&self) -> DeviceResult<Vec<i64>>;
    fn delete_all_templates(&self) -> DeviceResult<()>;
    fn get_parameter(&self, param: ConfigParam) -> DeviceResult<String>;
    fn set_parameter(&self, param: ConfigParam, value: &str) -> DeviceResult<()>;
    fn update_firmware(&self, path: &Path) -> DeviceResult<()>;
    fn error_message(&self, code: RetCode) -> String;
}

#[cfg(test)]
#[path = "tests/simulated_tests.rs"]
mod tests;
