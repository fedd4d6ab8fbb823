//! Error taxonomy for every operator-triggered operation.
//!
//! All of these are recovered at the operation boundary and turned into a
//! status line via [`OperationError::operator_message`].

use fingerprint_device::{ConfigParam, DeviceFault, RetCode};
use shared::error::ApiError;
use thiserror::Error;

use crate::guard::Operation;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("login rejected: {0}")]
    InvalidCredentials(ApiError),
    #[error("malformed login response: {0}")]
    MalformedResponse(String),
    #[error("failed to connect to API: {0}")]
    ConnectionFailure(String),
    #[error("not authenticated")]
    NotAuthenticated,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("employee list request failed: {0}")]
    Status(ApiError),
    #[error("employee list could not be decoded: {0}")]
    Decode(String),
    #[error("employee list transport failure: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("{0}")]
    Status(ApiError),
    #[error("transport failure: {0}")]
    Transport(String),
}

impl SubmitError {
    pub fn status(&self) -> Option<u16> {
        match self {
            SubmitError::Status(err) => Some(err.status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnrollmentError {
    #[error("no employee selected")]
    NoEmployeeSelected,
    #[error("capture {sample_index} failed: {message}")]
    CaptureFailed { sample_index: u8, message: String },
    #[error("template merge failed: {0}")]
    MergeFailed(String),
    #[error("biometry submission failed: {0}")]
    SubmitFailed(#[from] SubmitError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceConfigError {
    #[error("Error getting parameter \"{}\": {message}", .parameter.label())]
    Get {
        parameter: ConfigParam,
        message: String,
    },
    #[error("Error setting parameter \"{}\" with value \"{value}\": {message}", .parameter.label())]
    Set {
        parameter: ConfigParam,
        value: String,
        message: String,
    },
}

impl DeviceConfigError {
    pub fn parameter(&self) -> ConfigParam {
        match self {
            DeviceConfigError::Get { parameter, .. } | DeviceConfigError::Set { parameter, .. } => {
                *parameter
            }
        }
    }
}

/// A device call that reported a code below success.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} error: {message}")]
pub struct DeviceError {
    pub operation: &'static str,
    pub code: RetCode,
    pub message: String,
}

impl DeviceError {
    pub fn from_fault(operation: &'static str, fault: DeviceFault) -> Self {
        Self {
            operation,
            code: fault.code,
            message: fault.message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid input: {0}")]
pub struct InvalidInput(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Enrollment(#[from] EnrollmentError),
    #[error(transparent)]
    DeviceConfig(#[from] DeviceConfigError),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),
    #[error("{0:?} is already running")]
    Busy(Operation),
}

impl OperationError {
    /// Status line shown to the operator. Underlying messages are kept so the
    /// operator can report them.
    pub fn operator_message(&self) -> String {
        match self {
            OperationError::Auth(AuthError::InvalidCredentials(_)) => {
                "Invalid username or password.".to_string()
            }
            OperationError::Auth(AuthError::MalformedResponse(detail)) => {
                format!("Could not read the token returned by the API ({detail}).")
            }
            OperationError::Auth(AuthError::ConnectionFailure(detail)) => {
                format!("Could not connect to the API: {detail}")
            }
            OperationError::Auth(AuthError::NotAuthenticated) => {
                "You need to sign in first.".to_string()
            }
            OperationError::Fetch(FetchError::Status(err)) => {
                format!("Error fetching employees: {} {}", err.status, err.message)
            }
            OperationError::Fetch(err) => format!("Request failed: {err}"),
            OperationError::Enrollment(EnrollmentError::NoEmployeeSelected) => {
                "Please select an employee from the list.".to_string()
            }
            OperationError::Enrollment(EnrollmentError::CaptureFailed {
                sample_index,
                message,
            }) => format!("Error: capture {sample_index} failed: {message}"),
            OperationError::Enrollment(EnrollmentError::MergeFailed(message)) => {
                format!("Error: failed to merge templates: {message}")
            }
            OperationError::Enrollment(EnrollmentError::SubmitFailed(SubmitError::Status(
                err,
            ))) => format!("API ERROR: {} - {}", err.status, err.message),
            OperationError::Enrollment(EnrollmentError::SubmitFailed(err)) => {
                format!("API request failed: {err}")
            }
            OperationError::DeviceConfig(err) => err.to_string(),
            OperationError::Device(err) => err.to_string(),
            OperationError::InvalidInput(InvalidInput(detail)) => format!("Invalid input: {detail}"),
            OperationError::Busy(operation) => {
                format!("{} is still running; wait for it to finish.", operation.label())
            }
        }
    }

    /// Whether the operator has to sign in (again) before retrying.
    pub fn requires_reauth(&self) -> bool {
        match self {
            OperationError::Auth(AuthError::NotAuthenticated) => true,
            OperationError::Fetch(FetchError::Status(err))
            | OperationError::Enrollment(EnrollmentError::SubmitFailed(SubmitError::Status(err))) => {
                err.is_auth_failure()
            }
            _ => false,
        }
    }
}
