//! Direct reader operations from the Capture and Identification views.
//!
//! Reader calls block, so every one of them is moved onto tokio's blocking
//! pool through [`run_device`].

use std::{path::PathBuf, sync::Arc};

use fingerprint_device::{
    DeviceFault, DeviceGateway, DeviceInfo, DeviceResult, FingerImage, Identification, RetCode,
};
use tracing::{info, warn};

use crate::error::{DeviceError, InvalidInput};

/// Non-fatal code reported alongside a usable value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceWarning {
    pub code: RetCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceOutcome<T> {
    pub value: T,
    pub warning: Option<DeviceWarning>,
}

/// Runs one blocking reader call off the async executor and resolves any
/// warning code to its message while still on the blocking thread.
pub async fn run_device<T, F>(
    device: &Arc<dyn DeviceGateway>,
    call: F,
) -> Result<DeviceOutcome<T>, DeviceFault>
where
    T: Send + 'static,
    F: FnOnce(&dyn DeviceGateway) -> DeviceResult<T> + Send + 'static,
{
    let device = Arc::clone(device);
    let joined = tokio::task::spawn_blocking(move || {
        let gateway = device.as_ref();
        let reply = call(gateway)?;
        let warning = reply.warning().map(|code| DeviceWarning {
            code,
            message: gateway.error_message(code),
        });
        Ok(DeviceOutcome {
            value: reply.value,
            warning,
        })
    })
    .await;

    joined.unwrap_or_else(|err| {
        Err(DeviceFault {
            code: RetCode::HOST_FAILURE,
            message: format!("reader task aborted: {err}"),
        })
    })
}

async fn checked<T, F>(
    device: &Arc<dyn DeviceGateway>,
    operation: &'static str,
    call: F,
) -> Result<DeviceOutcome<T>, DeviceError>
where
    T: Send + 'static,
    F: FnOnce(&dyn DeviceGateway) -> DeviceResult<T> + Send + 'static,
{
    match run_device(device, call).await {
        Ok(outcome) => {
            if let Some(warning) = &outcome.warning {
                warn!(operation, code = warning.code.0, "{}", warning.message);
            }
            Ok(outcome)
        }
        Err(fault) => {
            warn!(operation, code = fault.code.0, "{}", fault.message);
            Err(DeviceError::from_fault(operation, fault))
        }
    }
}

pub async fn init(device: &Arc<dyn DeviceGateway>) -> Result<DeviceOutcome<()>, DeviceError> {
    checked(device, "Init", |d| d.init()).await
}

/// Best-effort; failures are only logged.
pub async fn terminate(device: &Arc<dyn DeviceGateway>) {
    if checked(device, "Terminate", |d| d.terminate()).await.is_ok() {
        info!("reader terminated");
    }
}

pub async fn device_info(
    device: &Arc<dyn DeviceGateway>,
) -> Result<DeviceOutcome<DeviceInfo>, DeviceError> {
    checked(device, "GetDeviceInfo", |d| d.device_info()).await
}

pub async fn capture_image(
    device: &Arc<dyn DeviceGateway>,
) -> Result<DeviceOutcome<FingerImage>, DeviceError> {
    checked(device, "Capture", |d| d.capture_image()).await
}

pub async fn update_firmware(
    device: &Arc<dyn DeviceGateway>,
    path: PathBuf,
) -> Result<DeviceOutcome<()>, DeviceError> {
    info!(path = %path.display(), "updating reader firmware");
    checked(device, "Updating", move |d| d.update_firmware(&path)).await
}

/// Parses an operator-typed template id.
pub fn parse_template_id(raw: &str) -> Result<i64, InvalidInput> {
    raw.trim()
        .parse::<i64>()
        .map_err(|err| InvalidInput(format!("template id '{}': {err}", raw.trim())))
}

pub async fn enroll_on_device(
    device: &Arc<dyn DeviceGateway>,
    id: i64,
) -> Result<DeviceOutcome<()>, DeviceError> {
    checked(device, "Enrolling", move |d| d.capture_and_enroll(id)).await
}

pub async fn identify(
    device: &Arc<dyn DeviceGateway>,
) -> Result<DeviceOutcome<Identification>, DeviceError> {
    checked(device, "Identifying", |d| d.capture_and_identify()).await
}

pub async fn template_ids(
    device: &Arc<dyn DeviceGateway>,
) -> Result<DeviceOutcome<Vec<i64>>, DeviceError> {
    checked(device, "Reading IDs", |d| d.template_ids()).await
}

pub async fn delete_all_templates(
    device: &Arc<dyn DeviceGateway>,
) -> Result<DeviceOutcome<()>, DeviceError> {
    checked(device, "Deleting IDs", |d| d.delete_all_templates()).await
}

#[cfg(test)]
#[path = "tests/device_ops_tests.rs"]
mod tests;
