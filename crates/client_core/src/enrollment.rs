//! Three-capture enrollment: capture, merge, submit, then refresh the roster.

use std::sync::Arc;

use fingerprint_device::{CapturedSample, DeviceGateway};
use shared::domain::EmployeeId;
use tracing::{error, info, warn};

use crate::{
    api::ApiClient,
    device_ops::{run_device, DeviceOutcome, DeviceWarning},
    error::{EnrollmentError, FetchError},
    roster::EmployeeRoster,
    session::Session,
};

pub const SAMPLES_PER_ENROLLMENT: u8 = 3;

/// Step notifications emitted while an enrollment runs, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentProgress {
    Started {
        employee_id: EmployeeId,
        employee_name: String,
    },
    WaitingForSample(u8),
    SampleCaptured {
        index: u8,
        quality: i32,
        warning: Option<DeviceWarning>,
    },
    Merging,
    Merged {
        warning: Option<DeviceWarning>,
    },
    Submitting,
    Registered {
        employee_name: String,
    },
    RosterRefreshed {
        total: usize,
    },
}

impl EnrollmentProgress {
    pub fn message(&self) -> String {
        match self {
            EnrollmentProgress::Started { employee_name, .. } => {
                format!("Starting registration for: {employee_name}...")
            }
            EnrollmentProgress::WaitingForSample(1) => {
                format!("Please place your finger (1/{SAMPLES_PER_ENROLLMENT})...")
            }
            EnrollmentProgress::WaitingForSample(index) if *index == SAMPLES_PER_ENROLLMENT => {
                format!("Place the finger one last time ({index}/{SAMPLES_PER_ENROLLMENT})...")
            }
            EnrollmentProgress::WaitingForSample(index) => {
                format!("Place the same finger again ({index}/{SAMPLES_PER_ENROLLMENT})...")
            }
            EnrollmentProgress::SampleCaptured {
                index,
                quality,
                warning,
            } => match warning {
                Some(warning) => format!(
                    "Sample {index} captured (quality {quality}), warning: {}",
                    warning.message
                ),
                None => format!("Sample {index} captured (quality {quality})."),
            },
            EnrollmentProgress::Merging => "Processing templates...".to_string(),
            EnrollmentProgress::Merged { warning: Some(warning) } => {
                format!("Templates merged with warning: {}", warning.message)
            }
            EnrollmentProgress::Merged { warning: None } => "Templates merged.".to_string(),
            EnrollmentProgress::Submitting => {
                "Merged template captured. Sending to the API...".to_string()
            }
            EnrollmentProgress::Registered { employee_name } => {
                format!("SUCCESS! Biometry registered for {employee_name}.")
            }
            EnrollmentProgress::RosterRefreshed { total } => {
                format!("Employee list refreshed ({total} employees).")
            }
        }
    }
}

/// Outcome of a submitted enrollment. The refresh result is informational:
/// the server already holds the biometry when it is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentReport {
    pub employee_id: EmployeeId,
    pub employee_name: String,
    pub roster_refresh: Result<usize, FetchError>,
}

pub struct EnrollmentOrchestrator {
    device: Arc<dyn DeviceGateway>,
    api: Arc<dyn ApiClient>,
}

impl EnrollmentOrchestrator {
    pub fn new(device: Arc<dyn DeviceGateway>, api: Arc<dyn ApiClient>) -> Self {
        Self { device, api }
    }

    /// Runs one attempt against the current selection.
    ///
    /// Nothing is sent to the server unless all three captures and the merge
    /// succeeded, and the roster is reloaded exactly once after a successful
    /// submission.
    pub async fn enroll(
        &self,
        session: &Session,
        roster: &mut EmployeeRoster,
        progress: &mut (dyn FnMut(EnrollmentProgress) + Send),
    ) -> Result<EnrollmentReport, EnrollmentError> {
        let Ok(token) = session.bearer().map(str::to_owned) else {
            return Err(EnrollmentError::NoEmployeeSelected);
        };
        let Some(employee) = roster.selected().cloned() else {
            return Err(EnrollmentError::NoEmployeeSelected);
        };

        info!(employee_id = employee.id.0, "starting enrollment");
        progress(EnrollmentProgress::Started {
            employee_id: employee.id,
            employee_name: employee.name.clone(),
        });

        let mut samples: Vec<CapturedSample> = Vec::with_capacity(SAMPLES_PER_ENROLLMENT.into());
        for index in 1..=SAMPLES_PER_ENROLLMENT {
            progress(EnrollmentProgress::WaitingForSample(index));
            let outcome = run_device(&self.device, |d| d.capture_image_and_template())
                .await
                .map_err(|fault| {
                    error!(sample = index, code = fault.code.0, "capture failed");
                    EnrollmentError::CaptureFailed {
                        sample_index: index,
                        message: fault.message,
                    }
                })?;
            if let Some(warning) = &outcome.warning {
                warn!(sample = index, code = warning.code.0, "{}", warning.message);
            }
            progress(EnrollmentProgress::SampleCaptured {
                index,
                quality: outcome.value.quality,
                warning: outcome.warning,
            });
            samples.push(outcome.value);
        }

        progress(EnrollmentProgress::Merging);
        let merged = self.merge(&samples).await?;
        progress(EnrollmentProgress::Merged {
            warning: merged.warning,
        });

        progress(EnrollmentProgress::Submitting);
        self.api
            .register_biometry(&token, employee.id, &merged.value)
            .await
            .map_err(|err| {
                error!(
                    employee_id = employee.id.0,
                    status = ?err.status(),
                    error = %err,
                    "biometry submission failed"
                );
                EnrollmentError::SubmitFailed(err)
            })?;
        info!(employee_id = employee.id.0, "biometry registered");
        progress(EnrollmentProgress::Registered {
            employee_name: employee.name.clone(),
        });

        let roster_refresh = roster.load(self.api.as_ref(), &token).await;
        if let Ok(total) = &roster_refresh {
            progress(EnrollmentProgress::RosterRefreshed { total: *total });
        }

        Ok(EnrollmentReport {
            employee_id: employee.id,
            employee_name: employee.name,
            roster_refresh,
        })
    }

    async fn merge(
        &self,
        samples: &[CapturedSample],
    ) -> Result<DeviceOutcome<String>, EnrollmentError> {
        let [first, second, third] = samples else {
            return Err(EnrollmentError::MergeFailed(format!(
                "expected {SAMPLES_PER_ENROLLMENT} samples, got {}",
                samples.len()
            )));
        };
        let (first, second, third) = (
            first.template.clone(),
            second.template.clone(),
            third.template.clone(),
        );

        let merged = run_device(&self.device, move |d| {
            d.merge_templates(&first, &second, &third)
        })
        .await
        .map_err(|fault| {
            error!(code = fault.code.0, "template merge failed");
            EnrollmentError::MergeFailed(fault.message)
        })?;

        if merged.value.trim().is_empty() {
            error!("reader returned an empty merged template");
            return Err(EnrollmentError::MergeFailed(
                "reader returned an empty template".to_string(),
            ));
        }
        Ok(merged)
    }
}

#[cfg(test)]
#[path = "tests/enrollment_tests.rs"]
mod tests;
