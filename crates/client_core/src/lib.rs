//! Core of the biometry enrollment client: API access, the authenticated
//! session, the employee roster, enrollment and reader operations, all driven
//! through [`controller::AppController`].

pub mod api;
pub mod config;
pub mod controller;
pub mod device_config;
pub mod device_ops;
pub mod enrollment;
pub mod error;
pub mod guard;
pub mod roster;
pub mod session;

pub use api::{ApiClient, HttpApiClient};
pub use config::{load_settings, Settings};
pub use controller::{entry_command, AppController, Command, Event};
pub use device_config::{DeviceSettings, LoadedSettings, MinVar, SimilarityThreshold};
pub use enrollment::{EnrollmentOrchestrator, EnrollmentProgress, EnrollmentReport};
pub use error::OperationError;
pub use guard::{BusyToken, Operation, OperationGuard};
pub use roster::{EmployeeRoster, RosterView, Selection};
pub use session::{guard_navigation, Navigation, Session, View};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
