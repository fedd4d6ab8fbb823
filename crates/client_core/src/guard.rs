//! Single-slot busy guard: an operation may not start while another instance
//! of itself is pending.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Login,
    DeviceInfo,
    Capture,
    FirmwareUpdate,
    DeviceEnroll,
    Identify,
    TemplateIds,
    DeleteTemplates,
    LoadRoster,
    Enroll,
    LoadConfig,
    SaveConfig,
}

impl Operation {
    pub fn label(self) -> &'static str {
        match self {
            Operation::Login => "Sign-in",
            Operation::DeviceInfo => "Device info",
            Operation::Capture => "Capture",
            Operation::FirmwareUpdate => "Firmware update",
            Operation::DeviceEnroll => "Device enrollment",
            Operation::Identify => "Identification",
            Operation::TemplateIds => "Template id listing",
            Operation::DeleteTemplates => "Template deletion",
            Operation::LoadRoster => "Employee list",
            Operation::Enroll => "Biometry registration",
            Operation::LoadConfig => "Configuration load",
            Operation::SaveConfig => "Configuration save",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OperationGuard {
    pending: Arc<Mutex<HashSet<Operation>>>,
}

impl OperationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the slot for `operation`, or `None` while one is pending.
    pub fn try_begin(&self, operation: Operation) -> Option<BusyToken> {
        if !self.lock().insert(operation) {
            tracing::debug!(operation = operation.label(), "rejected re-entrant operation");
            return None;
        }
        Some(BusyToken {
            guard: self.clone(),
            operation,
        })
    }

    pub fn is_busy(&self, operation: Operation) -> bool {
        self.lock().contains(&operation)
    }

    fn release(&self, operation: Operation) {
        self.lock().remove(&operation);
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<Operation>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Releases its slot on drop.
#[derive(Debug)]
pub struct BusyToken {
    guard: OperationGuard,
    operation: Operation,
}

impl Drop for BusyToken {
    fn drop(&mut self) {
        self.guard.release(self.operation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_instance_is_rejected_until_the_first_finishes() {
        let guard = OperationGuard::new();
        let token = guard.try_begin(Operation::Enroll).expect("first enroll");
        assert!(guard.try_begin(Operation::Enroll).is_none());
        assert!(guard.is_busy(Operation::Enroll));

        drop(token);
        assert!(!guard.is_busy(Operation::Enroll));
        assert!(guard.try_begin(Operation::Enroll).is_some());
    }

    #[test]
    fn different_operations_do_not_block_each_other() {
        let guard = OperationGuard::new();
        let _enroll = guard.try_begin(Operation::Enroll).expect("enroll");
        let identify = guard.try_begin(Operation::Identify);
        assert!(identify.is_some());
        assert!(guard.is_busy(Operation::Enroll));
        assert!(guard.is_busy(Operation::Identify));
    }

    #[test]
    fn clones_share_the_same_slots() {
        let guard = OperationGuard::new();
        let other = guard.clone();
        let _login = guard.try_begin(Operation::Login).expect("login");
        assert!(other.try_begin(Operation::Login).is_none());
    }
}
