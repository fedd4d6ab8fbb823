//! Command orchestration from UI actions to the backend command queue.

use std::collections::HashMap;

use client_core::{BusyToken, Command, Operation, OperationError, OperationGuard};
use crossbeam_channel::{Sender, TrySendError};

use crate::backend_bridge::commands::BackendCommand;

/// Busy slots held by in-flight commands, released on `Event::Finished`.
#[derive(Default)]
pub struct InFlight {
    guard: OperationGuard,
    tokens: HashMap<Operation, BusyToken>,
}

impl InFlight {
    pub fn is_busy(&self, operation: Operation) -> bool {
        self.guard.is_busy(operation)
    }

    pub fn finish(&mut self, operation: Operation) {
        self.tokens.remove(&operation);
    }
}

pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    in_flight: &mut InFlight,
    command: Command,
    status: &mut String,
) {
    let operation = command.operation();
    let token = match operation {
        Some(operation) => match in_flight.guard.try_begin(operation) {
            Some(token) => Some((operation, token)),
            None => {
                *status = OperationError::Busy(operation).operator_message();
                return;
            }
        },
        None => None,
    };

    let cmd = BackendCommand::Core(command);
    let cmd_name = cmd.name();
    match cmd_tx.try_send(cmd) {
        Ok(()) => {
            tracing::debug!(command = cmd_name, "queued ui->backend command");
            if let Some((operation, token)) = token {
                in_flight.tokens.insert(operation, token);
            }
        }
        Err(TrySendError::Full(_)) => {
            *status = "UI command queue is full; please retry".to_string();
        }
        Err(TrySendError::Disconnected(_)) => {
            *status = "Backend worker is not running; restart the application".to_string();
        }
    }
}
