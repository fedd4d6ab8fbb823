//! Events delivered from the backend worker to the UI thread.

use client_core::Event;

pub enum UiEvent {
    Core(Event),
    /// The worker could not start; nothing will be processed.
    StartupFailed(String),
}
