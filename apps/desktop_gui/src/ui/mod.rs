//! UI layer: the eframe application shell and its tab views.

pub mod app;

pub use app::BiometriaApp;
