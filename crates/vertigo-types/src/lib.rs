//! Shared wire types for the Vertigo console.
//!
//! This crate is the single source of truth for the payloads carried by
//! the state-replication channels. The server publishes them, the client
//! mirror consumes them, and `ts-rs` exports them to `TypeScript` for the
//! browser console.
//!
//! # Modules
//!
//! - [`channel`] -- Channel identifiers and their wire event names
//! - [`structs`] -- Catalog, participant, battery, window and run records
//! - [`camera`] -- Camera stream parameters

pub mod camera;
pub mod channel;
pub mod structs;

pub use camera::{AfRange, AutoFocusMode, AwbMode, CameraParameters, Resolution};
pub use channel::Channel;
pub use structs::{
    BatteryState, Catalog, Experiment, MapDiff, Participant, ParticipantByName, RunParameters,
    ValidationIssue, WindowParameters,
};

#[cfg(test)]
mod tests {
    #[test]
    fn export_bindings() {
        // Exporting writes the TypeScript definitions to `bindings/`
        // relative to the crate root.
        use ts_rs::TS;

        let _ = crate::structs::ValidationIssue::export_all();
        let _ = crate::structs::Experiment::export_all();
        let _ = crate::structs::Participant::export_all();
        let _ = crate::structs::BatteryState::export_all();
        let _ = crate::structs::WindowParameters::export_all();

        let _ = crate::camera::Resolution::export_all();
        let _ = crate::camera::AwbMode::export_all();
        let _ = crate::camera::AutoFocusMode::export_all();
        let _ = crate::camera::AfRange::export_all();
        let _ = crate::camera::CameraParameters::export_all();
    }
}
