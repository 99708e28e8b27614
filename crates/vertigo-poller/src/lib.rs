//! Upstream pollers feeding the Vertigo console state.
//!
//! Two subsystems live outside the console process: a UPS reachable over
//! its line protocol and the camera service reachable over HTTP. Each is
//! polled on its own interval by an [`UpstreamPoller`] that writes into
//! the [`StateStore`]. Failures are absorbed: a channel is only degraded
//! after a configurable number of consecutive failed reads.
//!
//! # Modules
//!
//! - [`battery`] -- [`BatteryPoller`] and the UPS-backed source.
//! - [`camera`] -- [`CameraPoller`] and the HTTP-backed source.
//! - [`error`] -- [`UpstreamError`].
//! - [`hysteresis`] -- [`FailureCounter`].
//! - [`nut`] -- Line-protocol client for the UPS server.
//! - [`poller`] -- [`UpstreamPoller`] and the shared polling loop.
//!
//! [`StateStore`]: vertigo_core::StateStore

pub mod battery;
pub mod camera;
pub mod error;
pub mod hysteresis;
pub mod nut;
pub mod poller;

pub use battery::{BatteryPoller, BatterySource, NutBatterySource};
pub use camera::{CameraPoller, CameraSource, HttpCameraSource};
pub use error::UpstreamError;
pub use hysteresis::FailureCounter;
pub use poller::{UpstreamPoller, spawn_poller};
