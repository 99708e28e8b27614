//! Authoritative state and change propagation for the Vertigo console.
//!
//! Everything the console replicates lives in one [`StateStore`]: two map
//! channels backed by [`DiffableMap`] and several scalar channels backed by
//! [`ObservableField`]. Observers register through subscriptions that fire
//! once with the current value and then on every change; dropping or
//! cancelling the returned [`Subscription`] removes the listener.
//!
//! # Modules
//!
//! - [`catalog`] -- Experiment catalog loading from YAML.
//! - [`config`] -- Configuration loading from `vertigo-config.yaml` into
//!   strongly-typed structs.
//! - [`controller`] -- [`SessionController`], the trusted mutation API.
//! - [`diffable_map`] -- [`DiffableMap`] plus the free diff/merge functions.
//! - [`error`] -- [`ControlError`] and its [`ErrorKind`].
//! - [`field`] -- [`ObservableField`].
//! - [`store`] -- [`StateStore`] and [`ChannelEvent`].
//! - [`stub`] -- Fixture data and the simulated battery.
//! - [`subscription`] -- [`Subscription`] tokens.

pub mod catalog;
pub mod config;
pub mod controller;
pub mod diffable_map;
pub mod error;
pub mod field;
pub mod store;
pub mod stub;
pub mod subscription;

pub use config::{ConfigError, ConsoleConfig};
pub use controller::{DEFAULT_RUN_DURATION, SessionController};
pub use diffable_map::DiffableMap;
pub use error::{ControlError, ErrorKind};
pub use field::ObservableField;
pub use store::{ChannelEvent, StateStore};
pub use subscription::Subscription;
