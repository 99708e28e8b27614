//! Trusted mutation API for in-process callers.
//!
//! [`SessionController`] is what the HTTP handlers call to start and stop
//! experiments, close the window and drive the camera. Every operation
//! checks and writes synchronously; the only asynchronous piece is the
//! expiry timer of a run session.
//!
//! # Run sessions
//!
//! At most one run session exists at a time. Starting one spawns a
//! single-shot timer that clears the experiment channel after the
//! configured duration unless [`SessionController::stop_experiment`] gets
//! there first. The window is left open either way.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};
use vertigo_types::{
    BatteryState, CameraParameters, Catalog, Participant, ParticipantByName, RunParameters,
    WindowParameters,
};

use crate::error::ControlError;
use crate::store::StateStore;
use crate::subscription::lock;

/// Default lifetime of a run session.
pub const DEFAULT_RUN_DURATION: Duration = Duration::from_secs(10);

struct ActiveRun {
    key: String,
    expiry: JoinHandle<()>,
}

#[derive(Default)]
struct RunSlot {
    generation: u64,
    active: Option<ActiveRun>,
}

/// Owner of run-session lifecycle and the other trusted mutations.
pub struct SessionController {
    store: Arc<StateStore>,
    run_duration: Duration,
    run: Arc<Mutex<RunSlot>>,
}

impl SessionController {
    /// Create a controller writing into `store`.
    pub fn new(store: Arc<StateStore>, run_duration: Duration) -> Self {
        Self {
            store,
            run_duration,
            run: Arc::new(Mutex::new(RunSlot::default())),
        }
    }

    /// The store this controller writes into.
    pub const fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Start a run session for `key`.
    ///
    /// Opens the window with `window`, publishes `key` on the experiment
    /// channel, advances the participant's next-session counter to
    /// `max(current, session + 1)` (creating the participant if needed)
    /// and arms the expiry timer. Must be called from within a Tokio
    /// runtime.
    ///
    /// # Errors
    ///
    /// [`ControlError::UnknownExperiment`] if `key` is not in the catalog,
    /// [`ControlError::ExperimentAlreadyRunning`] if any run session is
    /// active.
    pub fn run_experiment(
        &self,
        key: &str,
        parameters: &RunParameters,
        window: WindowParameters,
    ) -> Result<(), ControlError> {
        let mut slot = lock(&self.run);

        if !self.store.catalog().contains_key(key) {
            return Err(ControlError::UnknownExperiment(key.to_owned()));
        }
        if let Some(active) = &slot.active {
            return Err(ControlError::ExperimentAlreadyRunning(active.key.clone()));
        }

        self.store.window().set(Some(window));
        self.store.experiment().set(key.to_owned());
        self.advance_participant(&parameters.participant, parameters.session);

        slot.generation = slot.generation.wrapping_add(1);
        let generation = slot.generation;
        let expiry = tokio::spawn(expire_run(
            Arc::clone(&self.run),
            Arc::clone(&self.store),
            generation,
            self.run_duration,
        ));
        slot.active = Some(ActiveRun {
            key: key.to_owned(),
            expiry,
        });

        info!(
            experiment = key,
            participant = parameters.participant,
            session = parameters.session,
            "Run session started"
        );
        Ok(())
    }

    /// Stop the active run session and clear the experiment channel.
    ///
    /// # Errors
    ///
    /// [`ControlError::NoExperimentRunning`] if no session is active.
    pub fn stop_experiment(&self) -> Result<(), ControlError> {
        let mut slot = lock(&self.run);
        let active = slot.active.take().ok_or(ControlError::NoExperimentRunning)?;
        active.expiry.abort();
        self.store.experiment().set(String::new());
        info!(experiment = active.key, "Run session stopped");
        Ok(())
    }

    /// Key of the active run session, if any.
    pub fn running_experiment(&self) -> Option<String> {
        lock(&self.run).active.as_ref().map(|a| a.key.clone())
    }

    /// Close the stimulus window.
    ///
    /// # Errors
    ///
    /// [`ControlError::WindowNotOpen`] if the window is already closed.
    pub fn close_window(&self) -> Result<(), ControlError> {
        if self.store.window().set_if(Option::is_some, None) {
            debug!("Window closed");
            Ok(())
        } else {
            Err(ControlError::WindowNotOpen)
        }
    }

    /// Start the camera with `partial` merged over the default parameters
    /// and publish the result.
    ///
    /// # Errors
    ///
    /// [`ControlError::InvalidCameraParameters`] if a field has the wrong
    /// shape, [`ControlError::CameraAlreadyStarted`] if the camera runs.
    pub fn start_camera(
        &self,
        partial: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<CameraParameters, ControlError> {
        let params = CameraParameters::merged_over_defaults(partial)
            .map_err(|e| ControlError::InvalidCameraParameters(e.to_string()))?;
        if self
            .store
            .camera()
            .set_if(Option::is_none, Some(params.clone()))
        {
            info!(framerate = params.framerate, "Camera started");
            Ok(params)
        } else {
            Err(ControlError::CameraAlreadyStarted)
        }
    }

    /// Current camera parameters.
    ///
    /// # Errors
    ///
    /// [`ControlError::CameraNotRunning`] if the camera is stopped.
    pub fn camera(&self) -> Result<CameraParameters, ControlError> {
        self.store.camera().get().ok_or(ControlError::CameraNotRunning)
    }

    /// Stop the camera.
    ///
    /// # Errors
    ///
    /// [`ControlError::CameraNotStarted`] if the camera is already stopped.
    pub fn stop_camera(&self) -> Result<(), ControlError> {
        if self.store.camera().set_if(Option::is_some, None) {
            info!("Camera stopped");
            Ok(())
        } else {
            Err(ControlError::CameraNotStarted)
        }
    }

    /// Full catalog snapshot.
    pub fn experiments(&self) -> Catalog {
        self.store.catalog().get()
    }

    /// Replace the catalog after a rescan.
    pub fn reload_catalog(&self, catalog: Catalog) {
        info!(experiments = catalog.len(), "Catalog reloaded");
        self.store.catalog().set(catalog);
    }

    /// Full participant registry snapshot.
    pub fn participants(&self) -> ParticipantByName {
        self.store.participants().get()
    }

    /// Look up a participant, creating it with `next_session = 0` on first
    /// reference.
    pub fn participant(&self, name: &str) -> Participant {
        let _slot = lock(&self.run);
        if let Some(existing) = self.store.participants().entry(name) {
            return existing;
        }
        let created = Participant::new(name, 0);
        self.store.participants().upsert(name, created.clone());
        debug!(participant = name, "Participant registered");
        created
    }

    /// Current battery reading.
    ///
    /// # Errors
    ///
    /// [`ControlError::BatteryUnavailable`] while the state is unknown.
    pub fn battery(&self) -> Result<BatteryState, ControlError> {
        let state = self.store.battery().get();
        if state.is_unknown() {
            Err(ControlError::BatteryUnavailable)
        } else {
            Ok(state)
        }
    }

    fn advance_participant(&self, name: &str, session: u32) {
        let participants = self.store.participants();
        let (mut record, created) = participants
            .entry(name)
            .map_or_else(|| (Participant::new(name, 0), true), |p| (p, false));
        if record.advance(session) || created {
            participants.upsert(name, record);
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(active) = lock(&self.run).active.take() {
            active.expiry.abort();
        }
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("run_duration", &self.run_duration)
            .field("running", &self.running_experiment())
            .finish_non_exhaustive()
    }
}

/// Expiry timer body: clear the run session if it is still the one that
/// armed this timer.
async fn expire_run(
    run: Arc<Mutex<RunSlot>>,
    store: Arc<StateStore>,
    generation: u64,
    after: Duration,
) {
    tokio::time::sleep(after).await;
    let mut slot = lock(&run);
    if slot.generation != generation {
        return;
    }
    if let Some(active) = slot.active.take() {
        store.experiment().set(String::new());
        info!(experiment = active.key, "Run session expired");
    }
}
