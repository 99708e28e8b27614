//! The authoritative console state.
//!
//! [`StateStore`] owns one channel object per [`Channel`]. It is built
//! once per process, shared behind an [`Arc`], and handed to the
//! publisher, the pollers and the session controller. Writers go through
//! the channel accessors; observers go through [`StateStore::subscribe_all`].

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;
use vertigo_types::{
    BatteryState, CameraParameters, Channel, Experiment, MapDiff, Participant, WindowParameters,
};

use crate::diffable_map::DiffableMap;
use crate::field::ObservableField;
use crate::subscription::Subscription;

/// One replication event: a channel and its JSON payload.
///
/// For map channels the payload is a diff, for scalar channels the whole
/// value.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelEvent {
    /// The channel the payload belongs to.
    pub channel: Channel,
    /// JSON payload as it goes on the wire.
    pub payload: serde_json::Value,
}

impl ChannelEvent {
    /// Wire event name, e.g. `cameraUpdate`.
    pub const fn event_name(&self) -> &'static str {
        self.channel.event_name()
    }
}

/// Aggregate of every console channel.
#[derive(Debug)]
pub struct StateStore {
    catalog: DiffableMap<Experiment>,
    participants: DiffableMap<Participant>,
    window: ObservableField<Option<WindowParameters>>,
    experiment: ObservableField<String>,
    battery: ObservableField<BatteryState>,
    camera: ObservableField<Option<CameraParameters>>,
    stream: ObservableField<String>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    /// A store with every channel at its idle value: empty maps, closed
    /// window, no experiment, unknown battery, camera stopped, no stream.
    pub fn new() -> Self {
        Self {
            catalog: DiffableMap::new(BTreeMap::new()),
            participants: DiffableMap::new(BTreeMap::new()),
            window: ObservableField::new(None),
            experiment: ObservableField::new(String::new()),
            battery: ObservableField::new(BatteryState::unknown()),
            camera: ObservableField::new(None),
            stream: ObservableField::new(String::new()),
        }
    }

    /// Convenience constructor returning a shared store.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Experiment catalog.
    pub const fn catalog(&self) -> &DiffableMap<Experiment> {
        &self.catalog
    }

    /// Participant registry.
    pub const fn participants(&self) -> &DiffableMap<Participant> {
        &self.participants
    }

    /// Window parameters, `None` while closed.
    pub const fn window(&self) -> &ObservableField<Option<WindowParameters>> {
        &self.window
    }

    /// Running experiment key, empty when none.
    pub const fn experiment(&self) -> &ObservableField<String> {
        &self.experiment
    }

    /// Battery state.
    pub const fn battery(&self) -> &ObservableField<BatteryState> {
        &self.battery
    }

    /// Camera parameters, `None` while not streaming.
    pub const fn camera(&self) -> &ObservableField<Option<CameraParameters>> {
        &self.camera
    }

    /// Live stream path, empty when none.
    pub const fn stream(&self) -> &ObservableField<String> {
        &self.stream
    }

    /// Subscribe to every channel at once.
    ///
    /// Map channels are observed through their diff subscription, scalar
    /// channels through their value subscription. Each registration fires
    /// once immediately, so `on_event` first sees a full snapshot of every
    /// channel and then incremental events. The returned subscription
    /// tears down all per-channel listeners. Subscribing never mutates
    /// state.
    pub fn subscribe_all(
        &self,
        on_event: impl Fn(ChannelEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let on_event: Arc<dyn Fn(ChannelEvent) + Send + Sync> = Arc::new(on_event);
        let parts = Channel::ALL
            .into_iter()
            .map(|channel| self.subscribe_channel(channel, Arc::clone(&on_event)))
            .collect();
        Subscription::combine(parts)
    }

    fn subscribe_channel(
        &self,
        channel: Channel,
        on_event: Arc<dyn Fn(ChannelEvent) + Send + Sync>,
    ) -> Subscription {
        match channel {
            Channel::Catalog => self
                .catalog
                .subscribe_with_diff(forward_diff::<Experiment>(channel, on_event)),
            Channel::Participants => self
                .participants
                .subscribe_with_diff(forward_diff::<Participant>(channel, on_event)),
            Channel::Window => self
                .window
                .subscribe(forward::<Option<WindowParameters>>(channel, on_event)),
            Channel::Experiment => self
                .experiment
                .subscribe(forward::<String>(channel, on_event)),
            Channel::Battery => self
                .battery
                .subscribe(forward::<BatteryState>(channel, on_event)),
            Channel::Camera => self
                .camera
                .subscribe(forward::<Option<CameraParameters>>(channel, on_event)),
            Channel::Stream => self.stream.subscribe(forward::<String>(channel, on_event)),
        }
    }

    /// Total listeners registered across all channels.
    pub fn listener_count(&self) -> usize {
        [
            self.catalog.listener_count(),
            self.participants.listener_count(),
            self.window.listener_count(),
            self.experiment.listener_count(),
            self.battery.listener_count(),
            self.camera.listener_count(),
            self.stream.listener_count(),
        ]
        .into_iter()
        .sum()
    }
}

fn emit<T: Serialize + ?Sized>(
    channel: Channel,
    value: &T,
    on_event: &Arc<dyn Fn(ChannelEvent) + Send + Sync>,
) {
    match serde_json::to_value(value) {
        Ok(payload) => on_event(ChannelEvent { channel, payload }),
        Err(e) => warn!(%channel, error = %e, "dropping unserializable channel value"),
    }
}

fn forward<T: Serialize + 'static>(
    channel: Channel,
    on_event: Arc<dyn Fn(ChannelEvent) + Send + Sync>,
) -> impl FnMut(&T) + Send + 'static {
    move |value: &T| emit(channel, value, &on_event)
}

fn forward_diff<V: Serialize + 'static>(
    channel: Channel,
    on_event: Arc<dyn Fn(ChannelEvent) + Send + Sync>,
) -> impl FnMut(&MapDiff<V>) + Send + 'static {
    move |partial: &MapDiff<V>| emit(channel, partial, &on_event)
}
