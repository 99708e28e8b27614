//! Applying received events to a local copy of the console state.
//!
//! The mirror is a [`StateStore`] of its own, so local observers use the
//! same subscription API as on the server. Scalar channels are replaced
//! by every event. Map channels merge diffs, except that the first event
//! of a map channel on each connection is a snapshot and replaces the
//! local map, dropping keys deleted while disconnected.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;
use vertigo_core::{DiffableMap, StateStore};
use vertigo_types::{
    BatteryState, CameraParameters, Channel, MapDiff, WindowParameters,
};

use crate::error::ClientError;
use crate::sse::SseEvent;

/// Per-connection applier of events onto a mirror store.
#[derive(Debug)]
pub struct Mirror {
    store: Arc<StateStore>,
    synced: BTreeSet<Channel>,
}

impl Mirror {
    /// Start a new connection's worth of events against `store`.
    pub const fn new(store: Arc<StateStore>) -> Self {
        Self {
            store,
            synced: BTreeSet::new(),
        }
    }

    /// Apply one event. Returns the channel it updated, or `None` for
    /// events of no known channel.
    ///
    /// # Errors
    ///
    /// [`ClientError::MalformedEvent`] if the payload does not decode;
    /// the mirror is left unchanged.
    pub fn apply(&mut self, event: &SseEvent) -> Result<Option<Channel>, ClientError> {
        let Some(channel) = Channel::from_event_name(&event.event) else {
            debug!(event = event.event, "Ignoring event of unknown channel");
            return Ok(None);
        };
        let store = Arc::clone(&self.store);
        match channel {
            Channel::Catalog => self.apply_map(channel, store.catalog(), event)?,
            Channel::Participants => self.apply_map(channel, store.participants(), event)?,
            Channel::Experiment => store.experiment().set(decode::<String>(event)?),
            Channel::Window => store.window().set(decode::<Option<WindowParameters>>(event)?),
            Channel::Battery => store.battery().set(decode::<BatteryState>(event)?),
            Channel::Camera => store.camera().set(decode::<Option<CameraParameters>>(event)?),
            Channel::Stream => store.stream().set(decode::<String>(event)?),
        }
        Ok(Some(channel))
    }

    fn apply_map<V>(
        &mut self,
        channel: Channel,
        map: &DiffableMap<V>,
        event: &SseEvent,
    ) -> Result<(), ClientError>
    where
        V: DeserializeOwned + Clone + PartialEq + Send + 'static,
    {
        let partial: MapDiff<V> = decode(event)?;
        if self.synced.insert(channel) {
            map.set(
                partial
                    .into_iter()
                    .filter_map(|(key, value)| value.map(|value| (key, value)))
                    .collect(),
            );
        } else {
            map.merge_diff(partial);
        }
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(event: &SseEvent) -> Result<T, ClientError> {
    serde_json::from_str(&event.data).map_err(|source| ClientError::MalformedEvent {
        event: event.event.clone(),
        source,
    })
}
