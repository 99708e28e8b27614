//! Channel names shared by the publisher and the consumer.
//!
//! Every channel is replicated independently. On the wire a channel is
//! identified by its event name, which is the channel name suffixed with
//! `Update` (for example `catalogUpdate`).

use std::fmt;

use serde::{Deserialize, Serialize};

/// One independently replicated slice of console state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    /// Experiment catalog (map channel, diffed).
    Catalog,
    /// Active experiment key, empty when none runs (scalar).
    Experiment,
    /// Window parameters, null when the window is closed (scalar).
    Window,
    /// Participant registry (map channel, diffed).
    Participants,
    /// Partial battery state, empty when unknown (scalar).
    Battery,
    /// Camera parameters, null when not streaming (scalar).
    Camera,
    /// Live stream path derived from the camera subsystem (scalar).
    Stream,
}

impl Channel {
    /// All channels, in the order they are subscribed by the publisher.
    pub const ALL: [Self; 7] = [
        Self::Catalog,
        Self::Experiment,
        Self::Window,
        Self::Participants,
        Self::Battery,
        Self::Camera,
        Self::Stream,
    ];

    /// The bare channel name (`catalog`, `experiment`, ...).
    pub const fn name(self) -> &'static str {
        match self {
            Self::Catalog => "catalog",
            Self::Experiment => "experiment",
            Self::Window => "window",
            Self::Participants => "participants",
            Self::Battery => "battery",
            Self::Camera => "camera",
            Self::Stream => "stream",
        }
    }

    /// The typed event name carried on the wire (`catalogUpdate`, ...).
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::Catalog => "catalogUpdate",
            Self::Experiment => "experimentUpdate",
            Self::Window => "windowUpdate",
            Self::Participants => "participantsUpdate",
            Self::Battery => "batteryUpdate",
            Self::Camera => "cameraUpdate",
            Self::Stream => "streamUpdate",
        }
    }

    /// Resolve a wire event name back to its channel.
    pub fn from_event_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.event_name() == name)
    }

    /// Whether the channel is replicated with keyed diffs rather than
    /// whole-value replacement.
    pub const fn is_map(self) -> bool {
        matches!(self, Self::Catalog | Self::Participants)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_resolve_back() {
        for channel in Channel::ALL {
            assert_eq!(Channel::from_event_name(channel.event_name()), Some(channel));
        }
        assert_eq!(Channel::from_event_name("catalog"), None);
        assert_eq!(Channel::from_event_name("message"), None);
    }

    #[test]
    fn only_catalog_and_participants_are_diffed() {
        let maps: Vec<Channel> = Channel::ALL.into_iter().filter(|c| c.is_map()).collect();
        assert_eq!(maps, vec![Channel::Catalog, Channel::Participants]);
    }
}
