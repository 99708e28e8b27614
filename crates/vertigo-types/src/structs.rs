//! Records carried by the console channels.
//!
//! Field names follow the JSON shapes consumed by the browser console, so
//! every struct serializes in `camelCase`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A keyed diff for a map channel.
///
/// `Some(value)` inserts or replaces the entry, `None` (serialized as
/// `null`) deletes it. Keys absent from the diff are unchanged.
pub type MapDiff<V> = BTreeMap<String, Option<V>>;

// ---------------------------------------------------------------------------
// Experiment catalog
// ---------------------------------------------------------------------------

/// A validation problem found while loading an experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ValidationIssue {
    /// Short summary shown as a heading.
    pub title: String,
    /// Longer explanation.
    pub detail: String,
}

/// An experiment descriptor as listed in the catalog.
///
/// Descriptors are read-only once loaded; a rescan replaces them whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Experiment {
    /// Catalog key, derived from the experiment file name.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Resource path to whether the resource was found on disk.
    pub resources: BTreeMap<String, bool>,
    /// Ordered names of the parameters the experiment requires.
    pub parameters: Vec<String>,
    /// Problems detected while loading the experiment.
    #[serde(default)]
    pub errors: Vec<ValidationIssue>,
}

impl Experiment {
    /// Whether every declared resource is present.
    pub fn resources_complete(&self) -> bool {
        self.resources.values().all(|found| *found)
    }
}

/// The experiment catalog keyed by experiment key.
pub type Catalog = BTreeMap<String, Experiment>;

// ---------------------------------------------------------------------------
// Participants
// ---------------------------------------------------------------------------

/// A participant in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Participant {
    /// Participant name, also the registry key.
    pub name: String,
    /// Number to use for the participant's next session.
    pub next_session: u32,
}

impl Participant {
    /// Create a participant record.
    pub fn new(name: impl Into<String>, next_session: u32) -> Self {
        Self {
            name: name.into(),
            next_session,
        }
    }

    /// Record that `session` was started.
    ///
    /// The counter only moves forward: it becomes
    /// `max(next_session, session + 1)`. Returns whether it changed.
    pub fn advance(&mut self, session: u32) -> bool {
        let candidate = session.saturating_add(1);
        if candidate > self.next_session {
            self.next_session = candidate;
            true
        } else {
            false
        }
    }
}

/// The participant registry keyed by name.
pub type ParticipantByName = BTreeMap<String, Participant>;

// ---------------------------------------------------------------------------
// Battery
// ---------------------------------------------------------------------------

/// Battery / UPS state. Every field is optional; an empty record means
/// the state is unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct BatteryState {
    /// Charge level in percent (0-100).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub level: Option<u8>,
    /// Whether the device runs from its battery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub on_battery: Option<bool>,
    /// Whether the battery is charging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub charging: Option<bool>,
}

impl BatteryState {
    /// A fully known battery reading.
    pub const fn known(level: u8, on_battery: bool, charging: bool) -> Self {
        Self {
            level: Some(level),
            on_battery: Some(on_battery),
            charging: Some(charging),
        }
    }

    /// The unknown (empty) state.
    pub const fn unknown() -> Self {
        Self {
            level: None,
            on_battery: None,
            charging: None,
        }
    }

    /// Whether nothing is known about the battery.
    pub const fn is_unknown(&self) -> bool {
        self.level.is_none() && self.on_battery.is_none() && self.charging.is_none()
    }
}

// ---------------------------------------------------------------------------
// Window and run parameters
// ---------------------------------------------------------------------------

/// Parameters of the stimulus window. The window channel holds `null`
/// while the window is closed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct WindowParameters {
    /// Requested frame rate, the display default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub framerate: Option<f64>,
    /// Background colour as a CSS hex string (`#7f007f`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub background_color: Option<String>,
    /// Whether the window covers the whole screen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub fullscreen: Option<bool>,
}

/// Parameters passed when starting an experiment.
///
/// `participant` and `session` drive the registry; everything else is
/// forwarded to the experiment untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParameters {
    /// Participant name.
    pub participant: String,
    /// Session number being started.
    pub session: u32,
    /// Any other experiment parameter.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl RunParameters {
    /// Parameters with only a participant and a session.
    pub fn new(participant: impl Into<String>, session: u32) -> Self {
        Self {
            participant: participant.into(),
            session,
            extra: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn participant_counter_never_goes_back() {
        let mut p = Participant::new("turian", 5);
        assert!(!p.advance(2));
        assert_eq!(p.next_session, 5);
        assert!(!p.advance(4));
        assert!(p.advance(7));
        assert_eq!(p.next_session, 8);
    }

    #[test]
    fn participant_serializes_camel_case() {
        let json = serde_json::to_value(Participant::new("asari", 3)).unwrap();
        assert_eq!(json, serde_json::json!({"name": "asari", "nextSession": 3}));
    }

    #[test]
    fn unknown_battery_is_empty_object() {
        let json = serde_json::to_string(&BatteryState::unknown()).unwrap();
        assert_eq!(json, "{}");
        let parsed: BatteryState = serde_json::from_str("{}").unwrap();
        assert!(parsed.is_unknown());
    }

    #[test]
    fn known_battery_shape() {
        let json = serde_json::to_value(BatteryState::known(90, true, false)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"level": 90, "onBattery": true, "charging": false})
        );
    }

    #[test]
    fn map_diff_null_is_delete() {
        let diff: MapDiff<Participant> =
            serde_json::from_str(r#"{"a": null, "b": {"name": "b", "nextSession": 1}}"#).unwrap();
        assert_eq!(diff.get("a"), Some(&None));
        assert_eq!(diff.get("b"), Some(&Some(Participant::new("b", 1))));
    }

    #[test]
    fn run_parameters_keep_extra_fields() {
        let params: RunParameters =
            serde_json::from_str(r#"{"participant": "p", "session": 1, "age": 32}"#).unwrap();
        assert_eq!(params.participant, "p");
        assert_eq!(params.session, 1);
        assert_eq!(params.extra.get("age"), Some(&serde_json::json!(32)));
    }
}
