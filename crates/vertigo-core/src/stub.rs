//! Fixture data and a simulated battery for running without hardware.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;
use vertigo_types::{BatteryState, Catalog, Experiment, Participant, ParticipantByName};

use crate::store::StateStore;

/// Interval between simulated battery readings.
pub const STUB_BATTERY_TICK: Duration = Duration::from_millis(300);

const IDLE_TICKS_BEFORE_UNPLUG: u32 = 10;

fn fixture_experiment(key: &str, resources: &[(&str, bool)], parameters: &[&str]) -> Experiment {
    Experiment {
        key: key.to_owned(),
        name: key.to_owned(),
        resources: resources
            .iter()
            .map(|(name, found)| ((*name).to_owned(), *found))
            .collect(),
        parameters: parameters.iter().map(|p| (*p).to_owned()).collect(),
        errors: Vec::new(),
    }
}

/// The fixture experiment catalog.
pub fn fixture_catalog() -> Catalog {
    [
        fixture_experiment(
            "valid.psyexp",
            &[("somepic.png", true)],
            &["participant", "session"],
        ),
        fixture_experiment(
            "unvalid.psyexp",
            &[("missing.png", false), ("missing_again.png", false)],
            &["participant", "session"],
        ),
        fixture_experiment(
            "more.psyexp",
            &[("somepic.png", true)],
            &["participant", "session", "age"],
        ),
    ]
    .into_iter()
    .map(|e| (e.key.clone(), e))
    .collect()
}

/// The fixture participant registry.
pub fn fixture_participants() -> ParticipantByName {
    [("asari", 123_453), ("turian", 1), ("salarian", 42)]
        .into_iter()
        .map(|(name, next)| (name.to_owned(), Participant::new(name, next)))
        .collect::<BTreeMap<_, _>>()
}

/// Seed `store` with the fixture catalog and participants.
pub fn seed(store: &StateStore) {
    store.experiment().set(String::new());
    store.catalog().set(fixture_catalog());
    store.participants().set(fixture_participants());
}

/// Simulated UPS.
///
/// Discharges one percent per tick while on battery. At 1% it is plugged
/// in and charges one percent per tick up to 98%, then idles on mains for
/// a while before being unplugged again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubBattery {
    level: u8,
    on_battery: bool,
    charging: bool,
    idle_ticks: u32,
}

impl Default for StubBattery {
    fn default() -> Self {
        Self {
            level: 90,
            on_battery: true,
            charging: false,
            idle_ticks: 0,
        }
    }
}

impl StubBattery {
    /// Current reading.
    pub const fn state(&self) -> BatteryState {
        BatteryState::known(self.level, self.on_battery, self.charging)
    }

    /// Advance one tick and return the new reading.
    pub fn step(&mut self) -> BatteryState {
        if self.on_battery {
            self.level = self.level.saturating_sub(1);
            if self.level <= 1 {
                self.on_battery = false;
                self.charging = true;
            }
        } else if self.charging {
            self.level = self.level.saturating_add(1).min(100);
            if self.level >= 98 {
                self.charging = false;
                self.idle_ticks = 0;
            }
        } else {
            if self.idle_ticks == IDLE_TICKS_BEFORE_UNPLUG {
                self.on_battery = true;
            }
            self.idle_ticks = self.idle_ticks.saturating_add(1);
        }
        self.state()
    }
}

/// Publish a [`StubBattery`] reading into `store` every
/// [`STUB_BATTERY_TICK`]. Abort the handle to stop it.
pub fn spawn_stub_battery(store: Arc<StateStore>) -> JoinHandle<()> {
    info!("Using stub battery");
    tokio::spawn(async move {
        let mut battery = StubBattery::default();
        let mut ticker = tokio::time::interval(STUB_BATTERY_TICK);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            store.battery().set(battery.step());
        }
    })
}
