//! Tamper and zone binary sensors

use amc_config::ConfigKey;
use amc_coordinator::Coordinator;
use amc_core::{AmcEntry, CentralDataSection, Locator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, trace};

use crate::device::DeviceInfo;
use crate::entity::{BoundEntityCore, Lifecycle};
use crate::identity::EntityIdentity;

/// Binary sensor device classes used by this platform
pub const DEVICE_CLASS_TAMPER: &str = "tamper";

/// Kinds of binary sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// One per system status line
    Tamper,
    /// One per zone
    Zone,
}

struct SensorSpec {
    section: CentralDataSection,
    device_class: Option<&'static str>,
    type_name: &'static str,
    id_prefix: &'static str,
    name_prefix_key: ConfigKey,
    is_on: fn(&AmcEntry) -> bool,
}

fn anomaly_active(entry: &AmcEntry) -> bool {
    entry.states.anomaly == Some(1)
}

static TAMPER: SensorSpec = SensorSpec {
    section: CentralDataSection::SystemStatus,
    device_class: Some(DEVICE_CLASS_TAMPER),
    type_name: "AmcTamperSensor",
    id_prefix: "system_status_",
    name_prefix_key: ConfigKey::StatusSystemPrefix,
    is_on: anomaly_active,
};

static ZONE: SensorSpec = SensorSpec {
    section: CentralDataSection::Zones,
    device_class: None,
    type_name: "AmcZoneSensor",
    id_prefix: "zone_status_",
    name_prefix_key: ConfigKey::StatusZonePrefix,
    is_on: anomaly_active,
};

impl SensorKind {
    pub const ALL: [SensorKind; 2] = [SensorKind::Tamper, SensorKind::Zone];

    fn spec(self) -> &'static SensorSpec {
        match self {
            SensorKind::Tamper => &TAMPER,
            SensorKind::Zone => &ZONE,
        }
    }

    /// Section the sensor's entries live in
    pub fn section(self) -> CentralDataSection {
        self.spec().section
    }

    pub fn device_class(self) -> Option<&'static str> {
        self.spec().device_class
    }

    /// Type name used in fallback names and unique ids
    pub fn type_name(self) -> &'static str {
        self.spec().type_name
    }

    /// Fixed id prefix of the sensor family
    pub fn id_prefix(self) -> &'static str {
        self.spec().id_prefix
    }

    /// Option holding the sensor family's name prefix
    pub fn name_prefix_key(self) -> ConfigKey {
        self.spec().name_prefix_key
    }

    /// Derive the on/off state from an entry
    pub fn is_on(self, entry: &AmcEntry) -> bool {
        (self.spec().is_on)(entry)
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// What the presentation layer reads from a sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentedState {
    pub unique_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
    /// `on`, `off` or `unavailable`
    pub state: String,
    pub available: bool,
    pub is_on: bool,
    pub device_info: DeviceInfo,
    pub attributes: Map<String, Value>,
    pub last_changed: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// A binary sensor bound to one entry of one central
#[derive(Debug)]
pub struct AmcBinarySensor {
    kind: SensorKind,
    core: BoundEntityCore,
    is_on: RwLock<bool>,
}

impl AmcBinarySensor {
    /// Create a sensor for an entry found at discovery
    pub fn new(
        kind: SensorKind,
        coordinator: &Coordinator,
        device_info: DeviceInfo,
        entry: AmcEntry,
        locator: Locator,
        name_prefix: &str,
    ) -> Self {
        let identity = EntityIdentity::new(
            coordinator.get_id_prefix(),
            name_prefix,
            kind.id_prefix(),
            &entry,
            kind.type_name(),
        );
        let is_on = kind.is_on(&entry);
        trace!(unique_id = %identity.unique_id, %locator, "Created {}", kind);

        Self {
            kind,
            core: BoundEntityCore::new(identity, device_info, locator, entry),
            is_on: RwLock::new(is_on),
        }
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn core(&self) -> &BoundEntityCore {
        &self.core
    }

    pub fn unique_id(&self) -> &str {
        self.core.unique_id()
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn device_class(&self) -> Option<&'static str> {
        self.kind.device_class()
    }

    /// Last derived state; kept while the entity is unavailable
    pub fn is_on(&self) -> bool {
        *self.is_on.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn available(&self) -> bool {
        self.core.available()
    }

    pub fn extra_state_attributes(&self) -> Map<String, Value> {
        self.core.extra_state_attributes()
    }

    /// Refresh from the coordinator's current snapshot
    pub fn handle_coordinator_update(&self, coordinator: &Coordinator) {
        let Some(entry) = self.core.refresh(coordinator) else {
            return;
        };
        let is_on = self.kind.is_on(&entry);
        let mut current = self.is_on.write().unwrap_or_else(PoisonError::into_inner);
        if *current != is_on {
            debug!(unique_id = %self.unique_id(), is_on, "State changed");
        }
        *current = is_on;
    }

    /// Run the first refresh and subscribe to the coordinator
    ///
    /// Does nothing unless the sensor is still [`Lifecycle::Created`].
    pub fn added_to_coordinator(self: &Arc<Self>, coordinator: &Coordinator) -> bool {
        if self.core.lifecycle() != Lifecycle::Created {
            debug!(unique_id = %self.unique_id(), "Sensor already attached");
            return false;
        }
        self.handle_coordinator_update(coordinator);

        let sensor = Arc::downgrade(self);
        let handle = coordinator.add_listener(move |coordinator| {
            if let Some(sensor) = sensor.upgrade() {
                sensor.handle_coordinator_update(coordinator);
            }
        });
        self.core.bind(handle)
    }

    /// Unsubscribe; later refreshes never reach the sensor
    pub fn removed_from_coordinator(&self) {
        self.core.detach();
    }

    /// Snapshot of everything the presentation layer shows
    pub fn presented_state(&self) -> PresentedState {
        let available = self.available();
        let is_on = self.is_on();
        let state = match (available, is_on) {
            (false, _) => "unavailable",
            (true, true) => "on",
            (true, false) => "off",
        };

        PresentedState {
            unique_id: self.unique_id().to_string(),
            name: self.name().to_string(),
            device_class: self.device_class().map(String::from),
            state: state.to_string(),
            available,
            is_on,
            device_info: self.core.device_info().clone(),
            attributes: self.extra_state_attributes(),
            last_changed: self.core.last_changed(),
            last_updated: self.core.last_updated(),
        }
    }
}
