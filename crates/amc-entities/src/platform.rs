//! Binary sensor platform
//!
//! [`setup_entry`] discovers one tamper sensor per system status line and,
//! unless disabled, one zone sensor per zone of every central. An
//! [`EntityPlatform`] attaches the sensors to the coordinator and detaches
//! them again on unload.

use amc_config::ConfigKey;
use amc_coordinator::{Coordinator, SharedCoordinator};
use amc_core::{AmcEntry, AmcStatesParser, CentralDataSection, EntryKey, Locator};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::binary_sensor::{AmcBinarySensor, PresentedState, SensorKind};
use crate::device::device_info;
use crate::error::{EntityError, EntityResult};

/// Platform name of the entities built here
pub const PLATFORM: &str = "binary_sensor";

/// One entity that could not be built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupFailure {
    pub central_id: String,
    pub section: CentralDataSection,
    pub reason: String,
}

/// Result of discovering entities
#[derive(Debug, Default)]
pub struct PlatformSetup {
    pub entities: Vec<Arc<AmcBinarySensor>>,
    pub failures: Vec<SetupFailure>,
}

impl PlatformSetup {
    fn record(&mut self, central_id: &str, section: CentralDataSection, err: EntityError) {
        warn!(central_id, %section, error = %err, "Skipping entity");
        self.failures.push(SetupFailure {
            central_id: central_id.to_string(),
            section,
            reason: err.to_string(),
        });
    }
}

/// Build every binary sensor for the coordinator's current snapshot
///
/// Failing to build one entity is recorded and does not stop the others.
/// Only unreadable options fail the whole setup.
#[instrument(skip(coordinator))]
pub fn setup_entry(coordinator: &Coordinator) -> EntityResult<PlatformSetup> {
    let snapshot = coordinator.data();
    let parser = AmcStatesParser::new(&snapshot);
    let zones_included = coordinator.get_bool(ConfigKey::StatusZoneIncluded)?;

    let mut kinds = vec![SensorKind::Tamper];
    if zones_included {
        kinds.push(SensorKind::Zone);
    } else {
        debug!("Zone sensors disabled");
    }
    let mut prefixes = Vec::with_capacity(kinds.len());
    for kind in &kinds {
        prefixes.push(coordinator.get_str(kind.name_prefix_key())?);
    }

    let mut setup = PlatformSetup::default();
    let mut unique_ids = HashSet::new();

    for central_id in parser.raw_states() {
        for (kind, name_prefix) in kinds.iter().copied().zip(prefixes.iter().copied()) {
            let section = kind.section();
            let entries = match parser.section(central_id, section) {
                Ok(entries) => entries,
                Err(err) => {
                    setup.record(central_id, section, err.into());
                    continue;
                }
            };
            for (position, entry) in entries.iter().enumerate() {
                let built = locator_for(section, central_id, position, entry)
                    .and_then(|locator| {
                        build_sensor(kind, coordinator, &parser, entry, locator, name_prefix)
                    });
                push_unique(&mut setup, &mut unique_ids, central_id, kind, built);
            }
        }
    }

    info!(
        entities = setup.entities.len(),
        failures = setup.failures.len(),
        "Set up {} platform",
        PLATFORM
    );
    Ok(setup)
}

/// Coordinates of a discovered entry
///
/// Index-addressed entries without an `index` are located by position.
fn locator_for(
    section: CentralDataSection,
    central_id: &str,
    position: usize,
    entry: &AmcEntry,
) -> EntityResult<Locator> {
    let key = if section.is_index_addressed() {
        EntryKey::Index(entry.index.unwrap_or(position as i64))
    } else {
        let id = entry.id_str().ok_or_else(|| EntityError::MissingEntryId {
            central_id: central_id.to_string(),
            section,
            position,
        })?;
        EntryKey::Id(id.to_string())
    };
    Ok(Locator {
        section,
        central_id: central_id.to_string(),
        key,
    })
}

fn build_sensor(
    kind: SensorKind,
    coordinator: &Coordinator,
    parser: &AmcStatesParser<'_>,
    entry: &AmcEntry,
    locator: Locator,
    name_prefix: &str,
) -> EntityResult<AmcBinarySensor> {
    let device = device_info(parser, &locator.central_id, coordinator)?;
    Ok(AmcBinarySensor::new(
        kind,
        coordinator,
        device,
        entry.clone(),
        locator,
        name_prefix,
    ))
}

fn push_unique(
    setup: &mut PlatformSetup,
    unique_ids: &mut HashSet<String>,
    central_id: &str,
    kind: SensorKind,
    built: EntityResult<AmcBinarySensor>,
) {
    let sensor = match built {
        Ok(sensor) => sensor,
        Err(err) => return setup.record(central_id, kind.section(), err),
    };
    if !unique_ids.insert(sensor.unique_id().to_string()) {
        let err = EntityError::DuplicateUniqueId {
            unique_id: sensor.unique_id().to_string(),
        };
        return setup.record(central_id, kind.section(), err);
    }
    setup.entities.push(Arc::new(sensor));
}

/// Entities attached to one coordinator
#[derive(Debug)]
pub struct EntityPlatform {
    coordinator: SharedCoordinator,
    entities: Vec<Arc<AmcBinarySensor>>,
}

impl EntityPlatform {
    /// Create a new, empty platform
    pub fn new(coordinator: SharedCoordinator) -> Self {
        Self {
            coordinator,
            entities: Vec::new(),
        }
    }

    /// Discover entities and attach them in one step
    pub fn setup(coordinator: SharedCoordinator) -> EntityResult<(Self, Vec<SetupFailure>)> {
        let PlatformSetup { entities, failures } = setup_entry(&coordinator)?;
        let mut platform = Self::new(coordinator);
        platform.add_entities(entities);
        Ok((platform, failures))
    }

    pub fn coordinator(&self) -> &SharedCoordinator {
        &self.coordinator
    }

    /// Attach entities to the coordinator
    ///
    /// Each entity runs its first refresh and subscribes. Entities whose
    /// unique id is already on the platform are skipped. Returns the number
    /// of entities added.
    pub fn add_entities(
        &mut self,
        entities: impl IntoIterator<Item = Arc<AmcBinarySensor>>,
    ) -> usize {
        let mut added = 0;
        for entity in entities {
            if self.get(entity.unique_id()).is_some() {
                warn!(unique_id = %entity.unique_id(), "Entity already on platform");
                continue;
            }
            if entity.added_to_coordinator(&self.coordinator) {
                self.entities.push(entity);
                added += 1;
            }
        }
        debug!(added, total = self.entities.len(), "Entities added");
        added
    }

    pub fn entities(&self) -> &[Arc<AmcBinarySensor>] {
        &self.entities
    }

    /// Find an entity by unique id
    pub fn get(&self, unique_id: &str) -> Option<&Arc<AmcBinarySensor>> {
        self.entities.iter().find(|e| e.unique_id() == unique_id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn presented_states(&self) -> Vec<PresentedState> {
        self.entities.iter().map(|e| e.presented_state()).collect()
    }

    /// Detach every entity and unsubscribe its listener
    pub fn unload(&mut self) -> usize {
        let count = self.entities.len();
        for entity in self.entities.drain(..) {
            entity.removed_from_coordinator();
        }
        info!(count, "Unloaded {} platform", PLATFORM);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amc_config::IntegrationOptions;
    use amc_core::Snapshot;
    use serde_json::json;

    fn coordinator(options: IntegrationOptions, value: serde_json::Value) -> SharedCoordinator {
        Arc::new(Coordinator::new(options, Snapshot::from_value(value).unwrap()).unwrap())
    }

    #[test]
    fn test_status_lines_without_index_use_position() {
        let coordinator = coordinator(
            IntegrationOptions::default(),
            json!({"C1": {"systemStatus": [{"name": "A"}, {"name": "B", "states": {"anomaly": 1}}]}}),
        );
        let setup = setup_entry(&coordinator).unwrap();

        let locators: Vec<String> = setup
            .entities
            .iter()
            .map(|e| e.core().locator().to_string())
            .collect();
        assert_eq!(locators, vec!["system_status[C1/#0]", "system_status[C1/#1]"]);
    }

    #[test]
    fn test_zone_without_id_is_a_failure() {
        let coordinator = coordinator(
            IntegrationOptions::default(),
            json!({"C1": {"zones": [{"name": "Nameless"}, {"Id": "Z2", "name": "Hall"}]}}),
        );
        let setup = setup_entry(&coordinator).unwrap();

        assert_eq!(setup.entities.len(), 1);
        assert_eq!(setup.failures.len(), 1);
        assert_eq!(setup.failures[0].section, CentralDataSection::Zones);
    }

    #[test]
    fn test_zones_can_be_excluded() {
        let options = IntegrationOptions::default()
            .with(ConfigKey::StatusZoneIncluded, false)
            .unwrap();
        let coordinator = coordinator(
            options,
            json!({"C1": {"zones": [{"Id": "Z1"}], "systemStatus": [{"index": 0}]}}),
        );
        let setup = setup_entry(&coordinator).unwrap();

        assert_eq!(setup.entities.len(), 1);
        assert_eq!(setup.entities[0].kind(), SensorKind::Tamper);
    }

    #[test]
    fn test_duplicate_unique_id_is_rejected() {
        let coordinator = coordinator(
            IntegrationOptions::default(),
            json!({"C1": {"zones": [{"Id": "Z1"}]}, "C2": {"zones": [{"Id": "Z1"}]}}),
        );
        let setup = setup_entry(&coordinator).unwrap();

        assert_eq!(setup.entities.len(), 1);
        assert_eq!(setup.failures[0].central_id, "C2");
        assert!(setup.failures[0].reason.contains("zone_status_Z1"));
    }

    #[test]
    fn test_add_and_unload() {
        let coordinator = coordinator(
            IntegrationOptions::default(),
            json!({"C1": {"zones": [{"Id": "Z1"}, {"Id": "Z2"}]}}),
        );
        let (mut platform, failures) = EntityPlatform::setup(coordinator.clone()).unwrap();

        assert!(failures.is_empty());
        assert_eq!(platform.len(), 2);
        assert_eq!(coordinator.listener_count(), 2);
        assert!(platform.get("zone_status_Z2").is_some());

        assert_eq!(platform.unload(), 2);
        assert!(platform.is_empty());
        assert_eq!(coordinator.listener_count(), 0);
    }

    #[test]
    fn test_add_entities_skips_known_unique_ids() {
        let coordinator = coordinator(IntegrationOptions::default(), json!({"C1": {"zones": [{"Id": "Z1"}]}}));
        let (mut platform, _) = EntityPlatform::setup(coordinator.clone()).unwrap();

        let again = setup_entry(&coordinator).unwrap().entities;
        assert_eq!(platform.add_entities(again), 0);
        assert_eq!(coordinator.listener_count(), 1);
    }
}
