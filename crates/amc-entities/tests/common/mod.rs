//! Shared helpers for entity integration tests

#![allow(dead_code)]

use amc_config::{ConfigKey, IntegrationOptions};
use amc_coordinator::{Coordinator, SharedCoordinator};
use amc_core::Snapshot;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

/// Load a fixture file from `tests/fixtures/` as JSON
pub fn load_json_fixture(name: &str) -> Value {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);

    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to load fixture '{}' from {:?}: {}", name, path, e));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture '{}' as JSON: {}", name, e))
}

/// Load a fixture file as a snapshot
pub fn load_snapshot(name: &str) -> Snapshot {
    Snapshot::from_value(load_json_fixture(name)).unwrap()
}

/// Snapshot with a single zone on central `C1`
pub fn single_zone(id: &str, name: &str, anomaly: i64) -> Snapshot {
    Snapshot::from_value(json!({
        "C1": {"zones": [{"Id": id, "name": name, "states": {"anomaly": anomaly}}]}
    }))
    .unwrap()
}

/// Builder for coordinators under test
#[derive(Debug, Default)]
pub struct TestCoordinator {
    options: IntegrationOptions,
}

impl TestCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option
    pub fn with_option(mut self, key: ConfigKey, value: impl Into<Value>) -> Self {
        self.options.set(key, value).unwrap();
        self
    }

    pub fn with_id_prefix(self, prefix: &str) -> Self {
        self.with_option(ConfigKey::IdPrefix, prefix)
    }

    pub fn build(self, snapshot: Snapshot) -> SharedCoordinator {
        Arc::new(Coordinator::new(self.options, snapshot).unwrap())
    }
}
