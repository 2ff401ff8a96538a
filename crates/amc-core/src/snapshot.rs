//! Snapshot of all centrals' state

use indexmap::IndexMap;
use serde::de;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::{AmcEntry, CentralDataSection, StatesResult};

/// The entries of one section
///
/// The panel wraps each section in an envelope (`{"name": .., "list": [..]}`);
/// a bare array is accepted as well.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntryList {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub list: Vec<AmcEntry>,
}

impl EntryList {
    pub fn new(list: Vec<AmcEntry>) -> Self {
        Self { name: None, list }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AmcEntry> {
        self.list.iter()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

impl<'de> Deserialize<'de> for EntryList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (name, items) = match Option::<Value>::deserialize(deserializer)? {
            None => return Ok(EntryList::default()),
            Some(Value::Array(items)) => (None, items),
            Some(Value::Object(mut envelope)) => {
                let name = match envelope.remove("name") {
                    Some(Value::String(name)) => Some(name),
                    _ => None,
                };
                let items = match envelope.remove("list") {
                    Some(Value::Array(items)) => items,
                    None | Some(Value::Null) => Vec::new(),
                    Some(other) => {
                        return Err(de::Error::invalid_type(
                            unexpected(&other),
                            &"a list of entries",
                        ))
                    }
                };
                (name, items)
            }
            Some(other) => {
                return Err(de::Error::invalid_type(
                    unexpected(&other),
                    &"a list of entries or an envelope",
                ))
            }
        };

        Ok(EntryList {
            name,
            list: decode_entries(items),
        })
    }
}

/// Decode entries one by one, dropping the ones that do not decode
fn decode_entries(items: Vec<Value>) -> Vec<AmcEntry> {
    let mut list = Vec::with_capacity(items.len());
    for (position, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<AmcEntry>(item) {
            Ok(entry) => list.push(entry),
            Err(err) => warn!(position, error = %err, "Skipping undecodable entry"),
        }
    }
    list
}

fn unexpected(value: &Value) -> de::Unexpected<'_> {
    match value {
        Value::Null => de::Unexpected::Unit,
        Value::Bool(b) => de::Unexpected::Bool(*b),
        Value::Number(_) => de::Unexpected::Other("a number"),
        Value::String(s) => de::Unexpected::Str(s),
        Value::Array(_) => de::Unexpected::Seq,
        Value::Object(_) => de::Unexpected::Map,
    }
}

/// State of one central (a physical alarm panel)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CentralState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default)]
    pub groups: EntryList,

    #[serde(default)]
    pub areas: EntryList,

    #[serde(default)]
    pub zones: EntryList,

    #[serde(default)]
    pub system_status: EntryList,

    /// Remaining fields, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CentralState {
    /// Get the entries of a section
    pub fn section(&self, section: CentralDataSection) -> &EntryList {
        match section {
            CentralDataSection::Groups => &self.groups,
            CentralDataSection::Areas => &self.areas,
            CentralDataSection::Zones => &self.zones,
            CentralDataSection::SystemStatus => &self.system_status,
        }
    }

    fn section_mut(&mut self, section: CentralDataSection) -> &mut EntryList {
        match section {
            CentralDataSection::Groups => &mut self.groups,
            CentralDataSection::Areas => &mut self.areas,
            CentralDataSection::Zones => &mut self.zones,
            CentralDataSection::SystemStatus => &mut self.system_status,
        }
    }

    /// Replace the entries of a section
    pub fn with_section(mut self, section: CentralDataSection, entries: Vec<AmcEntry>) -> Self {
        self.section_mut(section).list = entries;
        self
    }
}

/// Point-in-time state of every central, keyed by central id
///
/// A snapshot is never mutated once handed to the coordinator; each refresh
/// replaces it wholesale. Central order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    centrals: IndexMap<String, CentralState>,
}

impl Snapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a snapshot from its JSON representation
    pub fn from_json(raw: &str) -> StatesResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Build a snapshot from an already-decoded JSON value
    pub fn from_value(raw: Value) -> StatesResult<Self> {
        Ok(serde_json::from_value(raw)?)
    }

    /// Add or replace a central
    pub fn with_central(mut self, central_id: impl Into<String>, central: CentralState) -> Self {
        self.centrals.insert(central_id.into(), central);
        self
    }

    /// Get a central by id
    pub fn central(&self, central_id: &str) -> Option<&CentralState> {
        self.centrals.get(central_id)
    }

    /// All central ids, in the order they were received
    pub fn central_ids(&self) -> impl Iterator<Item = &str> {
        self.centrals.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.centrals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centrals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sections_accept_envelope_and_bare_list() {
        let snapshot = Snapshot::from_value(json!({
            "C1": {
                "realName": "Villa",
                "model": "X864",
                "zones": {"name": "Zones", "list": [{"Id": "Z1", "name": "Hall"}]},
                "systemStatus": [{"Id": 1, "index": 0, "name": "Tamper"}]
            }
        }))
        .unwrap();

        let central = snapshot.central("C1").unwrap();
        assert_eq!(central.real_name.as_deref(), Some("Villa"));
        assert_eq!(central.zones.name.as_deref(), Some("Zones"));
        assert_eq!(central.zones.len(), 1);
        assert_eq!(central.system_status.len(), 1);
        assert!(central.groups.is_empty());
        assert!(central.areas.is_empty());
    }

    #[test]
    fn test_central_order_is_preserved() {
        let snapshot = Snapshot::from_json(r#"{"B": {}, "A": {}, "C": {}}"#).unwrap();
        let ids: Vec<&str> = snapshot.central_ids().collect();
        assert_eq!(ids, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_invalid_payload() {
        let err = Snapshot::from_json("[1, 2, 3]").unwrap_err();
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_undecodable_zone_is_skipped() {
        let snapshot = Snapshot::from_value(json!({
            "C1": {
                "zones": {"name": "Zones", "list": [
                    {"Id": "Z1", "name": "Hall", "states": "broken"},
                    {"Id": "Z2", "name": "Kitchen", "states": {"bit_notReady": 1}}
                ]},
                "systemStatus": [{"index": "2", "name": "Tamper", "states": null}]
            }
        }))
        .unwrap();

        let central = snapshot.central("C1").unwrap();
        assert_eq!(central.zones.len(), 1);
        assert_eq!(central.zones.list[0].id_str(), Some("Z2"));
        assert_eq!(central.zones.list[0].states.bit_not_ready, Some(1));
        assert_eq!(central.system_status.list[0].index, Some(2));
    }

    #[test]
    fn test_section_of_wrong_type_is_rejected() {
        assert!(Snapshot::from_json(r#"{"C1": {"zones": "none"}}"#).is_err());
        assert!(Snapshot::from_json(r#"{"C1": {"zones": {"list": 3}}}"#).is_err());
    }

    #[test]
    fn test_null_section_is_empty() {
        let snapshot = Snapshot::from_json(r#"{"C1": {"zones": null}}"#).unwrap();
        assert!(snapshot.central("C1").unwrap().zones.is_empty());
    }
}
