//! Typed projections over a snapshot

use crate::{
    AmcEntry, CentralDataSection, CentralState, EntryKey, EntryList, Snapshot, StatesError,
    StatesResult,
};

/// Read-only accessors over one [`Snapshot`]
///
/// The parser borrows the snapshot and never copies it; every lookup is a
/// pure projection, so a parser can be rebuilt for each refresh at no cost.
#[derive(Debug, Clone, Copy)]
pub struct AmcStatesParser<'a> {
    snapshot: &'a Snapshot,
}

impl<'a> AmcStatesParser<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self { snapshot }
    }

    /// The ids of all centrals in the snapshot
    pub fn raw_states(&self) -> impl Iterator<Item = &'a str> {
        self.snapshot.central_ids()
    }

    fn central(&self, central_id: &str) -> StatesResult<&'a CentralState> {
        self.snapshot
            .central(central_id)
            .ok_or_else(|| StatesError::CentralNotFound {
                central_id: central_id.to_string(),
            })
    }

    /// Get all entries of a section
    pub fn section(
        &self,
        central_id: &str,
        section: CentralDataSection,
    ) -> StatesResult<&'a EntryList> {
        Ok(self.central(central_id)?.section(section))
    }

    pub fn groups(&self, central_id: &str) -> StatesResult<&'a EntryList> {
        self.section(central_id, CentralDataSection::Groups)
    }

    pub fn areas(&self, central_id: &str) -> StatesResult<&'a EntryList> {
        self.section(central_id, CentralDataSection::Areas)
    }

    pub fn zones(&self, central_id: &str) -> StatesResult<&'a EntryList> {
        self.section(central_id, CentralDataSection::Zones)
    }

    pub fn system_statuses(&self, central_id: &str) -> StatesResult<&'a EntryList> {
        self.section(central_id, CentralDataSection::SystemStatus)
    }

    /// Look up a group by `Id`
    pub fn group(&self, central_id: &str, id: &str) -> StatesResult<&'a AmcEntry> {
        self.by_id(central_id, CentralDataSection::Groups, id)
    }

    /// Look up an area by `Id`
    pub fn area(&self, central_id: &str, id: &str) -> StatesResult<&'a AmcEntry> {
        self.by_id(central_id, CentralDataSection::Areas, id)
    }

    /// Look up a zone by `Id`
    pub fn zone(&self, central_id: &str, id: &str) -> StatesResult<&'a AmcEntry> {
        self.by_id(central_id, CentralDataSection::Zones, id)
    }

    /// Look up a system status line by `index`
    ///
    /// Status lines have no stable `Id`. When no line of the section carries
    /// an `index` field the position in the list is used instead.
    pub fn system_status(&self, central_id: &str, index: i64) -> StatesResult<&'a AmcEntry> {
        self.by_index(central_id, CentralDataSection::SystemStatus, index)
    }

    /// Look up an entry by key in any section
    pub fn entry(
        &self,
        central_id: &str,
        section: CentralDataSection,
        key: &EntryKey,
    ) -> StatesResult<&'a AmcEntry> {
        match key {
            EntryKey::Id(id) => self.by_id(central_id, section, id),
            EntryKey::Index(index) => self.by_index(central_id, section, *index),
        }
    }

    /// The central's model name
    pub fn model(&self, central_id: &str) -> StatesResult<&'a str> {
        Ok(self.central(central_id)?.model.as_deref().unwrap_or_default())
    }

    /// The central's own name, as configured on the panel
    pub fn real_name(&self, central_id: &str) -> StatesResult<&'a str> {
        Ok(self
            .central(central_id)?
            .real_name
            .as_deref()
            .unwrap_or_default())
    }

    fn by_id(
        &self,
        central_id: &str,
        section: CentralDataSection,
        id: &str,
    ) -> StatesResult<&'a AmcEntry> {
        self.section(central_id, section)?
            .iter()
            .find(|entry| entry.id.as_ref().is_some_and(|entry_id| entry_id.as_str() == id))
            .ok_or_else(|| StatesError::EntryNotFound {
                central_id: central_id.to_string(),
                section,
                key: EntryKey::Id(id.to_string()),
            })
    }

    fn by_index(
        &self,
        central_id: &str,
        section: CentralDataSection,
        index: i64,
    ) -> StatesResult<&'a AmcEntry> {
        let entries = self.section(central_id, section)?;

        let found = if entries.iter().any(|entry| entry.index.is_some()) {
            entries.iter().find(|entry| entry.index == Some(index))
        } else {
            usize::try_from(index)
                .ok()
                .and_then(|position| entries.list.get(position))
        };

        found.ok_or_else(|| StatesError::EntryNotFound {
            central_id: central_id.to_string(),
            section,
            key: EntryKey::Index(index),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn snapshot() -> Snapshot {
        Snapshot::from_value(json!({
            "C1": {
                "realName": "Villa",
                "model": "X864",
                "zones": {"list": [
                    {"Id": "Z1", "index": 0, "name": "Hall", "states": {"anomaly": 1}},
                    {"Id": 7, "index": 1, "name": "Kitchen", "states": {"anomaly": 0}}
                ]},
                "groups": [{"Id": "G1", "name": "Night"}],
                "areas": [{"Id": "A1", "name": "Ground floor"}],
                "systemStatus": {"list": [
                    {"Id": "S", "index": 4, "name": "Tamper", "states": {"anomaly": 0}},
                    {"Id": "S", "index": 2, "name": "Battery", "states": {"anomaly": 1}}
                ]}
            },
            "C2": {}
        }))
        .unwrap()
    }

    #[test]
    fn test_zone_lookup_by_id() {
        let snapshot = snapshot();
        let parser = AmcStatesParser::new(&snapshot);
        assert_eq!(parser.zone("C1", "Z1").unwrap().name_str(), Some("Hall"));
        assert_eq!(parser.zone("C1", "7").unwrap().name_str(), Some("Kitchen"));
    }

    #[test]
    fn test_group_and_area_lookup() {
        let snapshot = snapshot();
        let parser = AmcStatesParser::new(&snapshot);
        assert_eq!(parser.group("C1", "G1").unwrap().name_str(), Some("Night"));
        assert_eq!(
            parser.area("C1", "A1").unwrap().name_str(),
            Some("Ground floor")
        );
        assert!(parser.group("C1", "A1").is_err());
    }

    #[test]
    fn test_system_status_resolves_by_index_not_id() {
        let snapshot = snapshot();
        let parser = AmcStatesParser::new(&snapshot);
        assert_eq!(
            parser.system_status("C1", 2).unwrap().name_str(),
            Some("Battery")
        );
        assert_eq!(
            parser.system_status("C1", 4).unwrap().name_str(),
            Some("Tamper")
        );
        assert!(parser.system_status("C1", 0).is_err());
    }

    #[test]
    fn test_system_status_falls_back_to_position() {
        let snapshot = Snapshot::from_value(json!({
            "C1": {"systemStatus": [{"name": "First"}, {"name": "Second"}]}
        }))
        .unwrap();
        let parser = AmcStatesParser::new(&snapshot);
        assert_eq!(
            parser.system_status("C1", 1).unwrap().name_str(),
            Some("Second")
        );
        assert!(parser.system_status("C1", 2).is_err());
        assert!(parser.system_status("C1", -1).is_err());
    }

    #[test]
    fn test_missing_central() {
        let snapshot = snapshot();
        let parser = AmcStatesParser::new(&snapshot);
        let err = parser.zone("X", "1").unwrap_err();
        assert!(matches!(err, StatesError::CentralNotFound { ref central_id } if central_id == "X"));
        assert!(parser.model("X").is_err());
        assert!(parser.real_name("X").is_err());
    }

    #[test]
    fn test_missing_entry() {
        let snapshot = snapshot();
        let parser = AmcStatesParser::new(&snapshot);
        let err = parser.zone("C1", "Z9").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "zones entry Z9 not found for central 'C1'"
        );
    }

    #[test]
    fn test_device_metadata() {
        let snapshot = snapshot();
        let parser = AmcStatesParser::new(&snapshot);
        assert_eq!(parser.model("C1").unwrap(), "X864");
        assert_eq!(parser.real_name("C1").unwrap(), "Villa");
        assert_eq!(parser.model("C2").unwrap(), "");
    }

    #[test]
    fn test_relookup_after_reparse_is_equal() {
        let raw = serde_json::to_string(&snapshot()).unwrap();
        let first = Snapshot::from_json(&raw).unwrap();
        let second = Snapshot::from_json(&raw).unwrap();
        assert_eq!(
            AmcStatesParser::new(&first).zone("C1", "Z1").unwrap(),
            AmcStatesParser::new(&second).zone("C1", "Z1").unwrap()
        );
    }

    #[test]
    fn test_raw_states_lists_centrals() {
        let snapshot = snapshot();
        let parser = AmcStatesParser::new(&snapshot);
        assert_eq!(parser.raw_states().collect::<Vec<_>>(), vec!["C1", "C2"]);
    }
}
