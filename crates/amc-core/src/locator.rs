//! Lookup coordinates of a single entry

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{AmcEntry, AmcStatesParser, CentralDataSection, Snapshot, StatesResult};

/// How an entry is addressed within its section
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKey {
    Id(String),
    Index(i64),
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKey::Id(id) => f.write_str(id),
            EntryKey::Index(index) => write!(f, "#{index}"),
        }
    }
}

/// Where to find one entry in any snapshot
///
/// A locator only holds coordinates, never an entry, so the same locator can
/// be resolved against every new snapshot the coordinator receives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    pub section: CentralDataSection,
    pub central_id: String,
    pub key: EntryKey,
}

impl Locator {
    pub fn zone(central_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self::by_id(CentralDataSection::Zones, central_id, id)
    }

    pub fn group(central_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self::by_id(CentralDataSection::Groups, central_id, id)
    }

    pub fn area(central_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self::by_id(CentralDataSection::Areas, central_id, id)
    }

    pub fn system_status(central_id: impl Into<String>, index: i64) -> Self {
        Self {
            section: CentralDataSection::SystemStatus,
            central_id: central_id.into(),
            key: EntryKey::Index(index),
        }
    }

    fn by_id(
        section: CentralDataSection,
        central_id: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            section,
            central_id: central_id.into(),
            key: EntryKey::Id(id.into()),
        }
    }

    /// Resolve against a snapshot, returning an owned copy of the entry
    pub fn resolve(&self, snapshot: &Snapshot) -> StatesResult<AmcEntry> {
        resolve(snapshot, self)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}/{}]", self.section, self.central_id, self.key)
    }
}

/// Resolve a locator against a snapshot
pub fn resolve(snapshot: &Snapshot, locator: &Locator) -> StatesResult<AmcEntry> {
    AmcStatesParser::new(snapshot)
        .entry(&locator.central_id, locator.section, &locator.key)
        .cloned()
}
