//! Sub-collections of a central's state

use serde::{Deserialize, Serialize};
use std::fmt;

/// The addressable sections of a central's state
///
/// Groups, areas and zones are addressed by entry `Id`. System status lines
/// carry no stable identifier and are addressed by `index` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentralDataSection {
    Groups,
    Areas,
    Zones,
    SystemStatus,
}

impl CentralDataSection {
    /// All sections, in panel order
    pub const ALL: [CentralDataSection; 4] = [
        CentralDataSection::Groups,
        CentralDataSection::Areas,
        CentralDataSection::Zones,
        CentralDataSection::SystemStatus,
    ];

    /// Stable snake_case name
    pub fn as_str(&self) -> &'static str {
        match self {
            CentralDataSection::Groups => "groups",
            CentralDataSection::Areas => "areas",
            CentralDataSection::Zones => "zones",
            CentralDataSection::SystemStatus => "system_status",
        }
    }

    /// Whether entries of this section are addressed by position index
    pub fn is_index_addressed(&self) -> bool {
        matches!(self, CentralDataSection::SystemStatus)
    }
}

impl fmt::Display for CentralDataSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
