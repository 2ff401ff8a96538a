//! Error types for snapshot lookups

use thiserror::Error;

use crate::{CentralDataSection, EntryKey};

/// Result type for snapshot lookups
pub type StatesResult<T> = Result<T, StatesError>;

/// Errors raised while reading a snapshot
#[derive(Debug, Error)]
pub enum StatesError {
    /// The central is not part of the snapshot (unpaired or unreachable)
    #[error("central '{central_id}' not found in snapshot")]
    CentralNotFound { central_id: String },

    /// The central exists but the addressed entry does not
    #[error("{section} entry {key} not found for central '{central_id}'")]
    EntryNotFound {
        central_id: String,
        section: CentralDataSection,
        key: EntryKey,
    },

    /// The raw payload is not a valid snapshot
    #[error("failed to parse snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

impl StatesError {
    /// Check if this is a lookup miss rather than a malformed payload
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StatesError::CentralNotFound { .. } | StatesError::EntryNotFound { .. }
        )
    }
}
