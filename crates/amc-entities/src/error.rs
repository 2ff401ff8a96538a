//! Entity error types

use amc_config::ConfigError;
use amc_core::{CentralDataSection, StatesError};
use thiserror::Error;

/// Errors raised while building or binding entities
#[derive(Error, Debug)]
pub enum EntityError {
    #[error(transparent)]
    States(#[from] StatesError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{section} entry at position {position} of central '{central_id}' has no Id")]
    MissingEntryId {
        central_id: String,
        section: CentralDataSection,
        position: usize,
    },

    #[error("unique id '{unique_id}' is already in use")]
    DuplicateUniqueId { unique_id: String },
}

pub type EntityResult<T> = Result<T, EntityError>;
