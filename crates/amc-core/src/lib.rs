//! Core types for the AMC alarm bridge
//!
//! This crate provides the data model shared by every other crate in the
//! workspace: the immutable [`Snapshot`] of all alarm centrals, the
//! [`AmcEntry`] records it carries, the [`AmcStatesParser`] projections over
//! it, and the [`Locator`] coordinates used to re-resolve one entry from a
//! fresh snapshot.

mod entry;
mod error;
mod locator;
mod parser;
mod section;
mod snapshot;

pub use entry::{AmcEntry, EntryId, EntryStates};
pub use error::{StatesError, StatesResult};
pub use locator::{resolve, EntryKey, Locator};
pub use parser::AmcStatesParser;
pub use section::CentralDataSection;
pub use snapshot::{CentralState, EntryList, Snapshot};

/// Integration domain, used as the namespace of device identifiers
pub const DOMAIN: &str = "amc_alarm";

/// Manufacturer reported for every central
pub const MANUFACTURER: &str = "AMC Elettronica";
