//! Binary sensor entities for the AMC alarm bridge
//!
//! Each entity is bound to one entry of one central through a
//! [`Locator`](amc_core::Locator), re-resolved against every snapshot the
//! coordinator receives:
//!
//! - [`identity`] - Display names and persisted unique ids
//! - [`device`] - Device info grouping a central's entities
//! - [`entity`] - Refresh, availability and lifecycle shared by all entities
//! - [`binary_sensor`] - Tamper and zone sensors
//! - [`platform`] - Discovery, attach and unload

pub mod binary_sensor;
pub mod device;
pub mod entity;
pub mod error;
pub mod identity;
pub mod platform;

pub use binary_sensor::{AmcBinarySensor, PresentedState, SensorKind, DEVICE_CLASS_TAMPER};
pub use device::{device_info, DeviceIdentifier, DeviceInfo};
pub use entity::{BoundEntityCore, Lifecycle};
pub use error::{EntityError, EntityResult};
pub use identity::{display_name, slugify, unique_id, EntityIdentity};
pub use platform::{setup_entry, EntityPlatform, PlatformSetup, SetupFailure, PLATFORM};
