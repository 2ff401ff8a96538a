//! Device descriptions for centrals

use amc_config::ConfigKey;
use amc_coordinator::Coordinator;
use amc_core::{AmcStatesParser, DOMAIN, MANUFACTURER};
use serde::{Deserialize, Serialize};

use crate::error::EntityResult;

/// A device identifier (domain, id) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentifier(pub String, pub String);

impl DeviceIdentifier {
    /// Identifier of a central within this integration's domain
    pub fn central(central_id: impl Into<String>) -> Self {
        Self(DOMAIN.to_string(), central_id.into())
    }
}

/// Device every entity of one central is grouped under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub identifiers: Vec<DeviceIdentifier>,
    pub manufacturer: String,
    pub model: String,
    pub name: String,
}

/// Build the device info of a central
///
/// The configured `title` wins over the panel's own name when it is set.
pub fn device_info(
    parser: &AmcStatesParser<'_>,
    central_id: &str,
    coordinator: &Coordinator,
) -> EntityResult<DeviceInfo> {
    let title = coordinator
        .options()
        .get_optional_str(ConfigKey::Title)?
        .filter(|title| !title.is_empty());

    let name = match title {
        Some(title) => title.to_string(),
        None => parser.real_name(central_id)?.to_string(),
    };

    Ok(DeviceInfo {
        identifiers: vec![DeviceIdentifier::central(central_id)],
        manufacturer: MANUFACTURER.to_string(),
        model: parser.model(central_id)?.to_string(),
        name,
    })
}
