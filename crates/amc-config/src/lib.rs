//! Configuration loading for the AMC alarm bridge
//!
//! Configuration is read from YAML with support for a subset of Home
//! Assistant's custom tags:
//!
//! - `!include path` - Include another YAML file
//! - `!secret key` - Substitute from secrets.yaml
//! - `!env_var VAR` - Environment variable substitution
//!
//! The `amc_alarm:` section is turned into [`IntegrationOptions`], the
//! static key/value lookup the coordinator exposes to entities.
//!
//! # Example
//!
//! ```ignore
//! use amc_config::{load_options, ConfigKey};
//!
//! let options = load_options("/config", "configuration.yaml")?;
//! let include_zones = options.get_bool(ConfigKey::StatusZoneIncluded)?;
//! ```

mod error;
mod loader;
mod options;
mod secrets;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_yaml, YamlLoader};
pub use options::{load_options, ConfigKey, IntegrationOptions, OPTIONS_SECTION};
pub use secrets::Secrets;

pub use serde_yaml::Value;
