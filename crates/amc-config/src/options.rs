//! Integration options
//!
//! Parses the `amc_alarm:` section from configuration.yaml into the static
//! key/value options the coordinator hands out to entities.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use serde_yaml::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::loader::load_yaml;

/// Name of the configuration section holding the options
pub const OPTIONS_SECTION: &str = "amc_alarm";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    String,
    Bool,
}

/// Known option keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    /// Device name override for every central
    Title,
    /// Namespace prepended to every unique id
    IdPrefix,
    /// Name prefix of system status (tamper) sensors
    StatusSystemPrefix,
    /// Name prefix of zone sensors
    StatusZonePrefix,
    /// Whether zone sensors are created at all
    StatusZoneIncluded,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 5] = [
        ConfigKey::Title,
        ConfigKey::IdPrefix,
        ConfigKey::StatusSystemPrefix,
        ConfigKey::StatusZonePrefix,
        ConfigKey::StatusZoneIncluded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::Title => "title",
            ConfigKey::IdPrefix => "id_prefix",
            ConfigKey::StatusSystemPrefix => "status_system_prefix",
            ConfigKey::StatusZonePrefix => "status_zone_prefix",
            ConfigKey::StatusZoneIncluded => "status_zone_included",
        }
    }

    /// Value used when the key is not configured; `None` means no default
    pub fn default_value(&self) -> Option<JsonValue> {
        match self {
            ConfigKey::Title => None,
            ConfigKey::IdPrefix | ConfigKey::StatusSystemPrefix | ConfigKey::StatusZonePrefix => {
                Some(JsonValue::String(String::new()))
            }
            ConfigKey::StatusZoneIncluded => Some(JsonValue::Bool(true)),
        }
    }

    fn kind(&self) -> ValueKind {
        match self {
            ConfigKey::StatusZoneIncluded => ValueKind::Bool,
            _ => ValueKind::String,
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static integration options, with defaults applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationOptions {
    values: HashMap<String, JsonValue>,
}

impl IntegrationOptions {
    /// Options holding only the defaults
    pub fn new() -> Self {
        let values = ConfigKey::ALL
            .into_iter()
            .filter_map(|key| key.default_value().map(|v| (key.as_str().to_string(), v)))
            .collect();
        Self { values }
    }

    /// Set an option, checking its type
    pub fn set(&mut self, key: ConfigKey, value: impl Into<JsonValue>) -> ConfigResult<()> {
        let value = value.into();
        if value.is_null() {
            match key.default_value() {
                Some(default) => self.values.insert(key.as_str().to_string(), default),
                None => self.values.remove(key.as_str()),
            };
            return Ok(());
        }
        check_kind(key, &value)?;
        self.values.insert(key.as_str().to_string(), value);
        Ok(())
    }

    /// Builder form of [`set`](Self::set)
    pub fn with(mut self, key: ConfigKey, value: impl Into<JsonValue>) -> ConfigResult<Self> {
        self.set(key, value)?;
        Ok(self)
    }

    /// Parse options from a loaded configuration document
    ///
    /// A document without an `amc_alarm:` section yields the defaults.
    /// Unknown keys in the section are kept and reachable via [`get_raw`](Self::get_raw).
    pub fn from_yaml(config: &Value) -> ConfigResult<Self> {
        let mut options = Self::new();

        let Some(section) = config.get(OPTIONS_SECTION) else {
            debug!("No '{}' section, using default options", OPTIONS_SECTION);
            return Ok(options);
        };
        if section.is_null() {
            return Ok(options);
        }
        let Some(mapping) = section.as_mapping() else {
            return Err(ConfigError::InvalidValue {
                key: OPTIONS_SECTION.to_string(),
                reason: "expected a mapping".to_string(),
            });
        };

        for (k, v) in mapping {
            let Some(name) = k.as_str() else {
                return Err(ConfigError::InvalidValue {
                    key: format!("{:?}", k),
                    reason: "option names must be strings".to_string(),
                });
            };
            let value = serde_json::to_value(v).map_err(|e| ConfigError::InvalidValue {
                key: name.to_string(),
                reason: e.to_string(),
            })?;

            match ConfigKey::from_name(name) {
                Some(key) => options.set(key, value)?,
                None => {
                    debug!("Keeping unknown option '{}'", name);
                    options.values.insert(name.to_string(), value);
                }
            }
        }

        Ok(options)
    }

    /// Get an option value, `None` when unset and without default
    pub fn get(&self, key: ConfigKey) -> Option<&JsonValue> {
        self.values.get(key.as_str())
    }

    /// Get any option by name, including keys this crate does not know
    pub fn get_raw(&self, name: &str) -> Option<&JsonValue> {
        self.values.get(name)
    }

    /// Get a string option that must be present
    pub fn get_str(&self, key: ConfigKey) -> ConfigResult<&str> {
        self.get_optional_str(key)?
            .ok_or_else(|| ConfigError::MissingValue {
                key: key.as_str().to_string(),
            })
    }

    /// Get a string option that may be absent
    pub fn get_optional_str(&self, key: ConfigKey) -> ConfigResult<Option<&str>> {
        match self.get(key) {
            None => Ok(None),
            Some(JsonValue::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(type_mismatch(key, "a string", other)),
        }
    }

    /// Get a boolean option that must be present
    pub fn get_bool(&self, key: ConfigKey) -> ConfigResult<bool> {
        match self.get(key) {
            None => Err(ConfigError::MissingValue {
                key: key.as_str().to_string(),
            }),
            Some(JsonValue::Bool(b)) => Ok(*b),
            Some(other) => Err(type_mismatch(key, "a boolean", other)),
        }
    }
}

impl Default for IntegrationOptions {
    fn default() -> Self {
        Self::new()
    }
}

fn check_kind(key: ConfigKey, value: &JsonValue) -> ConfigResult<()> {
    match (key.kind(), value) {
        (ValueKind::String, JsonValue::String(_)) | (ValueKind::Bool, JsonValue::Bool(_)) => Ok(()),
        (ValueKind::String, other) => Err(type_mismatch(key, "a string", other)),
        (ValueKind::Bool, other) => Err(type_mismatch(key, "a boolean", other)),
    }
}

fn type_mismatch(key: ConfigKey, expected: &str, found: &JsonValue) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.as_str().to_string(),
        reason: format!("expected {expected}, found {found}"),
    }
}

/// Load options from a configuration file inside `config_dir`
pub fn load_options(
    config_dir: impl Into<PathBuf>,
    file: impl AsRef<std::path::Path>,
) -> ConfigResult<IntegrationOptions> {
    let config = load_yaml(config_dir, file)?;
    IntegrationOptions::from_yaml(&config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(yaml: &str) -> ConfigResult<IntegrationOptions> {
        let value: Value = serde_yaml::from_str(yaml).unwrap();
        IntegrationOptions::from_yaml(&value)
    }

    #[test]
    fn test_defaults() {
        let options = IntegrationOptions::default();
        assert_eq!(options.get_str(ConfigKey::IdPrefix).unwrap(), "");
        assert_eq!(options.get_str(ConfigKey::StatusZonePrefix).unwrap(), "");
        assert!(options.get_bool(ConfigKey::StatusZoneIncluded).unwrap());
        assert_eq!(options.get(ConfigKey::Title), None);
        assert_eq!(options.get_optional_str(ConfigKey::Title).unwrap(), None);
    }

    #[test]
    fn test_missing_required_value() {
        let options = IntegrationOptions::default();
        assert!(matches!(
            options.get_str(ConfigKey::Title),
            Err(ConfigError::MissingValue { ref key }) if key == "title"
        ));
    }

    #[test]
    fn test_parse_section() {
        let options = parse(
            r#"
amc_alarm:
  title: Villa
  id_prefix: amc_
  status_system_prefix: System
  status_zone_prefix: Zone
  status_zone_included: false
  scan_interval: 30
"#,
        )
        .unwrap();

        assert_eq!(options.get_str(ConfigKey::Title).unwrap(), "Villa");
        assert_eq!(options.get_str(ConfigKey::IdPrefix).unwrap(), "amc_");
        assert_eq!(
            options.get_str(ConfigKey::StatusSystemPrefix).unwrap(),
            "System"
        );
        assert_eq!(options.get_str(ConfigKey::StatusZonePrefix).unwrap(), "Zone");
        assert!(!options.get_bool(ConfigKey::StatusZoneIncluded).unwrap());
        assert_eq!(options.get_raw("scan_interval"), Some(&JsonValue::from(30)));
    }

    #[test]
    fn test_null_value_falls_back_to_default() {
        let options = parse("amc_alarm:\n  status_zone_prefix:\n  title:\n").unwrap();
        assert_eq!(options.get_str(ConfigKey::StatusZonePrefix).unwrap(), "");
        assert_eq!(options.get(ConfigKey::Title), None);
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        let result = parse("amc_alarm:\n  status_zone_included: \"yes\"\n");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "status_zone_included"
        ));
    }

    #[test]
    fn test_missing_section_yields_defaults() {
        let options = parse("homeassistant:\n  name: Home\n").unwrap();
        assert_eq!(options, IntegrationOptions::default());
    }

    #[test]
    fn test_load_options_from_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("secrets.yaml"), "amc_title: Villa\n").unwrap();
        std::fs::write(
            dir.path().join("configuration.yaml"),
            "amc_alarm:\n  title: !secret amc_title\n",
        )
        .unwrap();

        let options = load_options(dir.path(), "configuration.yaml").unwrap();
        assert_eq!(options.get_str(ConfigKey::Title).unwrap(), "Villa");
    }
}
