//! Entry records carried by every section of a central

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Identifier of an entry within its section
///
/// The panel sends ids either as strings or as integers; both are stored as
/// a string so that lookups and generated unique ids do not depend on the
/// wire type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryId(String);

impl EntryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl Serialize for EntryId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EntryId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct EntryIdVisitor;

        impl Visitor<'_> for EntryIdVisitor {
            type Value = EntryId;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an entry id as string or integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(EntryId(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(EntryId(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(EntryId(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(EntryId(v.to_string()))
            }
        }

        deserializer.deserialize_any(EntryIdVisitor)
    }
}

/// Domain flags of an entry
///
/// Only the flags the bridge derives state from are typed; every other flag
/// the panel reports is kept in `flags` so the full record can be published.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryStates {
    #[serde(
        default,
        deserialize_with = "deserialize_flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub anomaly: Option<i64>,

    #[serde(
        rename = "bit_notReady",
        default,
        deserialize_with = "deserialize_flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub bit_not_ready: Option<i64>,

    #[serde(flatten)]
    pub flags: Map<String, Value>,
}

impl EntryStates {
    /// Read any numeric flag by its wire name
    pub fn flag(&self, name: &str) -> Option<i64> {
        match name {
            "anomaly" => self.anomaly,
            "bit_notReady" => self.bit_not_ready,
            other => self.flags.get(other).and_then(flag_value),
        }
    }
}

/// A zone, group, area or system-status record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmcEntry {
    #[serde(rename = "Id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntryId>,

    #[serde(
        default,
        deserialize_with = "deserialize_flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub index: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "deserialize_states")]
    pub states: EntryStates,

    /// Remaining fields, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AmcEntry {
    /// The id, if present and non-empty
    pub fn id_str(&self) -> Option<&str> {
        self.id.as_ref().filter(|id| !id.is_empty()).map(EntryId::as_str)
    }

    /// The name, if present and non-empty
    pub fn name_str(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }

    /// Render the index the way fallback names and ids expect it
    pub fn index_label(&self) -> String {
        match self.index {
            Some(index) => index.to_string(),
            None => "None".to_string(),
        }
    }

    /// The full record as a generic attribute map
    pub fn to_attributes(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

fn flag_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Accept integers, booleans and numeric strings for panel flags
fn deserialize_flag<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(flag_value))
}

/// A `null` states object reads as no flags set
fn deserialize_states<'de, D>(deserializer: D) -> Result<EntryStates, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<EntryStates>::deserialize(deserializer)?.unwrap_or_default())
}
