//! Submission records.
//!
//! A record is a string-keyed map of JSON values. Nested maps and sequences
//! are allowed; nothing is inspected by reflection.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Side-channel field holding [`IntegrityMetadata`](super::IntegrityMetadata).
pub const METADATA_FIELD: &str = "_integrity";

/// Fields set by the portal itself, never by the submitter.
pub const SYSTEM_FIELDS: [&str; 2] = ["id", "submittedAt"];

/// True for fields that do not describe submitted content: `_`-prefixed
/// metadata and the system fields.
pub fn is_excluded_field(name: &str) -> bool {
    name.starts_with('_') || SYSTEM_FIELDS.contains(&name)
}

/// A single survey, case or program submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Set `field`, returning the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy of this record without the metadata field.
    pub fn without_metadata(&self) -> Record {
        self.iter()
            .filter(|(field, _)| field.as_str() != METADATA_FIELD)
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Object(record.0)
    }
}

impl TryFrom<Value> for Record {
    type Error = Value;

    /// Only JSON objects are records; anything else is handed back.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
