//! Node records as returned by the remote node store.

pub mod attribute;

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

pub use attribute::{AttributeValue, InstanceResolution, Resolved};

/// Attribute key -> value, either encoding per key.
pub type AttributeMap = BTreeMap<String, AttributeValue>;

/// A node of a job.
///
/// The upstream record is kept as received and is what gets serialised
/// back; `id` and `attributes` are parsed views over it. Fields the engine
/// does not interpret (coordinates, photos, metadata) are never type-checked.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: String,
    attributes: AttributeMap,
    record: Map<String, Value>,
}

impl Node {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let mut record = Map::new();
        record.insert("id".to_string(), Value::String(id.clone()));
        record.insert("attributes".to_string(), Value::Object(Map::new()));
        Self {
            id,
            attributes: AttributeMap::new(),
            record,
        }
    }

    /// Parse an upstream node object. Only `id` is required; a missing,
    /// null or non-object `attributes` field reads as no attributes.
    pub fn from_record(record: Map<String, Value>) -> Result<Self, String> {
        let id = match record.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            Some(other) => return Err(format!("node id must be a string, got {}", other)),
            None => return Err("node has no id".to_string()),
        };
        let attributes = match record.get("attributes") {
            Some(Value::Object(entries)) => entries
                .iter()
                .map(|(key, value)| (key.clone(), AttributeValue::from(value.clone())))
                .collect(),
            _ => AttributeMap::new(),
        };
        Ok(Self {
            id,
            attributes,
            record,
        })
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        let key = key.into();
        let slot = self
            .record
            .entry("attributes")
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        if let Value::Object(entries) = slot {
            entries.insert(key.clone(), Value::from(value.clone()));
        }
        self.attributes.insert(key, value);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// Any top-level field of the upstream record, untyped.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.record.get(name)
    }

    pub fn latitude(&self) -> Option<&Value> {
        self.field("latitude")
    }

    pub fn longitude(&self) -> Option<&Value> {
        self.field("longitude")
    }

    pub fn photos(&self) -> Option<&Value> {
        self.field("photos")
    }

    /// The upstream record, unchanged.
    pub fn to_value(&self) -> Value {
        Value::Object(self.record.clone())
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.record.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = Map::<String, Value>::deserialize(deserializer)?;
        Node::from_record(record).map_err(D::Error::custom)
    }
}

/// Parse the `{ "data": [...] }` envelope of a node listing.
///
/// A missing or non-list `data` field is an empty collection.
pub fn parse_collection(body: Value) -> Result<Vec<Node>, serde_json::Error> {
    match body {
        Value::Object(mut envelope) => match envelope.remove("data") {
            Some(Value::Array(items)) => items.into_iter().map(serde_json::from_value).collect(),
            _ => Ok(Vec::new()),
        },
        _ => Ok(Vec::new()),
    }
}
