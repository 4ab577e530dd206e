//! Attribute values in both upstream encodings.
//!
//! The upstream store sends an attribute either as a bare value or as an
//! object keyed by instance id (one entry per independently edited copy of
//! the attribute). Which shape a key uses is decided by the store, so the
//! engine accepts both for every key.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Instance id -> value, in upstream document order.
    Instanced(Map<String, Value>),
    /// Bare string, number, bool, null or array.
    Scalar(Value),
}

/// How an instanced attribute collapses to one value for comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceResolution {
    /// Value of the first instance in document order.
    #[default]
    First,
    /// Shared value of all instances; disagreeing instances never match.
    Unanimous,
}

impl std::str::FromStr for InstanceResolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "unanimous" => Ok(Self::Unanimous),
            other => Err(format!(
                "unknown instance resolution '{}' (expected first or unanimous)",
                other
            )),
        }
    }
}

/// Result of collapsing an attribute for comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Normalised comparison value; `None` is null.
    Value(Option<String>),
    /// Instances disagree under [`InstanceResolution::Unanimous`].
    Conflict,
}

impl AttributeValue {
    pub fn scalar(value: impl Into<Value>) -> Self {
        Self::Scalar(value.into())
    }

    pub fn instanced<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Instanced(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn is_instanced(&self) -> bool {
        matches!(self, Self::Instanced(_))
    }

    /// Explicit JSON null. An empty instance map is not null here.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(Value::Null))
    }

    /// Collapse to a normalised comparison value.
    pub fn resolve_for_comparison(&self, resolution: InstanceResolution) -> Resolved {
        match self {
            Self::Scalar(value) => Resolved::Value(comparable(value)),
            Self::Instanced(instances) => {
                let mut values = instances.values();
                let Some(first) = values.next() else {
                    return Resolved::Value(None);
                };
                match resolution {
                    InstanceResolution::First => Resolved::Value(comparable(first)),
                    InstanceResolution::Unanimous => {
                        let expected = comparable(first);
                        if values.all(|v| comparable(v) == expected) {
                            Resolved::Value(expected)
                        } else {
                            Resolved::Conflict
                        }
                    }
                }
            }
        }
    }

    /// Write `value` to every recorded instance, or replace the value when
    /// there are no instances to write to.
    pub fn broadcast(&mut self, value: Value) {
        match self {
            Self::Instanced(instances) if !instances.is_empty() => {
                for slot in instances.values_mut() {
                    *slot = value.clone();
                }
            }
            _ => *self = Self::Scalar(value),
        }
    }
}

impl From<Value> for AttributeValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::Instanced(map),
            other => Self::Scalar(other),
        }
    }
}

impl From<AttributeValue> for Value {
    fn from(value: AttributeValue) -> Self {
        match value {
            AttributeValue::Instanced(instances) => Value::Object(instances),
            AttributeValue::Scalar(value) => value,
        }
    }
}

/// Normalise a JSON value to the string form used for comparison.
///
/// Upstream types are inconsistent (`"5"` vs `5`), so both sides of a
/// comparison go through this.
pub fn comparable(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}
