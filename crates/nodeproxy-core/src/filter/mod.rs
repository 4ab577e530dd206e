//! Attribute filters.

pub mod matcher;

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::Value;

use crate::error::{ProxyError, ProxyResult};
use crate::node::attribute::comparable;

pub use crate::node::attribute::InstanceResolution;
pub use matcher::AttributeMatcher;

/// Conjunctive key -> required value constraints.
///
/// A required value of `None` only matches an absent or null attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FilterSet {
    required: BTreeMap<String, Option<String>>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            required: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), Some(v.into())))
                .collect(),
        }
    }

    /// Parse a JSON object of filters, e.g. `{"node_type": "pole"}`.
    ///
    /// `param` names the request parameter in error messages.
    pub fn from_json(raw: &str, param: &str) -> ProxyResult<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| ProxyError::invalid(param, format!("not valid JSON: {}", e)))?;
        Self::from_json_value(value, param)
    }

    pub fn from_json_value(value: Value, param: &str) -> ProxyResult<Self> {
        let Value::Object(entries) = value else {
            return Err(ProxyError::invalid(param, "expected a JSON object"));
        };

        let mut required = BTreeMap::new();
        for (key, value) in entries {
            if value.is_object() || value.is_array() {
                return Err(ProxyError::invalid(
                    param,
                    format!("filter '{}' must be a string, number, bool or null", key),
                ));
            }
            required.insert(key, comparable(&value));
        }
        Ok(Self { required })
    }

    /// Every parameter not listed in `reserved` becomes a filter.
    pub fn from_params(params: &HashMap<String, String>, reserved: &[&str]) -> Self {
        Self {
            required: params
                .iter()
                .filter(|(key, _)| !reserved.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), Some(value.clone())))
                .collect(),
        }
    }

    pub fn require(mut self, key: impl Into<String>, value: Option<String>) -> Self {
        self.required.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Option<String>> {
        self.required.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.required
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.required.len()
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
    }
}
